//! Persistence layer for disposable identities.
//!
//! - `models`: account and email rows plus request/response DTOs
//! - `store`: store capability traits with PostgreSQL and in-memory backends
//! - `services`: identity issuance, retention sweep, stats and mailbox actions

pub mod models;
pub mod services;
pub mod store;

/// Lifetime of an account and every email bound to it.
pub const ACCOUNT_TTL_HOURS: i64 = 24;
