pub mod account;
pub mod cleanup;
pub mod email;
pub mod stats;
pub mod webhook;
