//! Store capabilities injected into every service.
//!
//! Services are generic over these traits so the PostgreSQL backend and the
//! in-memory backend are interchangeable.

use crate::models::account::{Account, AccountStats, NewAccount};
use crate::models::email::{Email, NewEmail, SweepReport};
use crate::services::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{run_migrations, PgStore};

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a new account. A taken email yields `StoreError::UniqueViolation`.
    async fn insert_account(&self, account: &NewAccount<'_>) -> Result<Account, StoreError>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Deletes every account created strictly before `cutoff` together with
    /// its emails.
    async fn delete_accounts_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<SweepReport, StoreError>;

    /// Counts accounts; those created after `active_since` are active.
    async fn account_stats(&self, active_since: DateTime<Utc>) -> Result<AccountStats, StoreError>;
}

#[async_trait]
pub trait EmailStore: Send + Sync {
    /// Inserts an email. A missing owner yields `StoreError::MissingAccount`
    /// or a foreign-key database error.
    async fn insert_email(&self, email: &NewEmail<'_>) -> Result<Email, StoreError>;

    async fn find_email_by_id(&self, id: Uuid) -> Result<Option<Email>, StoreError>;

    /// Emails owned by an account, newest first.
    async fn list_emails_by_account(&self, account_id: Uuid) -> Result<Vec<Email>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_email(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn count_emails(&self) -> Result<i64, StoreError>;
}

/// Both capabilities behind one handle, as held by the HTTP layer.
pub trait Store: AccountStore + EmailStore {}

impl<T: AccountStore + EmailStore> Store for T {}
