use super::{AccountStore, EmailStore};
use crate::models::account::{Account, AccountStats, NewAccount};
use crate::models::email::{Email, NewEmail, SweepReport};
use crate::services::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    emails: Vec<Email>,
}

/// Process-local store with the same constraints as the PostgreSQL schema:
/// unique account emails, emails must reference an existing account, and
/// account deletion removes the account's emails.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an account with an explicit creation time.
    pub async fn insert_account_at(
        &self,
        account: &NewAccount<'_>,
        created_at: DateTime<Utc>,
    ) -> Result<Account, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::UniqueViolation(account.email.to_string()));
        }
        let record = Account {
            id: Uuid::new_v4(),
            first_name: account.first_name.to_string(),
            last_name: account.last_name.to_string(),
            email: account.email.to_string(),
            password: account.password.to_string(),
            created_at,
        };
        tables.accounts.push(record.clone());
        Ok(record)
    }

    pub async fn email_count_for(&self, account_id: Uuid) -> usize {
        let tables = self.tables.lock().await;
        tables
            .emails
            .iter()
            .filter(|e| e.account_id == account_id)
            .count()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: &NewAccount<'_>) -> Result<Account, StoreError> {
        self.insert_account_at(account, Utc::now()).await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn delete_accounts_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<SweepReport, StoreError> {
        let mut tables = self.tables.lock().await;
        let doomed: Vec<Uuid> = tables
            .accounts
            .iter()
            .filter(|a| a.created_at < cutoff)
            .map(|a| a.id)
            .collect();
        if doomed.is_empty() {
            return Ok(SweepReport::default());
        }

        // No native cascade here, so emails go first under the same lock.
        let emails_before = tables.emails.len();
        tables.emails.retain(|e| !doomed.contains(&e.account_id));
        let deleted_emails = emails_before - tables.emails.len();
        tables.accounts.retain(|a| !doomed.contains(&a.id));

        Ok(SweepReport {
            deleted_accounts: doomed.len() as u64,
            deleted_emails: deleted_emails as u64,
        })
    }

    async fn account_stats(&self, active_since: DateTime<Utc>) -> Result<AccountStats, StoreError> {
        let tables = self.tables.lock().await;
        let total = tables.accounts.len() as i64;
        let active = tables
            .accounts
            .iter()
            .filter(|a| a.created_at > active_since)
            .count() as i64;
        Ok(AccountStats {
            total,
            active,
            expired: total - active,
        })
    }
}

#[async_trait]
impl EmailStore for MemoryStore {
    async fn insert_email(&self, email: &NewEmail<'_>) -> Result<Email, StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.accounts.iter().any(|a| a.id == email.account_id) {
            return Err(StoreError::MissingAccount(email.account_id));
        }
        let record = Email {
            id: Uuid::new_v4(),
            account_id: email.account_id,
            sender: email.sender.to_string(),
            subject: email.subject.map(str::to_string),
            body: email.body.map(str::to_string),
            recipient: email.recipient.map(str::to_string),
            is_sent: Some(email.is_sent),
            received_at: Utc::now(),
        };
        tables.emails.push(record.clone());
        Ok(record)
    }

    async fn find_email_by_id(&self, id: Uuid) -> Result<Option<Email>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.emails.iter().find(|e| e.id == id).cloned())
    }

    async fn list_emails_by_account(&self, account_id: Uuid) -> Result<Vec<Email>, StoreError> {
        let tables = self.tables.lock().await;
        let mut records: Vec<Email> = tables
            .emails
            .iter()
            .rev()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        Ok(records)
    }

    async fn delete_email(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.emails.len();
        tables.emails.retain(|e| e.id != id);
        Ok(tables.emails.len() < before)
    }

    async fn count_emails(&self) -> Result<i64, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.emails.len() as i64)
    }
}
