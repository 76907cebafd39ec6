use super::{AccountStore, EmailStore};
use crate::models::account::{Account, AccountStats, NewAccount};
use crate::models::email::{Email, NewEmail, SweepReport};
use crate::services::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Creates the schema if absent. `emails.account_id` cascades on account
/// deletion, which is what the retention sweep relies on.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id UUID PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS emails (
            id UUID PRIMARY KEY,
            account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            sender TEXT NOT NULL,
            subject TEXT NULL,
            body TEXT NULL,
            recipient TEXT NULL,
            is_sent BOOLEAN NULL DEFAULT FALSE,
            received_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS accounts_created_at_idx ON accounts (created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS emails_account_id_idx ON emails (account_id)")
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Checks if an sqlx::Error is a unique constraint violation for PostgreSQL.
fn is_unique_violation(e: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        if let Some(code) = db_err.code() {
            return code == UNIQUE_VIOLATION_CODE;
        }
    }
    false
}

#[async_trait]
impl AccountStore for PgStore {
    async fn insert_account(&self, account: &NewAccount<'_>) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, first_name, last_name, email, password, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, first_name, last_name, email, password, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account.first_name)
        .bind(account.last_name)
        .bind(account.email)
        .bind(account.password)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::UniqueViolation(account.email.to_string())
            } else {
                StoreError::DatabaseError(e)
            }
        })
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let record = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, first_name, last_name, email, password, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let record = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, first_name, last_name, email, password, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn delete_accounts_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<SweepReport, StoreError> {
        // The outer SELECT still sees the emails the cascade is about to remove.
        let (deleted_accounts, deleted_emails): (i64, i64) = sqlx::query_as(
            r#"
            WITH doomed AS (
                DELETE FROM accounts
                WHERE created_at < $1
                RETURNING id
            )
            SELECT
                (SELECT COUNT(*) FROM doomed),
                (SELECT COUNT(*) FROM emails WHERE account_id IN (SELECT id FROM doomed))
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(SweepReport {
            deleted_accounts: deleted_accounts as u64,
            deleted_emails: deleted_emails as u64,
        })
    }

    async fn account_stats(&self, active_since: DateTime<Utc>) -> Result<AccountStats, StoreError> {
        let (total, active): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE created_at > $1)
            FROM accounts
            "#,
        )
        .bind(active_since)
        .fetch_one(&self.pool)
        .await?;

        Ok(AccountStats {
            total,
            active,
            expired: total - active,
        })
    }
}

#[async_trait]
impl EmailStore for PgStore {
    async fn insert_email(&self, email: &NewEmail<'_>) -> Result<Email, StoreError> {
        let record = sqlx::query_as::<_, Email>(
            r#"
            INSERT INTO emails (id, account_id, sender, subject, body, recipient, is_sent, received_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, account_id, sender, subject, body, recipient, is_sent, received_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email.account_id)
        .bind(email.sender)
        .bind(email.subject)
        .bind(email.body)
        .bind(email.recipient)
        .bind(email.is_sent)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_email_by_id(&self, id: Uuid) -> Result<Option<Email>, StoreError> {
        let record = sqlx::query_as::<_, Email>(
            r#"
            SELECT id, account_id, sender, subject, body, recipient, is_sent, received_at
            FROM emails
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn list_emails_by_account(&self, account_id: Uuid) -> Result<Vec<Email>, StoreError> {
        let records = sqlx::query_as::<_, Email>(
            r#"
            SELECT id, account_id, sender, subject, body, recipient, is_sent, received_at
            FROM emails
            WHERE account_id = $1
            ORDER BY received_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn delete_email(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM emails WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_emails(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM emails")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
