use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One inbound or outbound email bound to an account.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Email {
    pub id: Uuid,
    pub account_id: Uuid,
    pub sender: String,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub recipient: Option<String>,
    pub is_sent: Option<bool>,
    pub received_at: DateTime<Utc>,
}

pub struct NewEmail<'a> {
    pub account_id: Uuid,
    pub sender: &'a str,
    pub subject: Option<&'a str>,
    pub body: Option<&'a str>,
    pub recipient: Option<&'a str>,
    pub is_sent: bool,
}

/// Counts reported by a retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub deleted_accounts: u64,
    pub deleted_emails: u64,
}

// DTO for API Request
#[derive(Debug, Deserialize)]
pub struct ComposeEmailRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

// DTO for the development-only injection endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEmailRequest {
    pub account_email: Option<String>,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}
