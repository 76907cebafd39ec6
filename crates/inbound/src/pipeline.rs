use crate::payload::{normalize, NormalizedMessage, PayloadError};
use crate::sanitizer::sanitize;
use crate::signature::{signature_header, SignatureVerifier};
use chrono::{DateTime, Duration, Utc};
use db::models::email::NewEmail;
use db::store::Store;
use db::ACCOUNT_TTL_HOURS;
use http::HeaderMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const DEFAULT_SUBJECT: &str = "No Subject";

/// Request-level rejection. Nothing is persisted when one of these is returned.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid signature")]
    Unauthorized,

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Stored,
    NoAccount,
    Expired,
    Error,
}

/// Delivery result for one recipient.
#[derive(Debug, Clone, Serialize)]
pub struct RecipientOutcome {
    pub recipient: String,
    pub status: RecipientStatus,
    #[serde(rename = "emailId", skip_serializing_if = "Option::is_none")]
    pub email_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecipientOutcome {
    fn stored(recipient: &str, email_id: Uuid) -> Self {
        Self {
            recipient: recipient.to_string(),
            status: RecipientStatus::Stored,
            email_id: Some(email_id),
            message: Some("Email stored successfully".to_string()),
            error: None,
        }
    }

    fn no_account(recipient: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            status: RecipientStatus::NoAccount,
            email_id: None,
            message: Some("No account found for this email address".to_string()),
            error: None,
        }
    }

    fn expired(recipient: &str, ttl: Duration) -> Self {
        Self {
            recipient: recipient.to_string(),
            status: RecipientStatus::Expired,
            email_id: None,
            message: Some(format!(
                "Account has expired (older than {} hours)",
                ttl.num_hours()
            )),
            error: None,
        }
    }

    fn failed(recipient: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            status: RecipientStatus::Error,
            email_id: None,
            message: None,
            error: Some("Failed to store email".to_string()),
        }
    }
}

/// Outcome of one webhook call. `success` stays true once the request passed
/// verification and parsing; per-recipient failures live in `results`.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub success: bool,
    pub message: String,
    pub results: Vec<RecipientOutcome>,
    pub processed_at: DateTime<Utc>,
}

impl IngestionReport {
    pub fn stored_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == RecipientStatus::Stored)
            .count()
    }
}

/// Runs relay webhooks through verification, normalization, sanitization and
/// per-recipient delivery.
#[derive(Debug, Clone)]
pub struct InboundProcessor {
    verifier: SignatureVerifier,
    ttl: Duration,
}

impl InboundProcessor {
    pub fn new(verifier: SignatureVerifier) -> Self {
        Self {
            verifier,
            ttl: Duration::hours(ACCOUNT_TTL_HOURS),
        }
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Verifies and ingests one webhook body.
    ///
    /// Recipients are handled in order and independently: a missing, expired
    /// or failing recipient never blocks the others, and `results` follows
    /// the order of the payload's `to` list.
    #[instrument(skip_all, fields(body_len = raw_body.len()))]
    pub async fn ingest<S: Store + ?Sized>(
        &self,
        store: &S,
        raw_body: &[u8],
        headers: &HeaderMap,
    ) -> Result<IngestionReport, IngestError> {
        if !self.verifier.check(raw_body, signature_header(headers)) {
            warn!("Rejected webhook with invalid signature");
            return Err(IngestError::Unauthorized);
        }

        let message = normalize(raw_body).map_err(|e| {
            warn!(error = %e, "Rejected malformed webhook payload");
            e
        })?;
        let body = sanitize(&message.body);

        info!(
            from = %message.sender,
            recipients = message.recipients.len(),
            message_id = message.message_id.as_deref().unwrap_or("-"),
            "Processing inbound email"
        );

        let mut results = Vec::with_capacity(message.recipients.len());
        for recipient in &message.recipients {
            results.push(self.deliver(store, &message, &body, recipient).await);
        }

        let report = IngestionReport {
            success: true,
            message: "Email processed".to_string(),
            results,
            processed_at: Utc::now(),
        };
        if report.stored_count() == 0 {
            warn!(
                recipients = report.results.len(),
                "Inbound email was not stored for any recipient"
            );
        }
        Ok(report)
    }

    async fn deliver<S: Store + ?Sized>(
        &self,
        store: &S,
        message: &NormalizedMessage,
        body: &str,
        recipient: &str,
    ) -> RecipientOutcome {
        let address = mailbox_address(recipient);
        if address.is_empty() {
            return RecipientOutcome::no_account(recipient);
        }

        let account = match store.find_account_by_email(&address).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                debug!(%recipient, "No account for recipient");
                return RecipientOutcome::no_account(recipient);
            }
            Err(e) => {
                error!(%recipient, error = %e, "Account lookup failed");
                return RecipientOutcome::failed(recipient);
            }
        };

        if account.is_expired_at(Utc::now(), self.ttl) {
            debug!(%recipient, account_id = %account.id, "Account expired");
            return RecipientOutcome::expired(recipient, self.ttl);
        }

        let new_email = NewEmail {
            account_id: account.id,
            sender: &message.sender,
            subject: Some(message.subject.as_deref().unwrap_or(DEFAULT_SUBJECT)),
            body: Some(body),
            recipient: Some(recipient),
            is_sent: false,
        };
        match store.insert_email(&new_email).await {
            Ok(email) => {
                info!(%recipient, email_id = %email.id, "Stored inbound email");
                RecipientOutcome::stored(recipient, email.id)
            }
            Err(e) => {
                error!(%recipient, error = %e, "Failed to store inbound email");
                RecipientOutcome::failed(recipient)
            }
        }
    }
}

/// Bare lowercase address from `addr` or `Display Name <addr>`.
fn mailbox_address(recipient: &str) -> String {
    let address = match (recipient.find('<'), recipient.rfind('>')) {
        (Some(start), Some(end)) if start < end => &recipient[start + 1..end],
        _ => recipient,
    };
    address.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::mailbox_address;

    #[test]
    fn extracts_bracketed_address() {
        assert_eq!(mailbox_address("Ash <Ash.Grove1@Svc.Test>"), "ash.grove1@svc.test");
        assert_eq!(mailbox_address(" plain@svc.test "), "plain@svc.test");
        assert_eq!(mailbox_address("broken> <"), "broken> <");
    }
}
