use crate::models::email::{ComposeEmailRequest, Email, NewEmail, TestEmailRequest};
use crate::services::account::{account_ttl, find_live_account};
use crate::services::error::ServiceError;
use crate::store::Store;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

const TEST_SUBJECT: &str = "Test Email";
const TEST_BODY: &str = "This is a test email sent via the API.";

/// Lists an account's emails, newest first.
pub async fn list_account_emails<S: Store + ?Sized>(
    store: &S,
    account_id: Uuid,
) -> Result<Vec<Email>, ServiceError> {
    store
        .find_account_by_id(account_id)
        .await?
        .ok_or(ServiceError::NotFound("Account"))?;
    Ok(store.list_emails_by_account(account_id).await?)
}

/// Records an outbound email as a sent copy in the sender's own mailbox.
pub async fn send_email<S: Store + ?Sized>(
    store: &S,
    account_id: Uuid,
    request: &ComposeEmailRequest,
) -> Result<Email, ServiceError> {
    let to = request.to.trim();
    if !is_valid_address(to) {
        return Err(ServiceError::Validation(
            "Recipient must be a valid email address.".to_string(),
        ));
    }

    let account = find_live_account(store, account_id).await?;
    let email = store
        .insert_email(&NewEmail {
            account_id: account.id,
            sender: &account.email,
            subject: Some(request.subject.as_str()),
            body: Some(request.body.as_str()),
            recipient: Some(to),
            is_sent: true,
        })
        .await?;

    info!(account_id = %account.id, email_id = %email.id, "Stored sent copy");
    Ok(email)
}

/// Deletes an email only when it belongs to `account_id`.
pub async fn delete_email<S: Store + ?Sized>(
    store: &S,
    account_id: Uuid,
    email_id: Uuid,
) -> Result<(), ServiceError> {
    let owned = store
        .find_email_by_id(email_id)
        .await?
        .is_some_and(|email| email.account_id == account_id);
    if !owned || !store.delete_email(email_id).await? {
        return Err(ServiceError::NotFound("Email"));
    }
    Ok(())
}

/// Stores a synthetic inbound email for a live account.
pub async fn inject_test_email<S: Store + ?Sized>(
    store: &S,
    request: &TestEmailRequest,
) -> Result<Email, ServiceError> {
    let (Some(account_email), Some(from)) = (
        request.account_email.as_deref().filter(|s| !s.is_empty()),
        request.from.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return Err(ServiceError::Validation(
            "Missing required fields: accountEmail, from".to_string(),
        ));
    };

    let account = store
        .find_account_by_email(account_email)
        .await?
        .ok_or(ServiceError::NotFound("Account"))?;
    if account.is_expired_at(Utc::now(), account_ttl()) {
        return Err(ServiceError::Expired);
    }

    let email = store
        .insert_email(&NewEmail {
            account_id: account.id,
            sender: from,
            subject: Some(request.subject.as_deref().unwrap_or(TEST_SUBJECT)),
            body: Some(request.body.as_deref().unwrap_or(TEST_BODY)),
            recipient: Some(account.email.as_str()),
            is_sent: false,
        })
        .await?;
    Ok(email)
}

/// `local@domain.tld` with no whitespace and a single `@`.
pub fn is_valid_address(address: &str) -> bool {
    if address.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
