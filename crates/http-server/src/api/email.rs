use crate::core::{ApiError, AppState};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use db::{
    models::email::{ComposeEmailRequest, Email},
    services::email::{delete_email, list_account_emails, send_email},
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Mailbox entry as shown to the owner.
#[derive(Serialize)]
pub struct EmailView {
    pub id: Uuid,
    pub sender: String,
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub is_sent: bool,
    pub received_at: DateTime<Utc>,
}

impl From<Email> for EmailView {
    fn from(email: Email) -> Self {
        Self {
            id: email.id,
            sender: email.sender,
            recipient: email.recipient,
            subject: email.subject,
            body: email.body,
            is_sent: email.is_sent.unwrap_or(false),
            received_at: email.received_at,
        }
    }
}

#[derive(Serialize)]
pub struct EmailListResponse {
    pub success: bool,
    pub emails: Vec<EmailView>,
}

/// Lists the account's mailbox, newest first.
pub async fn list_emails_handler(
    State(app_state): State<AppState>,
    account_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<EmailListResponse>, ApiError> {
    let Path(account_id) = account_id?;
    let emails = list_account_emails(&*app_state.store, account_id).await?;
    Ok(Json(EmailListResponse {
        success: true,
        emails: emails.into_iter().map(EmailView::from).collect(),
    }))
}

/// Stores the sent copy of an outgoing email in the sender's mailbox.
pub async fn send_email_handler(
    State(app_state): State<AppState>,
    account_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ComposeEmailRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(account_id) = account_id?;
    let Json(request) = payload?;
    let email = send_email(&*app_state.store, account_id, &request).await?;
    Ok(Json(json!({ "success": true, "emailId": email.id })))
}

pub async fn delete_email_handler(
    State(app_state): State<AppState>,
    ids: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path((account_id, email_id)) = ids?;
    delete_email(&*app_state.store, account_id, email_id).await?;
    Ok(Json(json!({ "success": true })))
}
