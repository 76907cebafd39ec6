use crate::core::{ApiError, AppState};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use db::{models::email::TestEmailRequest, services::email::inject_test_email};
use inbound::{payload::PayloadError, IngestError, IngestionReport};
use serde_json::{json, Value};
use tracing::info;

pub const INBOUND_ENDPOINT: &str = "/api/emails/inbound";

// --- Error Handling ---

pub struct WebhookError(IngestError);

impl From<IngestError> for WebhookError {
    fn from(e: IngestError) -> Self {
        WebhookError(e)
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            IngestError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid signature"),
            IngestError::Payload(PayloadError::InvalidJson(_)) => {
                (StatusCode::BAD_REQUEST, "Invalid JSON payload")
            }
            IngestError::Payload(PayloadError::InvalidShape(_) | PayloadError::MissingFields) => (
                StatusCode::BAD_REQUEST,
                "Invalid email payload: missing required fields",
            ),
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

// --- Handlers ---

/// Relay webhook. The body is taken raw so the signature is checked over
/// the exact bytes that were signed.
pub async fn inbound_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestionReport>, WebhookError> {
    info!(body_len = body.len(), "Received inbound webhook");
    let report = state.inbound.ingest(&*state.store, &body, &headers).await?;
    Ok(Json(report))
}

pub async fn inbound_health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Inbound email webhook endpoint is active",
        "endpoint": INBOUND_ENDPOINT,
        "provider": "Resend",
        "domain": state.config.domain,
        "timestamp": Utc::now(),
    }))
}

/// Development-only shortcut that stores a message without going through a
/// relay. Only routed when `APP_ENV=development`.
pub async fn test_email_handler(
    State(state): State<AppState>,
    payload: Result<Json<TestEmailRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let email = inject_test_email(&*state.store, &request).await?;

    info!(email_id = %email.id, account_id = %email.account_id, "Stored test email");
    Ok(Json(json!({
        "success": true,
        "message": "Test email created",
        "email": {
            "id": email.id,
            "sender": email.sender,
            "subject": email.subject,
            "received_at": email.received_at,
        },
    })))
}
