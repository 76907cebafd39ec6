use crate::core::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use db::services::retention::sweep_expired_accounts;
use db::store::Store;
use db::ACCOUNT_TTL_HOURS;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub deleted_accounts: u64,
    pub deleted_emails: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<&'static str>,
}

/// GET: invoked by the external scheduler.
pub async fn scheduled_cleanup_handler(State(state): State<AppState>) -> Response {
    run_cleanup(&state, None).await
}

/// POST: manual trigger. Same sweep, tagged in the response.
pub async fn manual_cleanup_handler(State(state): State<AppState>) -> Response {
    run_cleanup(&state, Some("manual")).await
}

async fn run_cleanup(state: &AppState, trigger: Option<&'static str>) -> Response {
    let label = if trigger.is_some() { "Manual cleanup" } else { "Cleanup" };

    match sweep_expired_accounts(&*state.store, ACCOUNT_TTL_HOURS).await {
        Ok(report) => Json(CleanupResponse {
            success: true,
            timestamp: Utc::now(),
            deleted_accounts: report.deleted_accounts,
            deleted_emails: report.deleted_emails,
            message: format!(
                "{label} completed: {} accounts and {} associated emails removed",
                report.deleted_accounts, report.deleted_emails
            ),
            trigger,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "{label} failed");
            let mut body = serde_json::json!({
                "success": false,
                "timestamp": Utc::now(),
                "error": format!("{label} job failed"),
            });
            if let Some(trigger) = trigger {
                body["trigger"] = trigger.into();
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Runs the retention sweep every `period` until the runtime shuts down.
/// The first sweep runs immediately.
pub fn spawn_scheduled_sweep(store: Arc<dyn Store>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match sweep_expired_accounts(&*store, ACCOUNT_TTL_HOURS).await {
                Ok(report) if report.deleted_accounts > 0 => {
                    info!(
                        deleted_accounts = report.deleted_accounts,
                        deleted_emails = report.deleted_emails,
                        "Scheduled cleanup removed expired accounts"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Scheduled cleanup failed"),
            }
            tokio::time::sleep(period).await;
        }
    })
}
