// POST endpoint api/identity/generate

use crate::core::{ApiError, AppState};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    Json,
};
use db::{
    models::account::{Account, AccountResponse, IdentityRequest},
    services::account::{account_ttl, find_live_account, issue_identity},
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
pub struct AccountEnvelope {
    pub success: bool,
    pub account: AccountResponse,
}

impl From<Account> for AccountEnvelope {
    fn from(account: Account) -> Self {
        let expires_at = account.expires_at(account_ttl());
        Self {
            success: true,
            account: AccountResponse {
                account,
                expires_at,
            },
        }
    }
}

/// Handles the request to generate a new disposable identity.
#[axum::debug_handler]
pub async fn generate_identity_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<IdentityRequest>, JsonRejection>,
) -> Result<Json<AccountEnvelope>, ApiError> {
    let Json(request) = payload?;

    // Address collisions are retried inside the service. The `?` operator
    // converts a `ServiceError` into our `ApiError`.
    let account = issue_identity(&*app_state.store, &request, &app_state.config.domain).await?;

    Ok(Json(account.into()))
}

/// Returns a live account, used by the UI to resume a session and show the
/// remaining lifetime.
pub async fn get_account_handler(
    State(app_state): State<AppState>,
    account_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<AccountEnvelope>, ApiError> {
    let Path(account_id) = account_id?;
    let account = find_live_account(&*app_state.store, account_id).await?;
    Ok(Json(account.into()))
}
