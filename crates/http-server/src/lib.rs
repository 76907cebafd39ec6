//! HTTP surface of the disposable identity service.
//!
//! - `core`: shared state, configuration and API errors
//! - `api`: handlers for identities, mailboxes, the relay webhook,
//!   retention and stats

pub mod api;
pub mod core;

use crate::core::AppState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};
use tracing::error;

/// Relay payloads and compose requests beyond this are rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Assemble the HTTP router with all routes.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route(
            "/api/identity/generate",
            post(api::account::generate_identity_handler),
        )
        .route("/api/accounts/:account_id", get(api::account::get_account_handler))
        .route(
            "/api/accounts/:account_id/emails",
            get(api::email::list_emails_handler).post(api::email::send_email_handler),
        )
        .route(
            "/api/accounts/:account_id/emails/:email_id",
            delete(api::email::delete_email_handler),
        )
        .route(
            api::webhook::INBOUND_ENDPOINT,
            post(api::webhook::inbound_webhook_handler).get(api::webhook::inbound_health_handler),
        )
        .route(
            "/api/cron/cleanup",
            get(api::cleanup::scheduled_cleanup_handler)
                .post(api::cleanup::manual_cleanup_handler),
        )
        .route("/api/admin/stats", get(api::stats::stats_handler));

    if state.config.mode.is_development() {
        router = router.route("/api/emails/test", post(api::webhook::test_email_handler));
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Turns a handler panic into the same JSON 500 every other failure uses.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "Internal server error" })),
    )
        .into_response()
}
