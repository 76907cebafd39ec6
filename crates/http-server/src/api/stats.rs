use crate::core::{ApiError, AppState};
use axum::{extract::State, Json};
use db::services::account::{collect_stats, SystemStats};

/// Account totals split by TTL and the overall email count.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<SystemStats>, ApiError> {
    Ok(Json(collect_stats(&*state.store).await?))
}
