//! Usage statistics endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::services::usage_ledger::{
    ModelUsageStats, UsageEvent, UserStats, DEFAULT_ACTIVITY_LIMIT,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

/// GET /api/stats/user
pub async fn user_stats(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(state.ledger.user_stats(user).await?))
}

/// GET /api/stats/model-usage
pub async fn model_usage(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<ModelUsageStats>>, ApiError> {
    Ok(Json(state.ledger.model_usage_stats(user).await?))
}

/// GET /api/stats/recent-activity?limit=N
///
/// Non-positive or absent limits fall back to the default.
pub async fn recent_activity(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ActivityQuery>,
) -> Json<Vec<UsageEvent>> {
    let limit = query
        .limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    Json(state.ledger.recent_activity(user, limit).await)
}

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats/user", get(user_stats))
        .route("/api/stats/model-usage", get(model_usage))
        .route("/api/stats/recent-activity", get(recent_activity))
}
