use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{AlgorithmInsight, UserActivity},
    routes::AppState,
};

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    #[serde(flatten)]
    pub activity: UserActivity,
    /// Qualifying events counted in the cache backend, when readable
    pub interaction_count: Option<i64>,
}

/// Activity counters for one user
pub async fn activity(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ActivityResponse>> {
    let activity = state
        .tracker
        .activity(&user_id)
        .ok_or_else(|| AppError::NotFound(format!("No activity recorded for user {}", user_id)))?;
    let interaction_count = state.tracker.interaction_count(&user_id).await;

    Ok(Json(ActivityResponse {
        activity,
        interaction_count,
    }))
}

/// Collaborative-filtering state behind a user's recommendations
pub async fn algorithm(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<AlgorithmInsight>> {
    let insight = state.recommender.insight(&user_id).await?;
    Ok(Json(insight))
}
