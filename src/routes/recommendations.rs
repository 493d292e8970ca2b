use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Recommendation, Strategy},
    routes::AppState,
    services::recommendations::diversity_score,
};

const ANONYMOUS_USER: &str = "anonymous";

/// `count` stays textual so that an unparseable value falls back to the default
#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    pub user_id: Option<String>,
    pub count: Option<String>,
}

impl RecommendQuery {
    pub fn requested_count(&self) -> Option<i64> {
        self.count.as_deref().and_then(|c| c.trim().parse().ok())
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub user_id: String,
    pub recommendations: Vec<Recommendation>,
    pub strategy: Strategy,
    pub diversity_score: f64,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Handler for the recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    query: Result<Query<RecommendQuery>, QueryRejection>,
) -> AppResult<Json<RecommendResponse>> {
    let start = Instant::now();
    let Query(query) = query?;
    let count = query.requested_count();

    let user_id = query
        .user_id
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| ANONYMOUS_USER.to_string());

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        count = ?count,
        "Processing recommendation request"
    );

    let outcome = state
        .recommender
        .get_recommendations(&user_id, count)
        .await?;

    let diversity_score = diversity_score(&outcome.recommendations);

    Ok(Json(RecommendResponse {
        user_id,
        recommendations: outcome.recommendations,
        strategy: outcome.strategy,
        diversity_score,
        latency_ms: start.elapsed().as_millis() as u64,
        timestamp: Utc::now(),
    }))
}
