use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{error::AppResult, middleware::request_id::RequestId, routes::AppState};

/// Fields are optional so that missing ones surface as a validation error
#[derive(Debug, Deserialize)]
pub struct TrackEventRequest {
    pub user_id: Option<String>,
    pub item_id: Option<String>,
    pub event_type: Option<String>,
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TrackEventResponse {
    pub status: &'static str,
    pub user_id: String,
}

/// Handler for the event tracking endpoint
pub async fn track_event(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<TrackEventRequest>, JsonRejection>,
) -> AppResult<Json<TrackEventResponse>> {
    tracing::debug!(request_id = %request_id, "Processing event");

    let Json(request) = payload?;

    let record = state
        .tracker
        .track(
            request.user_id.as_deref().unwrap_or_default(),
            request.item_id.as_deref().unwrap_or_default(),
            request.event_type.as_deref().unwrap_or_default(),
            request.duration_seconds,
        )
        .await?;

    Ok(Json(TrackEventResponse {
        status: "recorded",
        user_id: record.user_id,
    }))
}
