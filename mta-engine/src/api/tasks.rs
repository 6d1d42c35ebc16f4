//! Local task browsing
//!
//! Only available when the local tracker is configured; otherwise 404.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use mta_common::api::SuccessEnvelope;

use crate::error::{ApiError, ApiResult};
use crate::services::tracker::local::{StatisticsReport, TaskFilter, TaskListing};
use crate::services::LocalTaskTracker;
use crate::AppState;

fn local_tracker(state: &AppState) -> ApiResult<Arc<LocalTaskTracker>> {
    state
        .local_tasks
        .clone()
        .ok_or_else(|| ApiError::NotFound("Task browsing is only available with the local tracker".to_string()))
}

/// GET /tasks?department=&status=
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<SuccessEnvelope<TaskListing>>> {
    let tracker = local_tracker(&state)?;
    let listing = tracker.list(&filter).await?;
    Ok(Json(SuccessEnvelope::new(listing)))
}

/// GET /tasks/stats
pub async fn task_statistics(State(state): State<AppState>) -> ApiResult<Json<SuccessEnvelope<StatisticsReport>>> {
    let tracker = local_tracker(&state)?;
    let report = tracker.statistics().await?;
    Ok(Json(SuccessEnvelope::new(report)))
}

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks))
        .route("/tasks/stats", get(task_statistics))
}
