//! Meeting monitoring endpoints
//!
//! - `POST /meetings` start a session
//! - `GET /meetings` / `GET /meetings/:id` inspect sessions
//! - `POST /meetings/:id/transcript` add a transcript segment
//! - `POST /meetings/:id/stop` end the session and run its action items
//!   through the webhook pipeline

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use mta_common::api::SuccessEnvelope;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::WebhookSummary;
use crate::services::meeting_registry::AppendOutcome;
use crate::services::{MeetingSnapshot, MeetingSummary, TranscriptInput};
use crate::validators::{
    sanitize, sanitize_action_item, validate_request, MAX_ACTION_ITEMS, MEETING_NAME_MAX_LEN,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMeetingRequest {
    pub meeting_name: String,
    #[serde(default)]
    pub meeting_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: MeetingSnapshot,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub meetings: Vec<MeetingSnapshot>,
    pub total: usize,
}

/// Collected item left out of the pipeline submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedItem {
    pub task: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopMeetingResponse {
    pub summary: MeetingSummary,
    /// Items that failed sanitization or repeated an earlier item
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_items: Vec<RejectedItem>,
    /// Present when the session produced action items and the pipeline ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_result: Option<WebhookSummary>,
    /// Why the collected items could not be processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_error: Option<String>,
}

/// Sanitize collected items one by one so a bad item only drops itself.
///
/// Returns the unique sanitized items in collection order, plus the rejects.
pub fn prepare_submission(collected: &[String]) -> (Vec<String>, Vec<RejectedItem>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    let mut seen = HashSet::new();

    for item in collected {
        match sanitize_action_item(item) {
            Ok(sanitized) if seen.contains(&sanitized) => rejected.push(RejectedItem {
                task: item.clone(),
                reason: "duplicate of an earlier action item".to_string(),
            }),
            Ok(sanitized) => {
                seen.insert(sanitized.clone());
                accepted.push(sanitized);
            }
            Err(reason) => rejected.push(RejectedItem {
                task: item.clone(),
                reason: reason.to_string(),
            }),
        }
    }
    (accepted, rejected)
}

fn parse_session_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("Meeting session not found: {}", raw)))
}

/// POST /meetings
pub async fn start_meeting(
    State(state): State<AppState>,
    Json(body): Json<StartMeetingRequest>,
) -> ApiResult<(StatusCode, Json<SuccessEnvelope<SessionResponse>>)> {
    let meeting_name = sanitize(&body.meeting_name, MEETING_NAME_MAX_LEN)
        .map_err(|e| ApiError::BadRequest(format!("meetingName: {}", e)))?;
    let session = state.registry.start(meeting_name, body.meeting_id).await;
    Ok((StatusCode::CREATED, Json(SuccessEnvelope::new(SessionResponse { session }))))
}

/// GET /meetings
pub async fn list_meetings(State(state): State<AppState>) -> Json<SuccessEnvelope<SessionListResponse>> {
    let meetings = state.registry.list().await;
    Json(SuccessEnvelope::new(SessionListResponse {
        total: meetings.len(),
        meetings,
    }))
}

/// GET /meetings/:id
pub async fn get_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessEnvelope<SessionResponse>>> {
    let session = state.registry.status(parse_session_id(&id)?).await?;
    Ok(Json(SuccessEnvelope::new(SessionResponse { session })))
}

/// POST /meetings/:id/transcript
pub async fn add_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<TranscriptInput>,
) -> ApiResult<Json<SuccessEnvelope<AppendOutcome>>> {
    let id = parse_session_id(&id)?;
    if input.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text: must not be empty".to_string()));
    }
    let outcome = state.registry.append(id, input).await?;
    Ok(Json(SuccessEnvelope::new(outcome)))
}

/// POST /meetings/:id/stop
pub async fn stop_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessEnvelope<StopMeetingResponse>>> {
    let summary = state.registry.stop(parse_session_id(&id)?).await?;

    let (items, rejected_items) = prepare_submission(&summary.action_items);
    for rejected in &rejected_items {
        warn!(meeting = %summary.meeting_name, task = %rejected.task, reason = %rejected.reason, "Dropping collected action item");
    }

    let mut response = StopMeetingResponse {
        summary,
        rejected_items,
        pipeline_result: None,
        pipeline_error: None,
    };
    if items.is_empty() {
        info!(meeting = %response.summary.meeting_name, "Meeting stopped without action items");
        return Ok(Json(SuccessEnvelope::new(response)));
    }

    if items.len() > MAX_ACTION_ITEMS {
        warn!(
            meeting = %response.summary.meeting_name,
            collected = items.len(),
            submitted = MAX_ACTION_ITEMS,
            "Too many action items collected, submitting the first batch only"
        );
    }
    let items: Vec<&String> = items.iter().take(MAX_ACTION_ITEMS).collect();
    let body = json!({
        "meetingName": response.summary.meeting_name,
        "actionItems": items,
    });

    match validate_request(&body) {
        Ok(request) => match state.pipeline.process(&request).await {
            Ok(result) => response.pipeline_result = Some(result),
            Err(e) => {
                state.record_error(e.to_string()).await;
                response.pipeline_error = Some(e.to_string());
            }
        },
        Err(e) => {
            warn!(meeting = %response.summary.meeting_name, error = %e, "Collected action items failed validation");
            response.pipeline_error = Some(e.to_string());
        }
    }

    Ok(Json(SuccessEnvelope::new(response)))
}

pub fn meeting_routes() -> Router<AppState> {
    Router::new()
        .route("/meetings", post(start_meeting).get(list_meetings))
        .route("/meetings/:id", get(get_meeting))
        .route("/meetings/:id/transcript", post(add_transcript))
        .route("/meetings/:id/stop", post(stop_meeting))
}
