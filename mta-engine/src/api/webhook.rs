//! Webhook intake
//!
//! `POST /webhook` with `{meetingName, actionItems}`. The body is read as raw
//! bytes so malformed JSON gets the same 400 envelope as any other
//! validation failure.

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use mta_common::api::SuccessEnvelope;

use crate::error::ApiResult;
use crate::models::WebhookSummary;
use crate::validators::parse_webhook_body;
use crate::AppState;

/// POST /webhook
pub async fn receive_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<SuccessEnvelope<WebhookSummary>>> {
    let request = parse_webhook_body(&body)?;

    match state.pipeline.process(&request).await {
        Ok(summary) => Ok(Json(SuccessEnvelope::new(summary))),
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(e.into())
        }
    }
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(receive_webhook))
}
