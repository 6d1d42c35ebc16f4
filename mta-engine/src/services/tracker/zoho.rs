//! Zoho Sprints tracker
//!
//! One `POST /team/{team}/projects/{project}/sprints/{sprint}/item/` per
//! item, sequentially, with a fixed pause between calls. Every HTTP failure is
//! turned into a failed result for that item; the batch itself only fails if
//! the client cannot be built.

use std::time::Duration;

use mta_common::config::{TrackerSettings, ZohoCredentials};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::{pace, task_description, RawTrackerResult, Tracker, INITIAL_STATUS};
use crate::models::CategorizedItem;
use crate::services::CollaboratorError;
use crate::validators::normalize_text;

const USER_AGENT: &str = concat!("mta-engine/", env!("CARGO_PKG_VERSION"));
const TASK_MIN_LEN: usize = 3;
const TASK_MAX_LEN: usize = 200;

#[derive(Debug, Serialize)]
struct CreateItemBody<'a> {
    name: &'a str,
    description: String,
    priority: &'static str,
    assignee: Option<&'a str>,
    status: &'static str,
}

/// Task id from a create response: `id`, `itemId` or `taskId`, string or number
pub fn extract_task_id(body: &Value) -> Option<String> {
    ["id", "itemId", "taskId"].iter().find_map(|key| match body.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Caller-facing message for an error status
pub fn status_message(status: u16, reason: &str) -> String {
    match status {
        401 => "Zoho authentication failed - invalid or expired token".to_string(),
        403 => "Zoho authorization failed - insufficient permissions".to_string(),
        404 => "Zoho resource not found - check team/project/sprint IDs".to_string(),
        429 => "Zoho rate limit exceeded - please try again later".to_string(),
        500 => "Zoho internal server error".to_string(),
        502..=504 => "Zoho service temporarily unavailable".to_string(),
        _ => format!("Zoho API error ({}): {}", status, reason),
    }
}

fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Zoho request timeout - service may be slow or unavailable".to_string()
    } else if err.is_connect() {
        "Network error connecting to Zoho service".to_string()
    } else {
        format!("Zoho task creation failed: {}", err)
    }
}

fn check_task_length(task: &str) -> Result<(), String> {
    let len = task.chars().count();
    if len < TASK_MIN_LEN {
        Err(format!("Task must be at least {} characters long", TASK_MIN_LEN))
    } else if len > TASK_MAX_LEN {
        Err(format!("Task must not exceed {} characters", TASK_MAX_LEN))
    } else {
        Ok(())
    }
}

pub struct ZohoSprintsTracker {
    http_client: reqwest::Client,
    credentials: ZohoCredentials,
    base_url: String,
    request_delay: Duration,
}

impl ZohoSprintsTracker {
    pub fn new(
        credentials: ZohoCredentials,
        base_url: impl Into<String>,
        timeout: Duration,
        request_delay: Duration,
    ) -> Result<Self, CollaboratorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_delay,
        })
    }

    pub fn from_settings(settings: &TrackerSettings) -> Result<Self, CollaboratorError> {
        let credentials = settings.zoho.clone().ok_or_else(|| {
            CollaboratorError::Auth("Zoho configuration is incomplete".to_string())
        })?;
        Self::new(
            credentials,
            settings.zoho_base_url.clone(),
            Duration::from_secs(settings.timeout_secs),
            Duration::from_millis(settings.request_delay_ms),
        )
    }

    fn items_url(&self) -> String {
        format!(
            "{}/team/{}/projects/{}/sprints/{}/item/",
            self.base_url, self.credentials.team_id, self.credentials.project_id, self.credentials.sprint_id
        )
    }

    async fn create_task(&self, item: &CategorizedItem) -> RawTrackerResult {
        let task = normalize_text(&item.task);
        if let Err(message) = check_task_length(&task) {
            warn!(task = %item.task, "Rejected task before Zoho call: {}", message);
            return RawTrackerResult::failed(item.task.clone(), message);
        }

        let body = CreateItemBody {
            name: &task,
            description: task_description(item),
            priority: item.department.priority(),
            assignee: None,
            status: INITIAL_STATUS,
        };

        let response = match self
            .http_client
            .post(self.items_url())
            .bearer_auth(&self.credentials.bearer_token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(task = %task, error = %e, "Error creating task in Zoho Sprints");
                return RawTrackerResult::failed(task, transport_message(&e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(task = %task, status = status.as_u16(), detail = %detail, "Zoho rejected task creation");
            let reason = status.canonical_reason().unwrap_or("Unknown");
            return RawTrackerResult::failed(task, status_message(status.as_u16(), reason));
        }

        let reply: Value = response.json().await.unwrap_or(Value::Null);
        let task_id = extract_task_id(&reply);
        if task_id.is_none() {
            warn!(task = %task, response = %reply, "No task ID found in Zoho response");
        }

        info!(task = %task, department = %item.department, "Task created in Zoho Sprints");
        RawTrackerResult::created(task, task_id)
    }
}

#[async_trait::async_trait]
impl Tracker for ZohoSprintsTracker {
    fn name(&self) -> &'static str {
        "zoho"
    }

    async fn create_tasks(&self, items: &[CategorizedItem]) -> Result<Vec<RawTrackerResult>, CollaboratorError> {
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            results.push(self.create_task(item).await);
            pace(index, items.len(), self.request_delay).await;
        }
        Ok(results)
    }
}
