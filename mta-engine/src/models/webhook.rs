//! Webhook request and pipeline result types

use serde::{Deserialize, Serialize, Serializer};

use super::Department;

pub const SKIP_REASON_ALREADY_PROCESSED: &str = "Already processed";

/// Validated webhook payload. Produced only by
/// [`validate_request`](crate::validators::validate_request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    pub meeting_name: String,
    /// Sanitized, unique, in submission order
    pub action_items: Vec<String>,
}

/// Categorizer output after boundary validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedItem {
    pub task: String,
    pub department: Department,
}

/// Tracker output after boundary validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerOutcome {
    Created {
        task: String,
        department: Department,
        task_id: Option<String>,
    },
    Failed {
        task: String,
        department: Department,
        error: String,
    },
}

impl TrackerOutcome {
    pub fn task(&self) -> &str {
        match self {
            TrackerOutcome::Created { task, .. } | TrackerOutcome::Failed { task, .. } => task,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TrackerOutcome::Created { .. })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackerResultJson<'a> {
    success: bool,
    task: &'a str,
    department: Department,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

// Wire shape: {success, task, department, taskId?, error?}
impl Serialize for TrackerOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let json = match self {
            TrackerOutcome::Created {
                task,
                department,
                task_id,
            } => TrackerResultJson {
                success: true,
                task,
                department: *department,
                task_id: task_id.as_deref(),
                error: None,
            },
            TrackerOutcome::Failed {
                task,
                department,
                error,
            } => TrackerResultJson {
                success: false,
                task,
                department: *department,
                task_id: None,
                error: Some(error.as_str()),
            },
        };
        json.serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub task: String,
    pub reason: String,
}

impl SkippedItem {
    pub fn already_processed(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            reason: SKIP_REASON_ALREADY_PROCESSED.to_string(),
        }
    }
}

/// Aggregate result of one pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSummary {
    pub message: String,
    pub meeting_name: String,
    pub total_items: usize,
    pub new_items: usize,
    pub skipped_items: Vec<SkippedItem>,
    pub categorized_items: Vec<CategorizedItem>,
    pub tracker_results: Vec<TrackerOutcome>,
}
