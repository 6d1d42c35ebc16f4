//! Task tracker collaborators
//!
//! A tracker receives the ordered categorized items and answers with one
//! result per item, in the same order. A per-item failure is reported in the
//! result, not as an error; `Err` means the whole batch could not be attempted.

pub mod local;
pub mod zoho;

pub use local::{LocalTask, LocalTaskTracker, TaskFilter, TaskListing, TaskStatistics};
pub use zoho::ZohoSprintsTracker;

use std::time::Duration;

use super::CollaboratorError;
use crate::models::CategorizedItem;

pub const TASK_DESCRIPTION_PREFIX: &str = "Automated task from meeting action items.";
pub const INITIAL_STATUS: &str = "To Do";

/// One tracker answer, as received
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTrackerResult {
    pub success: Option<bool>,
    pub task: Option<String>,
    pub task_id: Option<String>,
    pub error: Option<String>,
}

impl RawTrackerResult {
    pub fn created(task: impl Into<String>, task_id: Option<String>) -> Self {
        Self {
            success: Some(true),
            task: Some(task.into()),
            task_id,
            error: None,
        }
    }

    pub fn failed(task: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            task: Some(task.into()),
            task_id: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait::async_trait]
pub trait Tracker: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Create one task per item, preserving order
    async fn create_tasks(&self, items: &[CategorizedItem]) -> Result<Vec<RawTrackerResult>, CollaboratorError>;
}

/// Sleep between consecutive external calls, but not after the last one
pub(crate) async fn pace(index: usize, total: usize, delay: Duration) {
    if index + 1 < total && !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub(crate) fn task_description(item: &CategorizedItem) -> String {
    format!("{} Department: {}", TASK_DESCRIPTION_PREFIX, item.department)
}
