//! Persisted proof that an action item became an external task

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Department;

/// One entry of the state document, keyed by fingerprint.
///
/// Written once after the tracker confirmed creation; only TTL eviction removes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRecord {
    pub task: String,
    pub department: Department,
    pub meeting_name: String,
    /// Tracker-side identifier; absent when the tracker did not report one
    #[serde(alias = "zohoTaskId", default)]
    pub external_task_id: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl ProcessingRecord {
    /// True when the record is strictly newer than `cutoff`
    pub fn is_live(&self, cutoff: DateTime<Utc>) -> bool {
        self.processed_at > cutoff
    }
}
