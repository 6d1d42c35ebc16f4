//! Local JSON task tracker
//!
//! Keeps created tasks in `{tasks, metadata}` on disk instead of an external
//! service. Each task is appended with its own read-modify-write, serialized by
//! an in-process mutex and persisted with [`atomic_write`].

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use mta_common::config::TrackerSettings;
use mta_common::time::now;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use super::{pace, task_description, RawTrackerResult, Tracker, INITIAL_STATUS};
use crate::models::{CategorizedItem, Department};
use crate::services::CollaboratorError;
use crate::utils::atomic_write;
use crate::validators::normalize_text;

const TASK_SOURCE: &str = "Meeting Task Automation";
const TASK_MAX_LEN: usize = 500;
const DUE_IN_DAYS: i64 = 7;
const RECENT_DAYS: i64 = 7;

fn assignee_for(department: Department) -> &'static str {
    match department {
        Department::Design => "Design Team",
        Department::Procurement => "Procurement Team",
        Department::Production => "Production Team",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalTask {
    pub id: String,
    pub name: String,
    pub description: String,
    pub department: Department,
    pub priority: String,
    pub assignee: String,
    pub status: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub total_tasks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskDocument {
    tasks: Vec<LocalTask>,
    metadata: TaskMetadata,
}

impl TaskDocument {
    fn empty() -> Self {
        let created = now();
        Self {
            tasks: Vec::new(),
            metadata: TaskMetadata {
                created,
                last_updated: created,
                total_tasks: 0,
            },
        }
    }
}

/// Query filters for [`LocalTaskTracker::list`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub department: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskListing {
    pub tasks: Vec<LocalTask>,
    pub total: usize,
    pub metadata: TaskMetadata,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatistics {
    pub total: usize,
    pub by_department: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    /// Created within the last seven days
    pub recently_created: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub statistics: TaskStatistics,
    pub metadata: TaskMetadata,
}

pub struct LocalTaskTracker {
    tasks_file: PathBuf,
    request_delay: Duration,
    write_guard: Mutex<()>,
}

impl LocalTaskTracker {
    pub fn new(tasks_file: impl Into<PathBuf>, request_delay: Duration) -> Self {
        Self {
            tasks_file: tasks_file.into(),
            request_delay,
            write_guard: Mutex::new(()),
        }
    }

    pub fn from_settings(settings: &TrackerSettings) -> Self {
        Self::new(
            settings.local_tasks_file.clone(),
            Duration::from_millis(settings.request_delay_ms),
        )
    }

    pub fn tasks_file(&self) -> &Path {
        &self.tasks_file
    }

    async fn load(&self) -> Result<TaskDocument, CollaboratorError> {
        match tokio::fs::read_to_string(&self.tasks_file).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| CollaboratorError::Storage(format!("Failed to load tasks: {}", e))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(TaskDocument::empty()),
            Err(e) => Err(CollaboratorError::Storage(format!("Failed to load tasks: {}", e))),
        }
    }

    async fn save(&self, doc: &mut TaskDocument) -> Result<(), CollaboratorError> {
        doc.metadata.last_updated = now();
        doc.metadata.total_tasks = doc.tasks.len();

        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| CollaboratorError::Storage(format!("Failed to save tasks: {}", e)))?;
        if let Some(parent) = self.tasks_file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CollaboratorError::Storage(format!("Failed to save tasks: {}", e)))?;
        }
        atomic_write(&self.tasks_file, json.as_bytes())
            .await
            .map_err(|e| CollaboratorError::Storage(format!("Failed to save tasks: {}", e)))
    }

    async fn create_task(&self, item: &CategorizedItem) -> Result<LocalTask, CollaboratorError> {
        let name = normalize_text(&item.task);
        if name.is_empty() {
            return Err(CollaboratorError::InvalidBatch("Task must be a non-empty string".to_string()));
        }
        if name.chars().count() > TASK_MAX_LEN {
            return Err(CollaboratorError::InvalidBatch(format!(
                "Task description too long (max {} characters)",
                TASK_MAX_LEN
            )));
        }

        let _guard = self.write_guard.lock().await;
        let mut doc = self.load().await?;

        let created = now();
        let task = LocalTask {
            id: Uuid::new_v4().simple().to_string(),
            name,
            description: task_description(item),
            department: item.department,
            priority: item.department.priority().to_string(),
            assignee: assignee_for(item.department).to_string(),
            status: INITIAL_STATUS.to_string(),
            created,
            updated: created,
            due_date: created + ChronoDuration::days(DUE_IN_DAYS),
            source: TASK_SOURCE.to_string(),
        };
        doc.tasks.push(task.clone());
        self.save(&mut doc).await?;

        info!(task = %task.name, department = %task.department, id = %task.id, "Task created locally");
        Ok(task)
    }

    /// Tasks matching `filter`, in creation order
    pub async fn list(&self, filter: &TaskFilter) -> Result<TaskListing, CollaboratorError> {
        let doc = self.load().await?;
        let tasks: Vec<LocalTask> = doc
            .tasks
            .into_iter()
            .filter(|t| filter.department.as_deref().map_or(true, |d| t.department.as_str() == d))
            .filter(|t| filter.status.as_deref().map_or(true, |s| t.status == s))
            .collect();

        Ok(TaskListing {
            total: tasks.len(),
            tasks,
            metadata: doc.metadata,
        })
    }

    pub async fn statistics(&self) -> Result<StatisticsReport, CollaboratorError> {
        let doc = self.load().await?;
        let week_ago = now() - ChronoDuration::days(RECENT_DAYS);

        let mut statistics = TaskStatistics {
            total: doc.tasks.len(),
            ..Default::default()
        };
        for task in &doc.tasks {
            *statistics.by_department.entry(task.department.to_string()).or_default() += 1;
            *statistics.by_status.entry(task.status.clone()).or_default() += 1;
            *statistics.by_priority.entry(task.priority.clone()).or_default() += 1;
            if task.created > week_ago {
                statistics.recently_created += 1;
            }
        }

        Ok(StatisticsReport {
            statistics,
            metadata: doc.metadata,
        })
    }
}

#[async_trait::async_trait]
impl Tracker for LocalTaskTracker {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn create_tasks(&self, items: &[CategorizedItem]) -> Result<Vec<RawTrackerResult>, CollaboratorError> {
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let result = match self.create_task(item).await {
                Ok(task) => RawTrackerResult::created(task.name, Some(task.id)),
                Err(e) => {
                    error!(task = %item.task, error = %e, "Error creating local task");
                    RawTrackerResult::failed(item.task.clone(), e.to_string())
                }
            };
            results.push(result);
            pace(index, items.len(), self.request_delay).await;
        }
        Ok(results)
    }
}
