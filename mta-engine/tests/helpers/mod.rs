//! Test helpers: in-memory collaborators and an isolated state store

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mta_common::config::StateSettings;
use mta_engine::models::{CategorizedItem, WebhookRequest};
use mta_engine::services::{
    Categorizer, CollaboratorError, Pipeline, RawCategorization, RawTrackerResult, Tracker,
};
use mta_engine::state::{StateLock, StateStore};
use mta_engine::validators::validate_request;
use serde_json::json;
use tempfile::TempDir;

pub const MEETING: &str = "Product Development Meeting";

pub fn reference_items() -> Vec<&'static str> {
    vec![
        "Nutrition formulation",
        "Label design",
        "Commercial costing",
        "Final cost calculation",
    ]
}

pub fn request(meeting_name: &str, items: &[&str]) -> WebhookRequest {
    validate_request(&json!({ "meetingName": meeting_name, "actionItems": items })).unwrap()
}

pub fn test_store(dir: &TempDir) -> StateStore {
    let lock = StateLock::with_timings(
        dir.path().join("state.lock"),
        Duration::from_millis(500),
        Duration::from_secs(30),
        Duration::from_millis(10),
    );
    StateStore::new(
        dir.path().join("state.json"),
        lock,
        &StateSettings {
            ttl_days: 30,
            max_size_mb: 10,
        },
    )
}

/// How the fake categorizer answers
#[derive(Debug, Clone)]
pub enum CategorizerMode {
    /// Department from the table, `Production` otherwise
    Table(HashMap<String, String>),
    /// Whole call fails
    Unavailable,
    /// Answers one entry short
    DropLast,
}

pub struct FakeCategorizer {
    mode: CategorizerMode,
    pub calls: AtomicUsize,
}

impl FakeCategorizer {
    pub fn with_table(pairs: &[(&str, &str)]) -> Arc<Self> {
        let table = pairs.iter().map(|(t, d)| (t.to_string(), d.to_string())).collect();
        Arc::new(Self {
            mode: CategorizerMode::Table(table),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn reference() -> Arc<Self> {
        Self::with_table(&[
            ("Nutrition formulation", "Production"),
            ("Label design", "Design"),
            ("Commercial costing", "Procurement"),
            ("Final cost calculation", "Production"),
        ])
    }

    pub fn with_mode(mode: CategorizerMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Categorizer for FakeCategorizer {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn categorize(&self, items: &[String]) -> Result<Vec<RawCategorization>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            CategorizerMode::Table(table) => Ok(items
                .iter()
                .map(|item| {
                    let department = table.get(item).cloned().unwrap_or_else(|| "Production".to_string());
                    RawCategorization::new(item.clone(), department)
                })
                .collect()),
            CategorizerMode::Unavailable => Err(CollaboratorError::RateLimited("quota exhausted".to_string())),
            CategorizerMode::DropLast => Ok(items
                .iter()
                .take(items.len().saturating_sub(1))
                .map(|item| RawCategorization::new(item.clone(), "Design"))
                .collect()),
        }
    }
}

/// Fake tracker recording every task it is asked to create
#[derive(Default)]
pub struct FakeTracker {
    /// Tasks that fail with a per-item error
    pub failing: Vec<String>,
    /// Tasks answered under a different task text
    pub renamed: HashMap<String, String>,
    /// Whole batch fails
    pub unavailable: bool,
    /// State document replaced by a directory while tasks are created
    pub break_state: Option<PathBuf>,
    pub created: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl FakeTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(tasks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: tasks.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        })
    }

    pub fn renaming(from: &str, to: &str) -> Arc<Self> {
        Arc::new(Self {
            renamed: HashMap::from([(from.to_string(), to.to_string())]),
            ..Default::default()
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            unavailable: true,
            ..Default::default()
        })
    }

    /// Makes every later state write fail
    pub fn breaking_state(dir: &TempDir) -> Arc<Self> {
        Arc::new(Self {
            break_state: Some(dir.path().join("state.json")),
            ..Default::default()
        })
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Tracker for FakeTracker {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn create_tasks(&self, items: &[CategorizedItem]) -> Result<Vec<RawTrackerResult>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(CollaboratorError::Network("connection refused".to_string()));
        }
        if let Some(state_path) = &self.break_state {
            let _ = std::fs::remove_file(state_path);
            std::fs::create_dir_all(state_path).unwrap();
            std::fs::write(state_path.join("occupied"), "x").unwrap();
        }

        let mut created = self.created.lock().unwrap();
        Ok(items
            .iter()
            .map(|item| {
                if self.failing.contains(&item.task) {
                    return RawTrackerResult::failed(item.task.clone(), "Zoho internal server error");
                }
                created.push(item.task.clone());
                let id = format!("task-{}", created.len());
                let reported = self.renamed.get(&item.task).cloned().unwrap_or_else(|| item.task.clone());
                RawTrackerResult::created(reported, Some(id))
            })
            .collect())
    }
}

pub fn pipeline(dir: &TempDir, categorizer: Arc<FakeCategorizer>, tracker: Arc<FakeTracker>) -> Pipeline {
    Pipeline::new(test_store(dir), categorizer, tracker)
}
