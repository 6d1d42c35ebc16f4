//! Webhook processing pipeline
//!
//! validated request → dedup against state → categorizer → tracker → commit.
//!
//! Guarantees:
//! - an item whose fingerprint is already recorded never reaches a collaborator
//! - a record is written only after the tracker reported success for the
//!   same task text at the same position
//! - a failed commit or identity check affects only its own item
//!
//! A crash between task creation and record commit leaves no record, so the
//! next delivery of the same item creates a second external task.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use super::boundary::{validate_categorizations, validate_tracker_results};
use super::categorizer::Categorizer;
use super::tracker::Tracker;
use super::CollaboratorError;
use crate::models::{
    CategorizedItem, ItemStage, PipelineItem, ProcessingRecord, SkippedItem, TrackerOutcome,
    WebhookRequest, WebhookSummary,
};
use crate::state::{StateError, StateStore};

pub const MESSAGE_PROCESSED: &str = "Webhook processed successfully";
pub const MESSAGE_ALL_SKIPPED: &str = "All items have already been processed";

/// What stopped a pipeline run
#[derive(Debug, Error)]
pub enum PipelineFailure {
    #[error("AI service unavailable: {0}")]
    Categorizer(#[source] CollaboratorError),

    #[error("Task tracker unavailable: {0}")]
    Tracker(#[source] CollaboratorError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Failed run, with the dedup results gathered before the failure
#[derive(Debug, Error)]
#[error("{failure}")]
pub struct PipelineError {
    #[source]
    pub failure: PipelineFailure,
    pub meeting_name: String,
    pub total_items: usize,
    pub skipped_items: Vec<SkippedItem>,
}

/// Same task text at every stage
fn identity_holds(item: &PipelineItem, categorized: &CategorizedItem, outcome: &TrackerOutcome) -> bool {
    item.raw_text == categorized.task && categorized.task == outcome.task()
}

pub struct Pipeline {
    store: StateStore,
    categorizer: Arc<dyn Categorizer>,
    tracker: Arc<dyn Tracker>,
}

impl Pipeline {
    pub fn new(store: StateStore, categorizer: Arc<dyn Categorizer>, tracker: Arc<dyn Tracker>) -> Self {
        Self {
            store,
            categorizer,
            tracker,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub async fn process(&self, request: &WebhookRequest) -> Result<WebhookSummary, PipelineError> {
        let total_items = request.action_items.len();
        info!(
            meeting = %request.meeting_name,
            items = total_items,
            "Processing webhook"
        );

        let fail = |failure: PipelineFailure, skipped_items: Vec<SkippedItem>| {
            error!(meeting = %request.meeting_name, error = %failure, "Webhook processing failed");
            PipelineError {
                failure,
                meeting_name: request.meeting_name.clone(),
                total_items,
                skipped_items,
            }
        };

        // 1. Dedup
        let state = self
            .store
            .load()
            .await
            .map_err(|e| fail(PipelineFailure::State(e), Vec::new()))?;

        let mut items: Vec<PipelineItem> = request.action_items.iter().cloned().map(PipelineItem::new).collect();
        let mut skipped_items = Vec::new();
        for item in items.iter_mut() {
            if state.contains_key(&item.fingerprint) {
                item.advance(ItemStage::Deduped);
                skipped_items.push(SkippedItem::already_processed(item.raw_text.clone()));
            }
        }
        drop(state);

        let mut new_items: Vec<PipelineItem> = items
            .into_iter()
            .filter(|item| item.stage() == ItemStage::New)
            .collect();

        // 2. Nothing new
        if new_items.is_empty() {
            info!(meeting = %request.meeting_name, skipped = skipped_items.len(), "All items already processed");
            return Ok(WebhookSummary {
                message: MESSAGE_ALL_SKIPPED.to_string(),
                meeting_name: request.meeting_name.clone(),
                total_items,
                new_items: 0,
                skipped_items,
                categorized_items: Vec::new(),
                tracker_results: Vec::new(),
            });
        }

        // 3. Categorize
        let texts: Vec<String> = new_items.iter().map(|item| item.raw_text.clone()).collect();
        let categorized = match self.categorizer.categorize(&texts).await {
            Ok(raw) => validate_categorizations(&texts, raw),
            Err(e) => Err(e),
        }
        .map_err(|e| fail(PipelineFailure::Categorizer(e), skipped_items.clone()))?;
        for item in new_items.iter_mut() {
            item.advance(ItemStage::Categorized);
        }
        info!(
            categorizer = self.categorizer.name(),
            count = categorized.len(),
            "Categorized new items"
        );

        // 4. Create tasks
        let outcomes = match self.tracker.create_tasks(&categorized).await {
            Ok(raw) => validate_tracker_results(&categorized, raw),
            Err(e) => Err(e),
        }
        .map_err(|e| fail(PipelineFailure::Tracker(e), skipped_items.clone()))?;

        // 5 + 6. Identity check and commit
        let mut tracker_results = Vec::with_capacity(outcomes.len());
        let (mut recorded, mut failed, mut discarded, mut uncommitted) = (0usize, 0usize, 0usize, 0usize);
        for ((item, categorized_item), outcome) in new_items.iter_mut().zip(&categorized).zip(outcomes) {
            if !identity_holds(item, categorized_item, &outcome) {
                error!(
                    new_item = %item.raw_text,
                    categorized_item = %categorized_item.task,
                    tracker_result = %outcome.task(),
                    "Data integrity error: task mismatch during processing"
                );
                item.advance(ItemStage::Discarded);
                discarded += 1;
                continue;
            }

            match &outcome {
                TrackerOutcome::Failed { error, .. } => {
                    warn!(task = %item.raw_text, error = %error, "Tracker failed to create task");
                    item.advance(ItemStage::TrackerFailed);
                    failed += 1;
                }
                TrackerOutcome::Created { task_id, .. } => {
                    item.advance(ItemStage::TrackerCreated);
                    let record = ProcessingRecord {
                        task: item.raw_text.clone(),
                        department: categorized_item.department,
                        meeting_name: request.meeting_name.clone(),
                        external_task_id: task_id.clone(),
                        processed_at: mta_common::time::now(),
                    };
                    match self.store.put(item.fingerprint.clone(), record).await {
                        Ok(()) => {
                            item.advance(ItemStage::Recorded);
                            recorded += 1;
                        }
                        Err(e) => {
                            item.advance(ItemStage::Uncommitted);
                            error!(
                                task = %item.raw_text,
                                stage = ?item.stage(),
                                error = %e,
                                "Failed to mark task as processed"
                            );
                            uncommitted += 1;
                        }
                    }
                }
            }
            tracker_results.push(outcome);
        }

        info!(
            meeting = %request.meeting_name,
            new = new_items.len(),
            skipped = skipped_items.len(),
            recorded,
            failed,
            discarded,
            uncommitted,
            "Webhook processed"
        );

        Ok(WebhookSummary {
            message: MESSAGE_PROCESSED.to_string(),
            meeting_name: request.meeting_name.clone(),
            total_items,
            new_items: new_items.len(),
            skipped_items,
            categorized_items: categorized,
            tracker_results,
        })
    }
}
