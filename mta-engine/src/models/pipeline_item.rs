//! Per-action-item state machine
//!
//! ```text
//! New ──► Deduped
//!  └──► Categorized ──► TrackerCreated ──► Recorded
//!           │    │             ├──► Uncommitted (record write failed)
//!           │    └──► TrackerFailed
//!           └──────────────────┴──► Discarded   (identity mismatch)
//! ```
//!
//! Deduped, Recorded, Uncommitted, TrackerFailed and Discarded are terminal.

use serde::{Deserialize, Serialize};

use super::Fingerprint;

/// Processing stage of one action item within a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    /// Fingerprint not found in state
    New,
    /// Fingerprint already recorded; nothing to do
    Deduped,
    /// Department assigned by the categorizer
    Categorized,
    /// Tracker reported a created task
    TrackerCreated,
    /// Tracker reported failure for this item
    TrackerFailed,
    /// Processing record committed
    Recorded,
    /// Task exists externally but its record could not be written; a later
    /// delivery of the same item will create it again
    Uncommitted,
    /// Identity check failed across stages; nothing committed
    Discarded,
}

impl ItemStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStage::Deduped
                | ItemStage::Recorded
                | ItemStage::Uncommitted
                | ItemStage::TrackerFailed
                | ItemStage::Discarded
        )
    }

    pub fn can_transition_to(&self, next: ItemStage) -> bool {
        use ItemStage::*;
        matches!(
            (self, next),
            (New, Deduped)
                | (New, Categorized)
                | (Categorized, TrackerCreated)
                | (Categorized, TrackerFailed)
                | (Categorized, Discarded)
                | (TrackerCreated, Recorded)
                | (TrackerCreated, Uncommitted)
                | (TrackerCreated, Discarded)
        )
    }
}

/// Transient tracker for one action item. Never persisted.
#[derive(Debug, Clone)]
pub struct PipelineItem {
    pub raw_text: String,
    pub fingerprint: Fingerprint,
    stage: ItemStage,
}

impl PipelineItem {
    pub fn new(raw_text: String) -> Self {
        let fingerprint = Fingerprint::of(&raw_text);
        Self {
            raw_text,
            fingerprint,
            stage: ItemStage::New,
        }
    }

    pub fn stage(&self) -> ItemStage {
        self.stage
    }

    /// Move to `next`; illegal transitions leave the stage unchanged and return false
    pub fn advance(&mut self, next: ItemStage) -> bool {
        if !self.stage.can_transition_to(next) {
            tracing::debug!(
                task = %self.raw_text,
                from = ?self.stage,
                to = ?next,
                "Ignoring illegal stage transition"
            );
            return false;
        }
        self.stage = next;
        true
    }
}
