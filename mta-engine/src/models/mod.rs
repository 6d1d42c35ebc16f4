//! Data models for mta-engine

pub mod department;
pub mod fingerprint;
pub mod pipeline_item;
pub mod processing_record;
pub mod webhook;

pub use department::Department;
pub use fingerprint::Fingerprint;
pub use pipeline_item::{ItemStage, PipelineItem};
pub use processing_record::ProcessingRecord;
pub use webhook::{
    CategorizedItem, SkippedItem, TrackerOutcome, WebhookRequest, WebhookSummary,
    SKIP_REASON_ALREADY_PROCESSED,
};
