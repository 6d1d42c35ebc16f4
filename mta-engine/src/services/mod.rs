//! Pipeline, collaborators and meeting sessions
//!
//! - **pipeline** - dedup, categorize, create, commit
//! - **boundary** - validation of collaborator answers
//! - **categorizer** / **tracker** - collaborator traits and providers
//! - **meeting_registry** / **transcript** - transcript-driven action items

pub mod boundary;
pub mod categorizer;
pub mod collaborator;
pub mod meeting_registry;
pub mod pipeline;
pub mod tracker;
pub mod transcript;

pub use categorizer::{Categorizer, GeminiCategorizer, KeywordCategorizer, RawCategorization};
pub use collaborator::CollaboratorError;
pub use meeting_registry::{MeetingRegistry, MeetingSnapshot, MeetingSummary, RegistryError, TranscriptInput};
pub use pipeline::{Pipeline, PipelineError, PipelineFailure};
pub use tracker::{LocalTaskTracker, RawTrackerResult, Tracker, ZohoSprintsTracker};
