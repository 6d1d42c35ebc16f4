//! Department categorization collaborators
//!
//! A categorizer receives the ordered list of new action-item texts and answers
//! with one entry per input, in the same order. Answers are untrusted until
//! [`boundary::validate_categorizations`](crate::services::boundary::validate_categorizations)
//! has checked them.

pub mod gemini;
pub mod keyword;

pub use gemini::GeminiCategorizer;
pub use keyword::KeywordCategorizer;

use serde::Deserialize;

use super::CollaboratorError;
use crate::validators::MAX_ACTION_ITEMS;

/// One categorizer answer, as received
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawCategorization {
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

impl RawCategorization {
    pub fn new(task: impl Into<String>, department: impl Into<String>) -> Self {
        Self {
            task: Some(task.into()),
            department: Some(department.into()),
        }
    }
}

#[async_trait::async_trait]
pub trait Categorizer: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Categorize `items`, preserving order
    async fn categorize(&self, items: &[String]) -> Result<Vec<RawCategorization>, CollaboratorError>;
}

/// Batch bounds every categorizer enforces before calling out
pub(crate) fn check_batch(items: &[String]) -> Result<(), CollaboratorError> {
    if items.is_empty() {
        return Err(CollaboratorError::InvalidBatch(
            "action items must be a non-empty list".to_string(),
        ));
    }
    if items.len() > MAX_ACTION_ITEMS {
        return Err(CollaboratorError::InvalidBatch(format!(
            "maximum {} action items allowed per request",
            MAX_ACTION_ITEMS
        )));
    }
    Ok(())
}
