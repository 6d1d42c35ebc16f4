//! Rule-based categorizer
//!
//! Scores each department by how many of its keywords occur in the task text.
//! Highest score wins; ties go to the earlier department in
//! [`Department::ALL`]; no match at all means [`Department::DEFAULT`].
//! Needs no credentials, so it is the fallback when no Gemini key is configured.

use tracing::info;

use super::{check_batch, Categorizer, RawCategorization};
use crate::models::Department;
use crate::services::CollaboratorError;

const DESIGN_KEYWORDS: &[&str] = &[
    "design", "label", "packaging", "brand", "visual", "creative", "artwork", "graphics", "layout",
    "ui", "ux", "appearance",
];

const PROCUREMENT_KEYWORDS: &[&str] = &[
    "costing", "cost", "procurement", "purchase", "buying", "sourcing", "supplier", "vendor",
    "price", "budget", "commercial", "negotiation",
];

const PRODUCTION_KEYWORDS: &[&str] = &[
    "production", "manufacturing", "formulation", "processing", "quality", "testing", "assembly",
    "operations", "factory",
];

fn keywords_for(department: Department) -> &'static [&'static str] {
    match department {
        Department::Design => DESIGN_KEYWORDS,
        Department::Procurement => PROCUREMENT_KEYWORDS,
        Department::Production => PRODUCTION_KEYWORDS,
    }
}

fn contains_keyword(text: &str, keyword: &str) -> bool {
    // Two-letter keywords ("ui", "ux") only count as whole words
    if keyword.len() <= 2 {
        text.split(|c: char| !c.is_alphanumeric())
            .any(|word| word == keyword)
    } else {
        text.contains(keyword)
    }
}

/// Keyword score for one department
pub fn score(text: &str, department: Department) -> usize {
    let lower = text.to_lowercase();
    keywords_for(department)
        .iter()
        .filter(|keyword| contains_keyword(&lower, keyword))
        .count()
}

/// Best department for `text`
pub fn categorize_text(text: &str) -> Department {
    let mut best = Department::DEFAULT;
    let mut best_score = 0;
    for department in Department::ALL {
        let s = score(text, department);
        if s > best_score {
            best = department;
            best_score = s;
        }
    }
    best
}

#[derive(Debug, Clone, Default)]
pub struct KeywordCategorizer;

impl KeywordCategorizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Categorizer for KeywordCategorizer {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn categorize(&self, items: &[String]) -> Result<Vec<RawCategorization>, CollaboratorError> {
        check_batch(items)?;

        let results: Vec<RawCategorization> = items
            .iter()
            .map(|item| RawCategorization::new(item.clone(), categorize_text(item).as_str()))
            .collect();

        info!(count = results.len(), "Categorized items using keyword rules");
        Ok(results)
    }
}
