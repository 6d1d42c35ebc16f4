//! Gemini categorizer
//!
//! Calls the Generative Language REST API (`models/{model}:generateContent`)
//! with a prompt listing the items and asks for a bare JSON array of
//! `{task, department}` objects. Replies wrapped in Markdown code fences are
//! accepted.

use std::time::Duration;

use mta_common::config::CategorizerSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use super::{check_batch, Categorizer, RawCategorization};
use crate::models::Department;
use crate::services::CollaboratorError;

const USER_AGENT: &str = concat!("mta-engine/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Remove characters that could confuse the model's JSON output
fn prompt_safe(item: &str) -> String {
    item.chars()
        .filter(|c| !matches!(c, '{' | '}' | '[' | ']' | '(' | ')'))
        .collect()
}

/// Prompt asking for one `{task, department}` object per item
pub fn build_prompt(items: &[String]) -> String {
    let departments: Vec<&str> = Department::ALL.iter().map(|d| d.as_str()).collect();
    let listing: Vec<String> = items.iter().map(|item| format!("- {}", prompt_safe(item))).collect();
    format!(
        "Please categorize each of the following action items into one of these departments: {}.\n\
         Return the result as a JSON array of objects with the format: [{{ \"task\": string, \"department\": string }}].\n\
         Keep each task text exactly as given and keep the items in the same order.\n\n\
         Action items to categorize:\n{}\n\n\
         Only respond with the JSON array, no additional text or explanation.",
        departments.join(", "),
        listing.join("\n")
    )
}

/// Strip a surrounding ```json ... ``` fence if present
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse the model's reply text into raw categorizations
pub fn parse_reply(text: &str) -> Result<Vec<RawCategorization>, CollaboratorError> {
    let cleaned = strip_code_fences(text);
    let value: Value = serde_json::from_str(cleaned).map_err(|e| {
        error!(reply = %cleaned, "Failed to parse AI response as JSON");
        CollaboratorError::InvalidResponse(format!("AI response is not valid JSON: {}", e))
    })?;

    let Value::Array(entries) = value else {
        return Err(CollaboratorError::InvalidResponse(
            "AI response must be an array".to_string(),
        ));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            if !entry.is_object() {
                return Err(CollaboratorError::InvalidResponse(format!(
                    "item at index {} is not a valid object",
                    index
                )));
            }
            serde_json::from_value(entry).map_err(|e| {
                CollaboratorError::InvalidResponse(format!("item at index {}: {}", index, e))
            })
        })
        .collect()
}

/// Map an error status and body to the categorizer error kinds
fn classify_status(status: u16, body: &str) -> CollaboratorError {
    let lower = body.to_lowercase();
    if status == 401 || status == 403 || lower.contains("api_key") || lower.contains("api key") {
        CollaboratorError::Auth("Invalid or missing Gemini API key".to_string())
    } else if status == 429 || lower.contains("quota") || lower.contains("rate limit") {
        CollaboratorError::RateLimited("AI service quota exceeded or rate limit reached".to_string())
    } else {
        CollaboratorError::Api(status, body.chars().take(300).collect())
    }
}

pub struct GeminiCategorizer {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiCategorizer {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &CategorizerSettings) -> Result<Self, CollaboratorError> {
        let api_key = settings
            .gemini_api_key
            .clone()
            .ok_or_else(|| CollaboratorError::Auth("GEMINI_API_KEY is not configured".to_string()))?;
        Self::new(
            api_key,
            settings.model.clone(),
            settings.endpoint.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        debug!(url = %url, model = %self.model, "Querying Gemini API");

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&GenerateRequest {
                contents: [Content {
                    parts: [Part { text: prompt }],
                }],
            })
            .send()
            .await
            .map_err(CollaboratorError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let reply: GenerateResponse = response.json().await.map_err(CollaboratorError::from_reqwest)?;
        reply
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| CollaboratorError::InvalidResponse("AI response contained no text".to_string()))
    }
}

#[async_trait::async_trait]
impl Categorizer for GeminiCategorizer {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn categorize(&self, items: &[String]) -> Result<Vec<RawCategorization>, CollaboratorError> {
        check_batch(items)?;

        let prompt = build_prompt(items);
        let text = self.generate(&prompt).await.map_err(|e| {
            error!(error = %e, "Error categorizing action items");
            e
        })?;
        let results = parse_reply(&text)?;

        info!(count = results.len(), model = %self.model, "Categorized items with Gemini");
        Ok(results)
    }
}
