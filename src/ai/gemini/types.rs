//! Gemini `generateContent` payload types.
//!
//! Request types are strict. Response types are lenient: every field is
//! optional so that the parser, not serde, decides what a missing piece means.

use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_MODEL: &str = "model";

/// Gemini content container used in requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// Sampling knobs sent alongside `contents`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    /// Tuned for long generations (code, documents).
    fn default() -> Self {
        Self {
            temperature: Some(0.6),
            top_p: Some(0.95),
            top_k: Some(40),
            max_output_tokens: Some(8192),
        }
    }
}

impl GenerationConfig {
    /// Shorter replies for spoken, turn-by-turn chat.
    pub fn interactive() -> Self {
        Self {
            max_output_tokens: Some(2048),
            ..Self::default()
        }
    }
}

/// Top-level `generateContent` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl RequestPayload {
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }
}

/// Top-level `generateContent` response envelope.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Option<Candidate>>>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// Error object returned by Google APIs in 4xx/5xx bodies.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Wrapper used to pull `error.message` out of an HTTP error body.
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Option<Vec<SafetyRating>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Option<Vec<SafetyRating>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Option<Vec<ResponsePart>>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Response part. Non-text parts (inline data, function calls) decode with `text: None`.
#[derive(Debug, Default, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SafetyRating {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub probability: Option<String>,
    #[serde(default)]
    pub blocked: Option<bool>,
}

impl SafetyRating {
    fn render(&self) -> String {
        let mut out = format!(
            "{}={}",
            self.category.as_deref().unwrap_or("UNKNOWN"),
            self.probability.as_deref().unwrap_or("UNKNOWN")
        );
        if self.blocked == Some(true) {
            out.push_str(" (blocked)");
        }
        out
    }
}

/// Render ratings as `CATEGORY=PROBABILITY, ...`, or `n/a` when absent.
pub fn render_safety_ratings(ratings: Option<&[SafetyRating]>) -> String {
    match ratings {
        Some(ratings) if !ratings.is_empty() => ratings
            .iter()
            .map(SafetyRating::render)
            .collect::<Vec<_>>()
            .join(", "),
        _ => "n/a".to_string(),
    }
}
