//! Interpretation of `generateContent` response bodies.
//!
//! Every branch ends in exactly one [`ApiOutcome`]. The order of checks is:
//! JSON decode, top-level `error`, candidate presence (with prompt feedback),
//! candidate content, then the finish reason against the extracted text.

use super::types::{
    render_safety_ratings, Candidate, CandidateContent, GenerateContentResponse,
};
use crate::ai::outcome::{excerpt, ApiOutcome, Failure, TransportOutcome, Warning};
use serde_json::Value;

/// Longest raw-JSON excerpt carried in a failure detail.
pub const DETAIL_PREVIEW_CHARS: usize = 500;

const FINISH_STOP: &str = "STOP";
const FINISH_MAX_TOKENS: &str = "MAX_TOKENS";
const FINISH_SAFETY: &str = "SAFETY";
const FENCE: &str = "```";

/// Turn a transport result into the caller-facing outcome.
pub fn parse(outcome: TransportOutcome) -> ApiOutcome {
    match outcome {
        Ok(raw) => {
            tracing::debug!(
                "Parsing {} byte response (status {})",
                raw.body.len(),
                raw.status
            );
            parse_body(&raw.body)
        }
        Err(err) => ApiOutcome::Failed(Failure::Transport(err)),
    }
}

pub fn parse_body(body: &str) -> ApiOutcome {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("Failed to decode Gemini response: {}", e);
            return Failure::Decode(format!(
                "{}. Response text: {}",
                e,
                excerpt(body, DETAIL_PREVIEW_CHARS)
            ))
            .into();
        }
    };

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        return api_error(error).into();
    }

    let response: GenerateContentResponse = match serde_json::from_value(value) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Unexpected Gemini response structure: {}", e);
            return Failure::Decode(format!(
                "unexpected response structure: {}. Response JSON: {}",
                e,
                excerpt(body, DETAIL_PREVIEW_CHARS)
            ))
            .into();
        }
    };

    let first = match response.candidates.as_deref() {
        Some([first, ..]) => first,
        _ => return no_candidates(&response, body).into(),
    };

    match first {
        Some(candidate) => parse_candidate(candidate),
        None => Failure::EmptyContent("first candidate is null".to_string()).into(),
    }
}

/// Fields are read independently so one ill-typed field never hides the other.
fn api_error(error: &Value) -> Failure {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .filter(|m| !m.is_empty())
        .unwrap_or("Unknown API error")
        .to_string();
    let code = error.get("code").and_then(Value::as_i64);
    tracing::error!("Gemini returned an error object: {} (code {:?})", message, code);
    Failure::ApiError { message, code }
}

fn no_candidates(response: &GenerateContentResponse, body: &str) -> Failure {
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = feedback
            .block_reason
            .as_deref()
            .filter(|r| !is_unspecified(r))
        {
            tracing::warn!(
                "Prompt blocked: {} (safety ratings: {})",
                reason,
                render_safety_ratings(feedback.safety_ratings.as_deref())
            );
            return Failure::Blocked(reason.to_string());
        }
    }
    Failure::NoCandidates(excerpt(body, DETAIL_PREVIEW_CHARS))
}

fn parse_candidate(candidate: &Candidate) -> ApiOutcome {
    let finish_reason = candidate.finish_reason.as_deref();
    let ratings = || render_safety_ratings(candidate.safety_ratings.as_deref());

    let Some(text) = extract_text(candidate.content.as_ref()) else {
        return match finish_reason.filter(|r| !is_stop(r)) {
            Some(reason) => Failure::UnexpectedFinish(format!(
                "{} (safety ratings: {})",
                reason,
                ratings()
            )),
            None => Failure::EmptyContent("candidate has no content parts".to_string()),
        }
        .into();
    };

    let text = clean_fences(text);
    let reason = match finish_reason {
        None => FINISH_STOP,
        Some(r) if is_stop(r) => FINISH_STOP,
        Some(r) => r,
    };

    match (reason, text.is_empty()) {
        (FINISH_STOP, false) => ApiOutcome::Ok(text),
        (FINISH_STOP, true) => ApiOutcome::OkWithWarning {
            text,
            warning: Warning::NoContentOnStop,
        },
        (FINISH_MAX_TOKENS, false) => {
            tracing::warn!("Gemini response cut short by the token limit");
            ApiOutcome::OkWithWarning {
                text,
                warning: Warning::Truncated,
            }
        }
        (FINISH_MAX_TOKENS, true) => {
            Failure::Truncated("finish reason MAX_TOKENS, no partial text".to_string()).into()
        }
        (FINISH_SAFETY, false) => {
            tracing::warn!("Gemini response may be safety filtered ({})", ratings());
            ApiOutcome::OkWithWarning {
                text,
                warning: Warning::SafetyFiltered,
            }
        }
        (FINISH_SAFETY, true) => Failure::SafetyBlocked(ratings()).into(),
        (other, false) => {
            tracing::warn!("Gemini response finished with {}", other);
            ApiOutcome::OkWithWarning {
                text,
                warning: Warning::OtherFinishReason(other.to_string()),
            }
        }
        (other, true) => Failure::OtherFinishReason(other.to_string()).into(),
    }
}

/// Concatenate the text of all parts, in order, trimmed.
///
/// `None` means there was nothing to read at all (no content, or no parts and
/// no direct `text`), which is distinct from parts that carried empty text.
fn extract_text(content: Option<&CandidateContent>) -> Option<String> {
    let content = content?;
    match content.parts.as_deref() {
        Some(parts) if !parts.is_empty() => Some(
            parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
                .trim()
                .to_string(),
        ),
        _ => content
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    }
}

fn is_unspecified(reason: &str) -> bool {
    let upper = reason.to_ascii_uppercase();
    upper == "UNSPECIFIED" || upper.ends_with("_UNSPECIFIED")
}

fn is_stop(reason: &str) -> bool {
    reason == FINISH_STOP || is_unspecified(reason)
}

fn clean_fences(text: String) -> String {
    match strip_code_fence(&text) {
        Some(stripped) => {
            tracing::debug!("Removed markdown code fences from response");
            stripped
        }
        None => text,
    }
}

/// Remove a wrapping markdown code fence.
///
/// Applies only when the text opens with a fence line whose remainder is at
/// most one word (a language tag) and closes with a bare fence line. Returns
/// `None` when the text should be left alone.
pub fn strip_code_fence(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if !trimmed.starts_with(FENCE) || !trimmed.ends_with(FENCE) {
        return None;
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() < 2 {
        return None;
    }

    let tag = lines[0].trim().strip_prefix(FENCE)?.trim();
    if tag.contains(FENCE) || tag.split_whitespace().count() > 1 {
        return None;
    }
    if lines[lines.len() - 1].trim() != FENCE {
        return None;
    }

    Some(lines[1..lines.len() - 1].join("\n").trim().to_string())
}
