//! Typed results of one Gemini exchange.
//!
//! Transport failures and every anticipated malformed response shape are
//! values here, never panics or `Err`s of the crate-level [`crate::Error`].

use std::fmt;
use thiserror::Error;

/// Network/HTTP-layer failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    ConnectionFailure,
    HttpError(u16),
    UnexpectedFailure,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectionFailure => write!(f, "connection failure"),
            Self::HttpError(status) => write!(f, "HTTP {}", status),
            Self::UnexpectedFailure => write!(f, "unexpected failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Undecoded response body and status, as handed from transport to parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

pub type TransportOutcome = std::result::Result<RawResponse, TransportError>;

/// Why otherwise usable text deserves a caveat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    NoContentOnStop,
    Truncated,
    SafetyFiltered,
    OtherFinishReason(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContentOnStop => write!(f, "model stopped without returning content"),
            Self::Truncated => write!(f, "output hit the token limit and may be incomplete"),
            Self::SafetyFiltered => write!(f, "output may be filtered by safety settings"),
            Self::OtherFinishReason(reason) => {
                write!(f, "unexpected finish reason {}; output may be incomplete", reason)
            }
        }
    }
}

/// Fieldless discriminant of [`Failure`], for branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Decode,
    ApiError,
    Blocked,
    NoCandidates,
    EmptyContent,
    UnexpectedFinish,
    Truncated,
    SafetyBlocked,
    OtherFinishReason,
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("could not decode API response: {0}")]
    Decode(String),

    #[error("API error (code {}): {message}", display_code(.code))]
    ApiError { message: String, code: Option<i64> },

    #[error("prompt blocked: {0}")]
    Blocked(String),

    #[error("no candidates in response: {0}")]
    NoCandidates(String),

    #[error("candidate has no content: {0}")]
    EmptyContent(String),

    #[error("candidate finished unexpectedly: {0}")]
    UnexpectedFinish(String),

    #[error("token limit reached before any text was produced: {0}")]
    Truncated(String),

    #[error("candidate blocked by safety filter: {0}")]
    SafetyBlocked(String),

    #[error("candidate finished with {0} and no text")]
    OtherFinishReason(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Decode(_) => FailureKind::Decode,
            Self::ApiError { .. } => FailureKind::ApiError,
            Self::Blocked(_) => FailureKind::Blocked,
            Self::NoCandidates(_) => FailureKind::NoCandidates,
            Self::EmptyContent(_) => FailureKind::EmptyContent,
            Self::UnexpectedFinish(_) => FailureKind::UnexpectedFinish,
            Self::Truncated(_) => FailureKind::Truncated,
            Self::SafetyBlocked(_) => FailureKind::SafetyBlocked,
            Self::OtherFinishReason(_) => FailureKind::OtherFinishReason,
            Self::Transport(_) => FailureKind::Transport,
        }
    }
}

/// The single result type of a Gemini exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome {
    Ok(String),
    OkWithWarning { text: String, warning: Warning },
    Failed(Failure),
}

impl ApiOutcome {
    /// Text usable by the caller, if any was produced.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Ok(text) | Self::OkWithWarning { text, .. } => Some(text),
            Self::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed(failure) => Some(failure.kind()),
            _ => None,
        }
    }
}

impl From<Failure> for ApiOutcome {
    fn from(failure: Failure) -> Self {
        Self::Failed(failure)
    }
}

fn display_code(code: &Option<i64>) -> String {
    code.map_or_else(|| "n/a".to_string(), |c| c.to_string())
}

/// Cap `text` at `max_chars` characters, marking the cut with `...`.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
