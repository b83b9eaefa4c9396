//! Error handling and custom error types
//!
//! Provides unified error handling for configuration, history persistence and
//! speech synthesis. Gemini request failures are not errors here: they are
//! reported as [`crate::ai::ApiOutcome::Failed`] values.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("History error: {0}")]
    History(String),

    #[error("TTS error: {0}")]
    Tts(String),
}

pub type Result<T> = std::result::Result<T, Error>;
