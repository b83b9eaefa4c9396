//! Gemini chat core with spoken replies
//!
//! Builds `generateContent` requests from a query, a rolling conversation
//! history and a modifier, sends them with a bounded timeout, and turns the
//! response into a typed outcome that can be printed, spoken, or kept in the
//! history.

pub mod ai;
pub mod app;
pub mod error;
pub mod history;
pub mod models;
pub mod prompts;
pub mod tts;

pub use error::{Error, Result};
