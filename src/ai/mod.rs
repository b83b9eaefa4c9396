//! Generative-text integration
//!
//! [`ChatService`] is the seam between the session and a model provider. The
//! Gemini implementation lives in [`gemini`]; [`MockChatClient`] replays
//! canned outcomes for tests.

pub mod gemini;
pub mod mock;
pub mod outcome;

pub use gemini::GeminiChatClient;
pub use mock::MockChatClient;
pub use outcome::{
    ApiOutcome, Failure, FailureKind, RawResponse, TransportError, TransportErrorKind,
    TransportOutcome, Warning,
};

use crate::history::ConversationHistory;
use async_trait::async_trait;

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Run one exchange. Never fails: every problem is an [`ApiOutcome::Failed`].
    async fn generate(
        &self,
        query: &str,
        history: &ConversationHistory,
        modifier: &str,
    ) -> ApiOutcome;
}
