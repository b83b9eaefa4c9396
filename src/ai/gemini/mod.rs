pub mod chat;
pub mod client;
pub mod parser;
pub mod payload;
pub mod types;

pub use chat::GeminiChatClient;
pub use client::{ApiKeyPlacement, GeminiHttpClient};
pub use types::{GenerationConfig, RequestPayload};
