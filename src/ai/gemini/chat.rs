use super::client::{ApiKeyPlacement, GeminiHttpClient, INTERACTIVE_TIMEOUT};
use super::types::GenerationConfig;
use super::{parser, payload};
use crate::ai::{ApiOutcome, ChatService};
use crate::history::ConversationHistory;
use crate::models::Config;
use async_trait::async_trait;
use std::time::Duration;

/// Gemini chat: payload builder, transport and parser behind [`ChatService`].
pub struct GeminiChatClient {
    http: GeminiHttpClient,
    generation_config: Option<GenerationConfig>,
}

impl GeminiChatClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, INTERACTIVE_TIMEOUT, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, model, timeout, client),
            generation_config: Some(GenerationConfig::interactive()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        tracing::info!(
            "Chat provider: Gemini (model: {}, timeout: {:?})",
            config.gemini_model,
            config.request_timeout()
        );
        Self::new_with_client(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.request_timeout(),
            reqwest::Client::new(),
        )
        .with_base_url(config.gemini_base_url.clone())
        .with_key_placement(config.api_key_placement)
        .with_generation_config(Some(config.generation_profile.generation_config()))
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    pub fn with_key_placement(mut self, placement: ApiKeyPlacement) -> Self {
        self.http = self.http.with_key_placement(placement);
        self
    }

    /// Replace the sampling knobs; `None` sends no `generationConfig` at all.
    pub fn with_generation_config(mut self, config: Option<GenerationConfig>) -> Self {
        self.generation_config = config;
        self
    }

    pub fn model(&self) -> &str {
        self.http.model()
    }
}

#[async_trait]
impl ChatService for GeminiChatClient {
    async fn generate(
        &self,
        query: &str,
        history: &ConversationHistory,
        modifier: &str,
    ) -> ApiOutcome {
        let mut request = payload::build(query, history, modifier);
        if let Some(config) = &self.generation_config {
            request = request.with_generation_config(config.clone());
        }

        let outcome = parser::parse(self.http.send(&request).await);
        match &outcome {
            ApiOutcome::Ok(text) => {
                tracing::info!("Gemini replied with {} chars", text.len())
            }
            ApiOutcome::OkWithWarning { text, warning } => {
                tracing::warn!("Gemini replied with {} chars: {}", text.len(), warning)
            }
            ApiOutcome::Failed(failure) => {
                tracing::error!("Gemini exchange failed ({:?}): {}", failure.kind(), failure)
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::payload::MODIFIER_SEPARATOR;
    use crate::ai::{FailureKind, Warning};
    use crate::history::ConversationTurn;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-2.0-flash";
    const GENERATE_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

    fn make_client(server: &MockServer) -> GeminiChatClient {
        GeminiChatClient::new("test-key".to_string(), DEFAULT_MODEL.to_string())
            .with_base_url(server.uri())
    }

    fn reply(text: &str, finish_reason: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": finish_reason
            }]
        }))
    }

    #[tokio::test]
    async fn test_terse_hello_round_trip() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": format!("Be terse.{}Hello", MODIFIER_SEPARATOR) }]
                }],
                "generationConfig": { "maxOutputTokens": 2048 }
            })))
            .respond_with(reply("Hi.", "STOP"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = make_client(&server)
            .generate("Hello", &ConversationHistory::default(), "Be terse.")
            .await;

        assert_eq!(outcome, ApiOutcome::Ok("Hi.".to_string()));
    }

    #[tokio::test]
    async fn test_history_is_sent_as_role_turns() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_partial_json(serde_json::json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "What is 2+2?" }] },
                    { "role": "model", "parts": [{ "text": "4" }] },
                    { "role": "user", "parts": [{ "text": "Double it" }] }
                ]
            })))
            .respond_with(reply("8", "STOP"))
            .expect(1)
            .mount(&server)
            .await;

        let mut history = ConversationHistory::new(10);
        history.push(ConversationTurn::new("What is 2+2?", "4"));

        let outcome = make_client(&server).generate("Double it", &history, "").await;
        assert_eq!(outcome, ApiOutcome::Ok("8".to_string()));
    }

    #[tokio::test]
    async fn test_generation_config_can_be_disabled() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(reply("ok", "STOP"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = make_client(&server)
            .with_generation_config(None)
            .generate("q", &ConversationHistory::default(), "")
            .await;
        assert_eq!(outcome, ApiOutcome::Ok("ok".to_string()));

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn test_truncated_reply_is_a_warning() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(reply("partial", "MAX_TOKENS"))
            .mount(&server)
            .await;

        let outcome = make_client(&server)
            .generate("q", &ConversationHistory::default(), "")
            .await;
        assert_eq!(
            outcome,
            ApiOutcome::OkWithWarning {
                text: "partial".to_string(),
                warning: Warning::Truncated,
            }
        );
    }

    #[tokio::test]
    async fn test_http_error_is_transport_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let outcome = make_client(&server)
            .generate("q", &ConversationHistory::default(), "")
            .await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Transport));
    }

    #[tokio::test]
    async fn test_strips_models_prefix_from_model_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(reply("Four.", "STOP"))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiChatClient::new(
            "test-key".to_string(),
            "models/gemini-2.0-flash".to_string(),
        )
        .with_base_url(server.uri());
        assert_eq!(client.model(), DEFAULT_MODEL);

        let outcome = client
            .generate("What is 2+2?", &ConversationHistory::default(), "")
            .await;
        assert_eq!(outcome, ApiOutcome::Ok("Four.".to_string()));
    }

    #[tokio::test]
    async fn test_long_profile_sends_full_token_budget() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": { "maxOutputTokens": 8192 }
            })))
            .respond_with(reply("fn main() {}", "STOP"))
            .expect(1)
            .mount(&server)
            .await;

        let env = std::collections::HashMap::from([
            ("GEMINI_API_KEY", "test-key".to_string()),
            ("GEMINI_BASE_URL", server.uri()),
            ("GEMINI_PROFILE", "long".to_string()),
        ]);
        let config = Config::from_lookup(|key| env.get(key).cloned()).unwrap();

        let outcome = GeminiChatClient::from_config(&config)
            .generate("Write a Rust hello world", &ConversationHistory::default(), "")
            .await;
        assert_eq!(outcome, ApiOutcome::Ok("fn main() {}".to_string()));
    }
}
