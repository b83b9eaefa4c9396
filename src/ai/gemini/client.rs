use super::types::{ApiErrorEnvelope, RequestPayload};
use crate::ai::outcome::{
    excerpt, RawResponse, TransportError, TransportErrorKind, TransportOutcome,
};
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Timeout for turn-by-turn chat.
pub const INTERACTIVE_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for long generations (files, documents).
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(240);

/// Longest raw-body excerpt carried in an error message.
pub const ERROR_PREVIEW_CHARS: usize = 500;

/// Where the API key goes on the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiKeyPlacement {
    /// `?key=...` URL query parameter.
    #[default]
    QueryParam,
    /// `x-goog-api-key` header.
    Header,
}

/// Lightweight Gemini REST transport. One attempt per call, no retries.
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    key_placement: ApiKeyPlacement,
    timeout: Duration,
}

impl GeminiHttpClient {
    /// Construct a Gemini client.
    ///
    /// `model` should be the bare model ID (for example `gemini-2.0-flash`);
    /// a `models/` prefix is stripped.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, model, timeout, Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        let model = model.strip_prefix("models/").unwrap_or(&model).to_string();

        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            key_placement: ApiKeyPlacement::default(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_key_placement(mut self, placement: ApiKeyPlacement) -> Self {
        self.key_placement = placement;
        self
    }

    /// Returns the configured model ID without the `models/` prefix.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn generate_content_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// POST `payload` to `generateContent`.
    ///
    /// HTTP 4xx/5xx and every network failure come back as a
    /// [`TransportError`]; any other status is handed on as a [`RawResponse`].
    pub async fn send(&self, payload: &RequestPayload) -> TransportOutcome {
        let url = self.generate_content_url();
        tracing::debug!(
            "Sending {} content entries to {} (timeout {:?})",
            payload.contents.len(),
            url,
            self.timeout
        );

        let mut request = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .json(payload);
        request = match self.key_placement {
            ApiKeyPlacement::QueryParam => request.query(&[("key", self.api_key.as_str())]),
            ApiKeyPlacement::Header => request.header("x-goog-api-key", &self.api_key),
        };

        let response = request.send().await.map_err(|e| {
            let err = classify(e);
            tracing::error!("Failed to send request to Gemini: {}", err);
            err
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            let err = classify(e);
            tracing::error!("Failed to read Gemini response body: {}", err);
            err
        })?;

        if (400..=599).contains(&status) {
            let message = error_message_from_body(&body);
            tracing::error!("Gemini API error (status {}): {}", status, message);
            return Err(TransportError::new(
                TransportErrorKind::HttpError(status),
                message,
            ));
        }

        Ok(RawResponse { status, body })
    }
}

/// Map a `reqwest` failure onto the transport taxonomy.
///
/// The URL (which may carry the API key) is stripped before the message is built.
fn classify(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() || err.is_request() {
        TransportErrorKind::ConnectionFailure
    } else {
        TransportErrorKind::UnexpectedFailure
    };

    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    TransportError::new(kind, message)
}

/// Prefer the structured `error.message`; fall back to a capped raw excerpt.
fn error_message_from_body(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| excerpt(body, ERROR_PREVIEW_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::payload;
    use crate::history::ConversationHistory;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "gemini-2.0-flash";
    const GENERATE_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

    fn make_client(server: &MockServer, timeout: Duration) -> GeminiHttpClient {
        GeminiHttpClient::new("test-key".to_string(), MODEL.to_string(), timeout)
            .with_base_url(server.uri())
    }

    fn hello_payload() -> RequestPayload {
        payload::build("Hello", &ConversationHistory::default(), "")
    }

    #[tokio::test]
    async fn test_send_puts_key_in_query_and_returns_raw_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Hello" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"candidates\":[]}"))
            .expect(1)
            .mount(&server)
            .await;

        let raw = make_client(&server, INTERACTIVE_TIMEOUT)
            .send(&hello_payload())
            .await
            .unwrap();

        assert_eq!(raw.status, 200);
        assert_eq!(raw.body, "{\"candidates\":[]}");
    }

    #[tokio::test]
    async fn test_send_can_use_header_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, INTERACTIVE_TIMEOUT)
            .with_key_placement(ApiKeyPlacement::Header);
        assert!(client.send(&hello_payload()).await.is_ok());
    }

    #[tokio::test]
    async fn test_http_error_uses_structured_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let err = make_client(&server, INTERACTIVE_TIMEOUT)
            .send(&hello_payload())
            .await
            .unwrap_err();

        assert_eq!(err.kind, TransportErrorKind::HttpError(400));
        assert_eq!(err.message, "API key not valid.");
    }

    #[tokio::test]
    async fn test_http_error_falls_back_to_truncated_body() {
        let server = MockServer::start().await;
        let long_body = "x".repeat(2000);

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string(long_body))
            .mount(&server)
            .await;

        let err = make_client(&server, INTERACTIVE_TIMEOUT)
            .send(&hello_payload())
            .await
            .unwrap_err();

        assert_eq!(err.kind, TransportErrorKind::HttpError(503));
        assert_eq!(err.message.chars().count(), ERROR_PREVIEW_CHARS + 3);
        assert!(err.message.ends_with("..."));
    }

    #[tokio::test]
    async fn test_timeout_is_classified_within_bound() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let err = make_client(&server, Duration::from_millis(200))
            .send(&hello_payload())
            .await
            .unwrap_err();

        assert_eq!(err.kind, TransportErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = GeminiHttpClient::new(
            "secret-key".to_string(),
            MODEL.to_string(),
            INTERACTIVE_TIMEOUT,
        )
        .with_base_url(uri);
        let err = client.send(&hello_payload()).await.unwrap_err();

        assert_eq!(err.kind, TransportErrorKind::ConnectionFailure);
        assert!(!err.message.contains("secret-key"));
    }

    #[test]
    fn test_models_prefix_is_stripped() {
        let client = GeminiHttpClient::new(
            "k".to_string(),
            "models/gemini-2.5-pro".to_string(),
            GENERATION_TIMEOUT,
        );
        assert_eq!(client.model(), "gemini-2.5-pro");
        assert_eq!(client.timeout(), GENERATION_TIMEOUT);
    }

    #[test]
    fn test_error_message_from_body_ignores_empty_message() {
        let body = r#"{"error": {"message": ""}}"#;
        assert_eq!(error_message_from_body(body), body);
    }
}
