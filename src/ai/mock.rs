use super::{ApiOutcome, ChatService};
use crate::history::ConversationHistory;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// What a [`MockChatClient`] was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub query: String,
    pub history_len: usize,
    pub modifier: String,
}

pub struct MockChatClient {
    responses: Arc<Mutex<Vec<ApiOutcome>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: ApiOutcome) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_text_response(self, text: &str) -> Self {
        self.with_response(ApiOutcome::Ok(text.to_string()))
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatClient {
    async fn generate(
        &self,
        query: &str,
        history: &ConversationHistory,
        modifier: &str,
    ) -> ApiOutcome {
        let mut calls = self.calls.lock().unwrap();
        calls.push(RecordedCall {
            query: query.to_string(),
            history_len: history.len(),
            modifier: modifier.to_string(),
        });

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            ApiOutcome::Ok(format!("Echo: {}", query))
        } else {
            let index = (calls.len() - 1) % responses.len();
            responses[index].clone()
        }
    }
}
