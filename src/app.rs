//! Session orchestration: one exchange per user turn.
//!
//! Failed exchanges never enter the history. Replies with a warning are kept
//! when they carry text but are not spoken.

use crate::ai::{ApiOutcome, ChatService, GeminiChatClient};
use crate::history::{ConversationHistory, ConversationTurn};
use crate::models::Config;
use crate::tts::{build_tts, TtsService};
use std::path::PathBuf;
use tracing::{info, warn};

/// What a line of user input resulted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Ignored,
    Exit,
    Cleared,
    Saved(PathBuf),
    Loaded(usize),
    Usage(&'static str),
    Error(String),
    Reply(ApiOutcome),
}

/// Injectable service bundle used to construct [`ChatSession`] in tests/harnesses.
pub struct SessionServices {
    pub chat: Box<dyn ChatService>,
    pub tts: Box<dyn TtsService>,
}

pub struct ChatSession {
    chat: Box<dyn ChatService>,
    tts: Box<dyn TtsService>,
    history: ConversationHistory,
    modifier: String,
}

impl ChatSession {
    pub fn with_services(
        services: SessionServices,
        history: ConversationHistory,
        modifier: String,
    ) -> Self {
        Self {
            chat: services.chat,
            tts: services.tts,
            history,
            modifier,
        }
    }

    /// Wire the Gemini client and the requested TTS engine from `config`.
    pub fn from_config(config: &Config, modifier: String) -> Self {
        Self::with_services(
            SessionServices {
                chat: Box::new(GeminiChatClient::from_config(config)),
                tts: build_tts(config.tts_engine, config),
            },
            ConversationHistory::new(config.history_cap),
            modifier,
        )
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn tts_name(&self) -> &str {
        self.tts.name()
    }

    /// Send one query. Blank input is not sent and yields `None`.
    pub async fn exchange(&mut self, query: &str) -> Option<ApiOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let outcome = self.chat.generate(query, &self.history, &self.modifier).await;

        match &outcome {
            ApiOutcome::Ok(text) => {
                self.record(query, text);
                self.speak(text).await;
            }
            ApiOutcome::OkWithWarning { text, warning } => {
                self.record(query, text);
                info!("TTS skipped for warning: {}", warning);
            }
            ApiOutcome::Failed(failure) => {
                info!("TTS skipped due to {:?} failure", failure.kind());
            }
        }

        Some(outcome)
    }

    /// Only turns with text on both sides enter the history.
    fn record(&mut self, query: &str, response: &str) {
        let turn = ConversationTurn::new(query, response);
        if turn.is_well_formed() {
            self.history.push(turn);
        } else {
            warn!("Reply has no text; not adding it to history");
        }
    }

    async fn speak(&self, text: &str) {
        if let Err(e) = self.tts.speak(text).await {
            warn!("TTS failed with {}: {}", self.tts.name(), e);
        }
    }

    /// Interpret one line of input: a command or a query.
    pub async fn handle_line(&mut self, line: &str) -> SessionEvent {
        let line = line.trim();
        if line.is_empty() {
            return SessionEvent::Ignored;
        }

        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };

        match command.to_ascii_lowercase().as_str() {
            "exit" | "quit" if argument.is_empty() => SessionEvent::Exit,
            "/clear" => {
                self.history.clear();
                info!("History cleared");
                SessionEvent::Cleared
            }
            "/save" if argument.is_empty() => SessionEvent::Usage("Usage: /save <filename.json>"),
            "/save" => {
                let path = PathBuf::from(argument);
                match self.history.save(&path) {
                    Ok(()) => SessionEvent::Saved(path),
                    Err(e) => SessionEvent::Error(format!("Error saving history: {}", e)),
                }
            }
            "/load" if argument.is_empty() => SessionEvent::Usage("Usage: /load <filename.json>"),
            "/load" => match self.history.replace_from_file(&PathBuf::from(argument)) {
                Ok(restored) => SessionEvent::Loaded(restored),
                Err(e) => SessionEvent::Error(format!("Error loading history: {}", e)),
            },
            _ => match self.exchange(line).await {
                Some(outcome) => SessionEvent::Reply(outcome),
                None => SessionEvent::Ignored,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Failure, MockChatClient, Warning};
    use crate::tts::MockTts;
    use pretty_assertions::assert_eq;

    fn session(chat: MockChatClient, tts: MockTts, cap: usize) -> ChatSession {
        ChatSession::with_services(
            SessionServices {
                chat: Box::new(chat),
                tts: Box::new(tts),
            },
            ConversationHistory::new(cap),
            "Be terse.".to_string(),
        )
    }

    #[tokio::test]
    async fn test_ok_reply_is_recorded_and_spoken() {
        let tts = MockTts::new();
        let spoken = tts.spoken_handle();
        let mut session = session(MockChatClient::new().with_text_response("Hi."), tts, 10);

        let outcome = session.exchange("  Hello ").await;

        assert_eq!(outcome, Some(ApiOutcome::Ok("Hi.".to_string())));
        assert_eq!(
            session.history().turns(),
            vec![ConversationTurn::new("Hello", "Hi.")]
        );
        assert_eq!(*spoken.lock().unwrap(), vec!["Hi.".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_reply_is_not_recorded_or_spoken() {
        let tts = MockTts::new();
        let spoken = tts.spoken_handle();
        let chat = MockChatClient::new()
            .with_response(ApiOutcome::Failed(Failure::Blocked("SAFETY".to_string())));
        let mut session = session(chat, tts, 10);

        let outcome = session.exchange("Hello").await.unwrap();

        assert!(outcome.is_failed());
        assert!(session.history().is_empty());
        assert!(spoken.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_warning_reply_is_recorded_but_not_spoken() {
        let tts = MockTts::new();
        let spoken = tts.spoken_handle();
        let chat = MockChatClient::new().with_response(ApiOutcome::OkWithWarning {
            text: "partial".to_string(),
            warning: Warning::Truncated,
        });
        let mut session = session(chat, tts, 10);

        session.exchange("Hello").await;

        assert_eq!(session.history().len(), 1);
        assert!(spoken.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_warning_reply_is_not_recorded() {
        let chat = MockChatClient::new().with_response(ApiOutcome::OkWithWarning {
            text: String::new(),
            warning: Warning::NoContentOnStop,
        });
        let mut session = session(chat, MockTts::new(), 10);

        session.exchange("Hello").await;
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_blank_ok_reply_is_not_recorded() {
        let chat = MockChatClient::new().with_response(ApiOutcome::Ok("  ".to_string()));
        let mut session = session(chat, MockTts::new(), 10);

        session.exchange("Hello").await;
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_is_not_sent() {
        let chat = MockChatClient::new();
        let mut session = ChatSession::with_services(
            SessionServices {
                chat: Box::new(chat),
                tts: Box::new(MockTts::new()),
            },
            ConversationHistory::new(10),
            String::new(),
        );

        assert_eq!(session.exchange("   ").await, None);
        assert_eq!(session.handle_line("").await, SessionEvent::Ignored);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_tts_failure_does_not_abort_exchange() {
        let mut session = session(
            MockChatClient::new().with_text_response("Hi."),
            MockTts::new().failing(),
            10,
        );

        let outcome = session.exchange("Hello").await;
        assert_eq!(outcome, Some(ApiOutcome::Ok("Hi.".to_string())));
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_history_respects_cap_across_exchanges() {
        let mut session = session(MockChatClient::new(), MockTts::new(), 2);

        for query in ["one", "two", "three"] {
            session.exchange(query).await;
        }

        let queries: Vec<String> = session.history().iter().map(|t| t.query.clone()).collect();
        assert_eq!(queries, vec!["two".to_string(), "three".to_string()]);
    }

    #[tokio::test]
    async fn test_commands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut session = session(MockChatClient::new(), MockTts::new(), 10);

        assert!(matches!(
            session.handle_line("Hello").await,
            SessionEvent::Reply(ApiOutcome::Ok(_))
        ));

        let save = format!("/save {}", path.display());
        assert_eq!(session.handle_line(&save).await, SessionEvent::Saved(path.clone()));

        assert_eq!(session.handle_line("/CLEAR").await, SessionEvent::Cleared);
        assert!(session.history().is_empty());

        let load = format!("/load {}", path.display());
        assert_eq!(session.handle_line(&load).await, SessionEvent::Loaded(1));
        assert_eq!(session.history().len(), 1);

        assert!(matches!(session.handle_line("/save").await, SessionEvent::Usage(_)));
        assert!(matches!(
            session.handle_line("/load /nonexistent/history.json").await,
            SessionEvent::Error(_)
        ));
        assert_eq!(session.history().len(), 1);

        assert_eq!(session.handle_line("exit").await, SessionEvent::Exit);
    }

    #[tokio::test]
    async fn test_exit_with_text_is_a_query() {
        let mut session = session(MockChatClient::new(), MockTts::new(), 10);
        assert!(matches!(
            session.handle_line("exit strategies for startups").await,
            SessionEvent::Reply(_)
        ));
    }
}
