use super::TtsService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Records what would have been spoken.
pub struct MockTts {
    spoken: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl MockTts {
    pub fn new() -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// Make every `speak` call fail, as a crashed engine would.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Shared view of the spoken texts; stays valid after the mock is boxed.
    pub fn spoken_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.spoken)
    }
}

impl Default for MockTts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsService for MockTts {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn speak(&self, text: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Tts("mock engine failure".to_string()));
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
