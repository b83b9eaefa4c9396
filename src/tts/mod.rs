//! Text-to-speech for model replies
//!
//! Engines are external programs driven through argument vectors and stdin,
//! never through a shell. A missing engine is reported and speech is skipped;
//! it never stops the session.

pub mod espeak;
pub mod mock;
pub mod piper;

pub use espeak::EspeakTts;
pub use mock::MockTts;
pub use piper::PiperTts;

use crate::models::{Config, TtsEngineKind};
use crate::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::process::ExitStatus;
use std::sync::LazyLock;

#[async_trait]
pub trait TtsService: Send + Sync {
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Speech disabled.
pub struct NoopTts;

#[async_trait]
impl TtsService for NoopTts {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn speak(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Markdown image syntax: `![alt](src)`
static MARKDOWN_IMAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"!\[[^\]]*\]\([^)]*\)"));

/// HTML-like tags
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"<[^<>]*>"));

/// Markup and shell-sensitive punctuation, quotes included
static UNSPEAKABLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r#"[*_`#~\[\](){}"'!$<>|;&]"#));

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\s+"));

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        // Patterns are literals above; a failure here is a programming error.
        Err(err) => panic!("invalid speech-cleaning regex {pattern:?}: {err}"),
    }
}

/// Strip markup, quotes and shell punctuation, then collapse whitespace.
pub fn clean_for_speech(text: &str) -> String {
    let text = MARKDOWN_IMAGE_REGEX.replace_all(text, "");
    let text = TAG_REGEX.replace_all(&text, "");
    let text = UNSPEAKABLE_REGEX.replace_all(&text, "");
    WHITESPACE_REGEX.replace_all(&text, " ").trim().to_string()
}

/// Whether `program` is an existing file path or resolvable on `PATH`.
pub(crate) fn program_exists(program: &Path) -> bool {
    which::which(program).is_ok()
}

pub(crate) fn check_status(program: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(Error::Tts(format!("{} exited with {}", program, status)))
    }
}

pub(crate) fn spawn_error(program: &str, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::Tts(format!("'{}' command not found", program))
    } else {
        Error::Tts(format!("failed to start {}: {}", program, err))
    }
}

/// Pick the engine requested in `config`, degrading when it is unavailable.
///
/// Piper falls back to espeak; an unavailable espeak disables speech.
pub fn build_tts(kind: TtsEngineKind, config: &Config) -> Box<dyn TtsService> {
    let espeak = || EspeakTts::new(config.espeak.clone());

    let engine: Box<dyn TtsService> = match kind {
        TtsEngineKind::None => return Box::new(NoopTts),
        TtsEngineKind::Espeak => Box::new(espeak()),
        TtsEngineKind::Piper => {
            let piper = PiperTts::new(config.piper.clone());
            if piper.is_available() {
                Box::new(piper)
            } else {
                tracing::warn!("Piper TTS is not available; falling back to espeak");
                Box::new(espeak())
            }
        }
    };

    if engine.is_available() {
        tracing::info!("TTS engine: {}", engine.name());
        engine
    } else {
        tracing::warn!("{} TTS is not available; continuing without speech", engine.name());
        Box::new(NoopTts)
    }
}
