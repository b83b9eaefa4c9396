use super::{check_status, clean_for_speech, program_exists, spawn_error, TtsService};
use crate::models::EspeakSettings;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const ESPEAK_PROGRAM: &str = "espeak-ng";

pub struct EspeakTts {
    settings: EspeakSettings,
}

impl EspeakTts {
    pub fn new(settings: EspeakSettings) -> Self {
        Self { settings }
    }

    /// Arguments for `espeak-ng`. Text is fed on stdin so it can never be
    /// mistaken for an option.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-v".to_string(),
            self.settings.voice.clone(),
            "-s".to_string(),
            self.settings.speed.to_string(),
            "-p".to_string(),
            self.settings.pitch.to_string(),
            "--stdin".to_string(),
        ]
    }
}

#[async_trait]
impl TtsService for EspeakTts {
    fn name(&self) -> &str {
        ESPEAK_PROGRAM
    }

    fn is_available(&self) -> bool {
        program_exists(Path::new(ESPEAK_PROGRAM))
    }

    async fn speak(&self, text: &str) -> Result<()> {
        let cleaned = clean_for_speech(text);
        if cleaned.is_empty() {
            tracing::info!("No text to speak after cleaning");
            return Ok(());
        }

        let mut child = Command::new(ESPEAK_PROGRAM)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_error(ESPEAK_PROGRAM, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(cleaned.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
        }

        let status = child.wait().await?;
        check_status(ESPEAK_PROGRAM, status)
    }
}
