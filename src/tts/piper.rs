use super::{check_status, clean_for_speech, program_exists, spawn_error, TtsService};
use crate::models::PiperSettings;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};

const PLAYER_PROGRAM: &str = "paplay";
/// Raw PCM format produced by piper voices.
const PLAYER_ARGS: [&str; 4] = ["--raw", "--rate=22050", "--format=s16le", "--channels=1"];

/// `piper --model <voice> --output_file -` piped into `paplay`.
pub struct PiperTts {
    settings: PiperSettings,
}

impl PiperTts {
    pub fn new(settings: PiperSettings) -> Self {
        Self { settings }
    }

    fn voice_model(&self) -> Option<&Path> {
        self.settings
            .voice_model
            .as_deref()
            .filter(|model| model.is_file())
    }
}

#[async_trait]
impl TtsService for PiperTts {
    fn name(&self) -> &str {
        "piper"
    }

    fn is_available(&self) -> bool {
        if !program_exists(&self.settings.executable) {
            tracing::warn!(
                "Piper executable not found at '{}' or in PATH",
                self.settings.executable.display()
            );
            return false;
        }
        if self.voice_model().is_none() {
            tracing::warn!(
                "Piper voice model missing or not set: {:?}",
                self.settings.voice_model
            );
            return false;
        }
        if !program_exists(Path::new(PLAYER_PROGRAM)) {
            tracing::warn!("`{}` not found; piper cannot play audio", PLAYER_PROGRAM);
            return false;
        }
        true
    }

    async fn speak(&self, text: &str) -> Result<()> {
        let cleaned = clean_for_speech(text);
        if cleaned.is_empty() {
            tracing::info!("No text to speak after cleaning");
            return Ok(());
        }

        let model = self
            .voice_model()
            .ok_or_else(|| Error::Tts("piper voice model is not configured".to_string()))?;
        let program = self.settings.executable.display().to_string();

        let mut piper = Command::new(&self.settings.executable)
            .arg("--model")
            .arg(model)
            .args(["--output_file", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&program, e))?;

        let audio: Stdio = piper
            .stdout
            .take()
            .ok_or_else(|| Error::Tts("piper stdout was not captured".to_string()))?
            .try_into()?;

        let mut player = player_command(audio)
            .spawn()
            .map_err(|e| spawn_error(PLAYER_PROGRAM, e))?;

        // Both children are reaped even when feeding piper fails.
        let fed = match piper.stdin.take() {
            Some(mut stdin) => feed(&mut stdin, &cleaned).await,
            None => Ok(()),
        };

        let piper_status = piper.wait().await?;
        let player_status = player.wait().await?;
        fed?;
        check_status(&program, piper_status)?;
        check_status(PLAYER_PROGRAM, player_status)
    }
}

fn player_command(audio: Stdio) -> Command {
    let mut command = Command::new(PLAYER_PROGRAM);
    command
        .args(PLAYER_ARGS)
        .stdin(audio)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    command
}

async fn feed(stdin: &mut ChildStdin, text: &str) -> std::io::Result<()> {
    stdin.write_all(text.as_bytes()).await?;
    stdin.write_all(b"\n").await
}
