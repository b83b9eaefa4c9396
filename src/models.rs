//! Runtime configuration
//!
//! Everything is read once at startup from the environment (optionally seeded
//! from a `.env` file) and then passed explicitly to the components that need it.

use crate::ai::gemini::client::{
    ApiKeyPlacement, DEFAULT_BASE_URL, GENERATION_TIMEOUT, INTERACTIVE_TIMEOUT,
};
use crate::ai::gemini::GenerationConfig;
use crate::history::DEFAULT_HISTORY_CAP;
use crate::{Error, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TtsEngineKind {
    Espeak,
    Piper,
    None,
}

impl TtsEngineKind {
    pub fn parse(value: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(value.trim(), true).map_err(|_| {
            Error::Config(format!(
                "Unknown TTS engine '{}'. Expected espeak, piper or none",
                value
            ))
        })
    }
}

/// Sampling limits and timeout chosen together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GenerationProfile {
    /// Short replies for spoken chat.
    #[default]
    Interactive,
    /// Long answers such as code or documents.
    Long,
}

impl GenerationProfile {
    pub fn parse(value: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(value.trim(), true).map_err(|_| {
            Error::Config(format!(
                "Unknown GEMINI_PROFILE '{}'. Expected interactive or long",
                value
            ))
        })
    }

    pub fn timeout(self) -> Duration {
        match self {
            Self::Interactive => INTERACTIVE_TIMEOUT,
            Self::Long => GENERATION_TIMEOUT,
        }
    }

    pub fn generation_config(self) -> GenerationConfig {
        match self {
            Self::Interactive => GenerationConfig::interactive(),
            Self::Long => GenerationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EspeakSettings {
    pub voice: String,
    pub speed: u32,
    pub pitch: u32,
}

impl Default for EspeakSettings {
    fn default() -> Self {
        Self {
            voice: "en-gb".to_string(),
            speed: 160,
            pitch: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PiperSettings {
    pub executable: PathBuf,
    pub voice_model: Option<PathBuf>,
}

impl Default for PiperSettings {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("piper-tts"),
            voice_model: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub api_key_placement: ApiKeyPlacement,
    pub generation_profile: GenerationProfile,
    /// Explicit timeout; the profile's timeout applies when unset.
    pub timeout_override: Option<Duration>,
    pub history_cap: usize,
    pub tts_engine: TtsEngineKind,
    pub espeak: EspeakSettings,
    pub piper: PiperSettings,
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout_override
            .unwrap_or_else(|| self.generation_profile.timeout())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// Only `GEMINI_API_KEY` is required. Numeric values that fail to parse
    /// fall back to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = var("GEMINI_API_KEY")
            .ok_or_else(|| Error::Config("GEMINI_API_KEY not set".to_string()))?;

        let api_key_placement = match var("GEMINI_API_KEY_PLACEMENT").as_deref() {
            None | Some("query") => ApiKeyPlacement::QueryParam,
            Some("header") => ApiKeyPlacement::Header,
            Some(other) => {
                return Err(Error::Config(format!(
                    "Unknown GEMINI_API_KEY_PLACEMENT '{}'. Expected query or header",
                    other
                )))
            }
        };

        let generation_profile = match var("GEMINI_PROFILE") {
            Some(value) => GenerationProfile::parse(&value)?,
            None => GenerationProfile::default(),
        };

        let timeout_override = parse_number::<u64>(&var, "GEMINI_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let tts_engine = match var("TTS_ENGINE") {
            Some(value) => TtsEngineKind::parse(&value)?,
            None => TtsEngineKind::Espeak,
        };

        let espeak_defaults = EspeakSettings::default();
        let espeak = EspeakSettings {
            voice: var("ESPEAK_VOICE").unwrap_or(espeak_defaults.voice),
            speed: parse_number(&var, "ESPEAK_SPEED").unwrap_or(espeak_defaults.speed),
            pitch: parse_number(&var, "ESPEAK_PITCH").unwrap_or(espeak_defaults.pitch),
        };

        let piper = PiperSettings {
            executable: var("PIPER_EXECUTABLE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PiperSettings::default().executable),
            voice_model: var("PIPER_VOICE_MODEL_PATH").map(PathBuf::from),
        };

        Ok(Self {
            gemini_api_key,
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: var("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key_placement,
            generation_profile,
            timeout_override,
            history_cap: parse_number(&var, "HISTORY_CAP").unwrap_or(DEFAULT_HISTORY_CAP),
            tts_engine,
            espeak,
            piper,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}='{}', using default", key, raw);
            None
        }
    }
}
