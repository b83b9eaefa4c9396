use anyhow::Result;
use clap::Parser;
use gemini_speak::ai::ApiOutcome;
use gemini_speak::app::{ChatSession, SessionEvent};
use gemini_speak::models::{Config, GenerationProfile, TtsEngineKind};
use gemini_speak::prompts::ModifierPreset;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "gemini-speak")]
#[command(about = "Chat with Gemini from the terminal and hear the replies")]
struct CliArgs {
    /// Speech engine; overrides TTS_ENGINE.
    #[arg(long, value_enum)]
    tts: Option<TtsEngineKind>,

    /// Model name; overrides GEMINI_MODEL.
    #[arg(long)]
    model: Option<String>,

    /// Reply length and timeout preset; overrides GEMINI_PROFILE.
    #[arg(long, value_enum)]
    profile: Option<GenerationProfile>,

    /// Per-request timeout in seconds; overrides GEMINI_TIMEOUT_SECS.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    /// Number of exchanges kept as context; overrides HISTORY_CAP.
    #[arg(long)]
    history_cap: Option<usize>,

    /// Built-in instruction prepended to every query.
    #[arg(long, value_enum, default_value_t = ModifierPreset::Logic)]
    preset: ModifierPreset,

    /// Custom instruction; takes precedence over --preset.
    #[arg(long)]
    modifier: Option<String>,

    /// History file to restore before the first prompt.
    #[arg(long, value_name = "FILE")]
    load: Option<PathBuf>,
}

impl CliArgs {
    fn modifier(&self) -> String {
        match &self.modifier {
            Some(text) => text.trim().to_string(),
            None => self.preset.text().to_string(),
        }
    }

    fn apply(&self, config: &mut Config) {
        if let Some(tts) = self.tts {
            config.tts_engine = tts;
        }
        if let Some(model) = &self.model {
            config.gemini_model = model.clone();
        }
        if let Some(profile) = self.profile {
            config.generation_profile = profile;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_override = Some(Duration::from_secs(secs));
        }
        if let Some(cap) = self.history_cap {
            config.history_cap = cap;
        }
    }
}

fn render_outcome(outcome: &ApiOutcome) -> String {
    match outcome {
        ApiOutcome::Ok(text) => format!("Gemini: {}", text),
        ApiOutcome::OkWithWarning { text, warning } if text.is_empty() => {
            format!("Gemini: [{}]", warning)
        }
        ApiOutcome::OkWithWarning { text, warning } => {
            format!("Gemini: {}\n[{}]", text, warning)
        }
        ApiOutcome::Failed(failure) => format!("Error: {}", failure),
    }
}

fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Ignored | SessionEvent::Exit => None,
        SessionEvent::Cleared => Some("History cleared.".to_string()),
        SessionEvent::Saved(path) => Some(format!("History saved to {}", path.display())),
        SessionEvent::Loaded(count) => Some(format!("Loaded {} exchanges.", count)),
        SessionEvent::Usage(usage) => Some(usage.to_string()),
        SessionEvent::Error(message) => Some(message.clone()),
        SessionEvent::Reply(outcome) => Some(render_outcome(outcome)),
    }
}

async fn run(mut session: ChatSession) -> Result<()> {
    println!("Type a question, /save <file>, /load <file>, /clear, or exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        let event = session.handle_line(&line).await;
        if event == SessionEvent::Exit {
            break;
        }
        if let Some(text) = render_event(&event) {
            println!("{}", text);
        }
    }

    info!("Session ended with {} exchanges in history", session.history().len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_speak=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    args.apply(&mut config);

    info!(
        "Starting gemini-speak with model {} ({:?} profile, timeout {:?})",
        config.gemini_model,
        config.generation_profile,
        config.request_timeout()
    );

    let mut session = ChatSession::from_config(&config, args.modifier());
    info!("Speech engine: {}", session.tts_name());

    if let Some(path) = &args.load {
        let event = session.handle_line(&format!("/load {}", path.display())).await;
        if let Some(text) = render_event(&event) {
            println!("{}", text);
        }
    }

    if let Err(e) = run(session).await {
        error!("Session failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
