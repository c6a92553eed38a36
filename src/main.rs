use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use secrecy::SecretString;

use charisma_dialogue::emotion::KeywordEmotionTagger;
use charisma_dialogue::generate::{LlmConfig, LlmGenerator, TemplateGenerator};
use charisma_relay::RoomRegistry;
use charisma_server::{AppState, ServerConfig};
use charisma_session::{SessionSupervisor, SupervisorConfig};
use charisma_speech::{HttpSynthesizer, TextOnlySynthesizer, TtsConfig};
use charisma_store::{Database, SnapshotRepo};

use charisma_core::collab::{SpeechSynthesizer, TextGenerator};

#[derive(Parser)]
#[command(name = "charisma", about = "Speaker-listener conversation practice server")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Path to the snapshot database. Defaults to ~/.charisma/charisma.db.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Relay queue capacity per peer.
    #[arg(long, default_value_t = 256)]
    queue_capacity: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("starting charisma server");

    let db_path = cli
        .db
        .unwrap_or_else(|| dirs_home().join(".charisma").join("charisma.db"));
    let db = Database::open(&db_path)?;
    let snapshots = SnapshotRepo::new(db);

    let generator: Arc<dyn TextGenerator> = match std::env::var("CHARISMA_LLM_API_KEY") {
        Ok(key) if !key.is_empty() => {
            let base_url = std::env::var("CHARISMA_LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
            let model = std::env::var("CHARISMA_LLM_MODEL")
                .unwrap_or_else(|_| "gpt-4-turbo-preview".to_string());
            tracing::info!(model = %model, "using LLM generation backend");
            Arc::new(LlmGenerator::new(LlmConfig::new(
                base_url,
                model,
                SecretString::from(key),
            )))
        }
        _ => {
            tracing::info!("no LLM backend configured, using template generation");
            Arc::new(TemplateGenerator)
        }
    };

    let synthesizer: Arc<dyn SpeechSynthesizer> = match std::env::var("CHARISMA_TTS_API_KEY") {
        Ok(key) if !key.is_empty() => {
            let base_url = std::env::var("CHARISMA_TTS_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
            let model =
                std::env::var("CHARISMA_TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());
            let voice =
                std::env::var("CHARISMA_TTS_VOICE").unwrap_or_else(|_| "nova".to_string());
            tracing::info!(model = %model, voice = %voice, "using HTTP synthesis backend");
            Arc::new(HttpSynthesizer::new(TtsConfig {
                base_url,
                model,
                voice,
                api_key: SecretString::from(key),
            }))
        }
        _ => {
            tracing::info!("no TTS backend configured, sessions run text-only");
            Arc::new(TextOnlySynthesizer)
        }
    };

    let relay = Arc::new(RoomRegistry::new(cli.queue_capacity));
    let supervisor = Arc::new(SessionSupervisor::new(
        Arc::clone(&relay),
        Some(snapshots),
        generator,
        Arc::new(KeywordEmotionTagger),
        synthesizer,
        SupervisorConfig::default(),
    ));
    let _reaper = supervisor.start_reaper();

    let state = AppState {
        supervisor,
        relay,
    };
    let handle = charisma_server::start(ServerConfig { port: cli.port }, state).await?;
    tracing::info!(port = handle.port, "charisma server ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
