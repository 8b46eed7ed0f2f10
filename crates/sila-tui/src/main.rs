use anyhow::{Context, Result};
use clap::Parser;
use sila_core::{
    CommandSpeechEngine, Config, GeminiClient, Language, Session, SilentSpeechEngine,
    SpeechEngine, VoiceSettings,
};
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{AppEvent, EventHandler};

#[derive(Parser)]
#[command(name = "sila")]
#[command(about = "Chat with Gemini in the terminal and listen to the replies")]
struct Cli {
    /// Gemini model to use
    #[arg(short, long)]
    model: Option<String>,
    /// Interface language (ar or en)
    #[arg(short, long)]
    language: Option<Language>,
    /// Disable spoken replies
    #[arg(long)]
    no_speech: bool,
}

fn log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sila")
        .join("sila.log")
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging() -> Result<PathBuf> {
    let path = log_path();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_file = init_logging()?;

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(language) = cli.language {
        config.language = language;
    }
    if cli.no_speech {
        config.speech_enabled = false;
    }

    let generator = GeminiClient::new(config.api_key.clone())
        .with_model(config.model.clone())
        .with_base_url(config.base_url.clone());

    tracing::info!(
        model = generator.model(),
        language = ?config.language,
        speech = config.speech_enabled,
        log = %log_file.display(),
        "sila starting"
    );
    if !config.has_api_key() {
        tracing::warn!("No Gemini API key configured; replies will report a configuration error");
    }

    let engine: Box<dyn SpeechEngine> = if config.speech_enabled {
        Box::new(CommandSpeechEngine::new(
            config.speech.program.clone(),
            config.speech.args.clone(),
        ))
    } else {
        Box::new(SilentSpeechEngine)
    };

    let (session_tx, session_rx) = mpsc::unbounded_channel();
    let session = Session::new(
        Arc::new(generator),
        engine,
        VoiceSettings::from(&config.speech),
        config.language,
        session_tx,
    );
    let mut app = App::new(session, config.language, config.model, Instant::now());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(session_rx);

    let result = run(&mut terminal, &mut app, &mut events).await;

    app.shutdown();
    tui::restore()?;
    tracing::info!("sila exiting");

    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    terminal.draw(|frame| ui::render(app, frame))?;
    let mut was_busy = true;

    while !app.should_quit {
        let Some(event) = events.next().await else {
            break;
        };
        // Idle ticks don't change anything on screen. One more frame after
        // the last busy one lands transitions on their end values.
        let busy = app.needs_frame(Instant::now());
        let redraw = !matches!(event, AppEvent::Tick) || busy || was_busy;
        was_busy = busy;
        handler::handle_event(app, event)?;

        if redraw {
            terminal.draw(|frame| ui::render(app, frame))?;
        }
    }
    Ok(())
}
