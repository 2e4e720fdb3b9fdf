use anyhow::{Context, Result};
use clap::Parser;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use wake_command::http::record_command;
use wake_command::{create_router, AppState, Config, LogLevel, NatsEngineFactory, SessionCallbacks};

/// Listen for a wake word on a NATS speech-recognition stream and extract commands
#[derive(Debug, Parser)]
#[command(name = "wake-command", version)]
struct Args {
    /// Config file path (without extension)
    #[arg(short, long, default_value = "config/wake-command")]
    config: String,

    /// Override the configured wake word
    #[arg(long)]
    wake_word: Option<String>,

    /// Override the configured recognition language
    #[arg(long)]
    language: Option<String>,

    /// Override the configured log level (none, error, warn, info, debug, all)
    #[arg(long)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    if let Some(wake_word) = args.wake_word {
        cfg.wake.wake_word = wake_word;
    }
    if let Some(language) = args.language {
        cfg.wake.language = language;
    }
    if let Some(level) = args.log_level {
        cfg.wake.log_level = level;
    }

    tracing_subscriber::fmt()
        .with_max_level(cfg.wake.log_level.to_level_filter())
        .init();

    info!("Wake Command v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("HTTP server will bind to {}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("STT service: {}", cfg.nats.url);

    let options = cfg.wake.to_options(cfg.nats.session_id.as_deref());
    let factory = Arc::new(NatsEngineFactory::new(cfg.nats.url.clone(), options.session_id.clone()));

    let commands = Arc::new(RwLock::new(VecDeque::new()));
    let history = Arc::clone(&commands);

    let callbacks = SessionCallbacks::new()
        .on_wake_word_detected(|| info!("Wake word heard, listening for a command"))
        .on_transcription(|text| info!("... {}", text))
        .on_command(move |text| {
            info!("Command: {}", text);
            let history = Arc::clone(&history);
            let text = text.to_string();
            tokio::spawn(async move {
                record_command(&history, &text).await;
            });
        })
        .on_command_timeout(|| info!("No command heard, back to listening"))
        .on_error(|e| {
            if e.is_terminal() {
                error!("{}", e);
            } else {
                warn!("{}", e);
            }
        });

    let session = wake_command::create(options, callbacks, factory)?;

    if !session.is_supported() {
        anyhow::bail!("Speech recognition is not available at {}", cfg.nats.url);
    }

    session.start()?;

    let app = create_router(AppState::new(session.clone(), commands));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;

    info!("Shutting down");
    session.stop()?;
    let status = session.status().await?;
    info!(
        "Session {} handled {} commands ({} wake words, {} restarts)",
        status.session_id, status.stats.commands, status.stats.wake_words, status.stats.restarts
    );

    Ok(())
}
