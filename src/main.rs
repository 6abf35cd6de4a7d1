use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use brain_dump_bot::categorize::Categorizer;
use brain_dump_bot::channels::{Channel, TelegramChannel};
use brain_dump_bot::config::BotConfig;
use brain_dump_bot::store::{DocumentStore, NotionStore};
use brain_dump_bot::webhook::{self, BotState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::from_env().context("Failed to load configuration")?;

    // Held for the process lifetime so buffered log lines get flushed.
    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("🧠 Brain Dump Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Classifier: {}", config.classifier_mode.as_str());
    if let Some(llm) = &config.llm {
        eprintln!("   Model: {}", llm.model);
    }
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    if let Some(dir) = &config.log_dir {
        eprintln!("   Logs: {}", dir.display());
    }

    let categorizer = Categorizer::from_config(&config).context("Failed to create LLM provider")?;

    let store = Arc::new(NotionStore::new(&config.notion).context("Failed to create Notion client")?);
    if !store.is_configured() {
        tracing::warn!("NOTION_API_KEY not set; every write will fail");
    }

    let telegram =
        Arc::new(TelegramChannel::new(&config.telegram).context("Failed to create Telegram client")?);
    if telegram.is_configured() {
        if let Err(e) = telegram.health_check().await {
            tracing::warn!(error = %e, "Telegram health check failed");
        }
        if let Some(url) = &config.telegram.webhook_url {
            let secret = config
                .telegram
                .webhook_secret
                .as_ref()
                .map(|s| s.expose_secret());
            if let Err(e) = telegram.set_webhook(url, secret).await {
                tracing::warn!(error = %e, "Failed to register Telegram webhook");
            }
        }
    } else {
        tracing::warn!("TELEGRAM_BOT_TOKEN not set; replies disabled");
    }

    let state = Arc::new(BotState::new(&config, categorizer, store, telegram));
    let app = webhook::routes(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(
        port = config.port,
        classifier_mode = config.classifier_mode.as_str(),
        "Brain dump bot listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Brain dump bot stopped");
    Ok(())
}

/// Stderr logging, plus daily rolling files when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_target(false).compact();

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "brain-dump-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
