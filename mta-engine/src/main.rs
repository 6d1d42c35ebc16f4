//! mta-engine - Meeting Task Automation service
//!
//! Receives meeting action items by webhook (or from monitored meeting
//! transcripts), skips items it has already handled, categorizes the rest by
//! department and creates one tracked task per item.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mta_common::config::{CategorizerProvider, EngineConfig, TrackerProvider};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mta_engine::services::{
    Categorizer, GeminiCategorizer, KeywordCategorizer, LocalTaskTracker, Pipeline, Tracker,
    ZohoSprintsTracker,
};
use mta_engine::state::StateStore;
use mta_engine::{build_router, AppState};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "mta-engine")]
#[command(about = "Meeting action items to tracked tasks, exactly once per item")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "MTA_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Folder holding the state document, lock marker and local tasks
    #[arg(short, long)]
    data_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mta_engine=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Meeting Task Automation engine (mta-engine) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let mut config = EngineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_cli(args.host, args.port, args.data_folder);

    tokio::fs::create_dir_all(&config.data_folder)
        .await
        .with_context(|| format!("Failed to create data folder {}", config.data_folder.display()))?;
    info!("Data folder: {}", config.data_folder.display());
    info!(
        "State TTL: {} days, size warning at {} MB",
        config.state.ttl_days, config.state.max_size_mb
    );

    let categorizer: Arc<dyn Categorizer> = match config.categorizer.provider {
        CategorizerProvider::Gemini => Arc::new(
            GeminiCategorizer::from_settings(&config.categorizer).context("Failed to initialize Gemini categorizer")?,
        ),
        CategorizerProvider::Keyword => Arc::new(KeywordCategorizer::new()),
    };

    let mut local_tasks = None;
    let tracker: Arc<dyn Tracker> = match config.tracker.provider {
        TrackerProvider::Zoho => Arc::new(
            ZohoSprintsTracker::from_settings(&config.tracker).context("Failed to initialize Zoho tracker")?,
        ),
        TrackerProvider::Local => {
            let local = Arc::new(LocalTaskTracker::from_settings(&config.tracker));
            info!("Local tasks file: {}", local.tasks_file().display());
            local_tasks = Some(local.clone());
            local
        }
    };
    info!(
        categorizer = categorizer.name(),
        tracker = tracker.name(),
        "Collaborators initialized"
    );

    let pipeline = Pipeline::new(StateStore::from_config(&config), categorizer, tracker);
    let app = build_router(AppState::new(pipeline, local_tasks));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("mta-engine listening on http://{}", addr);
    info!("Webhook endpoint: http://{}/webhook", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
