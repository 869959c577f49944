//! pdscreen - speech-based Parkinson's screening service
//!
//! Loads configuration, initializes the classifier once and serves the
//! screening API until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use pdscreen::classifier::build_classifier;
use pdscreen::features::extractor::FeatureExtractor;
use pdscreen::pipeline::ScreeningPipeline;
use pdscreen::AppState;
use pdscreen_common::config::{ConfigResolver, LoggingConfig};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(version, about = "Speech-based Parkinson's screening service")]
struct Args {
    /// Config file (overrides PDSCREEN_CONFIG and platform config files)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides [server].port)
    #[arg(short, long, env = "PDSCREEN_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;

    init_tracing(&config.logging)?;

    info!("Starting pdscreen v{}", env!("CARGO_PKG_VERSION"));
    info!(
        sample_rate = config.audio.sample_rate,
        num_features = config.audio.num_features,
        validation = ?config.audio.validation,
        "Audio configuration"
    );

    if config.audio.num_features != config.model.input_length {
        warn!(
            num_features = config.audio.num_features,
            input_length = config.model.input_length,
            "Feature count differs from model input length"
        );
    }

    let extractor = Arc::new(
        FeatureExtractor::new(config.audio.clone()).context("Failed to build feature extractor")?,
    );

    let classifier = build_classifier(&config.model);
    classifier
        .init()
        .context("Failed to initialize classifier")?;

    let pipeline = ScreeningPipeline::new(extractor, classifier);
    let state = AppState::new(pipeline, config.upload.clone());
    state
        .staging
        .prepare()
        .context("Failed to create upload staging directory")?;
    info!(path = %state.staging.dir().display(), "Upload staging directory ready");

    let app = pdscreen::build_router(state);

    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing from `[logging]`; `RUST_LOG` takes precedence
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("Invalid logging.level '{}'", logging.level))?,
    };

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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
