//! flexlingo-server - serial device status and sign prediction service
//!
//! Serves the browser UI's `/status` polling and `/start` prediction
//! requests. Default port 5001.

use anyhow::{Context, Result};
use clap::Parser;
use flexlingo_common::config::{ConfigOverrides, ConfigSource, TomlConfig};
use flexlingo_server::{build_router, AppState};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for flexlingo-server
#[derive(Parser, Debug)]
#[command(name = "flexlingo-server")]
#[command(about = "Serial device status and sign prediction service")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file (also FLEXLINGO_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "FLEXLINGO_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "FLEXLINGO_PORT")]
    port: Option<u16>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "FLEXLINGO_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config
        .apply_overrides(&ConfigOverrides {
            host: args.host,
            port: args.port,
            log_level: args.log_level,
        })
        .context("Invalid configuration override")?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.logging.level))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting flexlingo-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &source {
        ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
        ConfigSource::Defaults => warn!("No configuration file found, using built-in defaults"),
    }
    info!(
        ports = ?config.ports.source,
        interpreter = config.predictor.interpreter().unwrap_or("<none>"),
        timeout_secs = config.predictor.timeout_secs,
        "Predictor configured"
    );
    for (model, script) in [
        ("rf", &config.predictor.scripts.rf),
        ("bilstm", &config.predictor.scripts.bilstm),
    ] {
        if !script.exists() {
            warn!(model, script = %script.display(), "Predictor script not found; /start will fail for this model");
        }
    }

    let state = AppState::from_config(&config);
    let app = build_router(state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("flexlingo-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("flexlingo-server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
