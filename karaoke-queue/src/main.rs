//! Karaoke Queue (karaoke-queue) - Main entry point
//!
//! Loads bootstrap configuration, opens the database and serves the
//! HTTP/SSE API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use karaoke_queue::api::{build_router, AppState};
use karaoke_queue::config::{Config, ConfigOverrides, TomlConfig};
use karaoke_queue::QueueService;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for karaoke-queue
#[derive(Parser, Debug)]
#[command(name = "karaoke-queue")]
#[command(about = "Live karaoke event queue coordinator")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "KARAOKE_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long, env = "KARAOKE_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Path to SQLite database file (overrides TOML and root folder)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Path to TOML bootstrap file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load(args.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    let config = Config::resolve(
        toml_config,
        ConfigOverrides {
            database_path: args.database,
            port: args.port,
            root_folder: args.root_folder,
        },
    );

    // Initialize tracing (RUST_LOG wins over the configured level)
    let default_filter = format!(
        "karaoke_queue={},karaoke_common={},tower_http=info",
        config.log_level, config.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting karaoke-queue v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Root folder: {}", config.root_folder.display());

    let db_pool = karaoke_common::db::init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready: {}", config.database_path.display());

    let queue = QueueService::with_settings(db_pool, config.queue.clone());
    let app = build_router(AppState::new(queue));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

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
