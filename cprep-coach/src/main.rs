//! cprep-coach - readiness and practice plan service
//!
//! Serves readiness reports, practice plans and company aggregates over
//! the problem store written by cprep-ingest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cprep_common::config::{database_path, resolve_root_folder, TomlConfig, ENV_ROOT_FOLDER};
use cprep_common::db::init_database_pool;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cprep_coach::{build_router, AppState};

/// Command-line arguments for cprep-coach
#[derive(Parser, Debug)]
#[command(name = "cprep-coach")]
#[command(about = "Company readiness and practice plan service")]
#[command(version)]
struct Args {
    /// Address to listen on (overrides `server.bind`)
    #[arg(short, long, env = "CPREP_BIND")]
    bind: Option<String>,

    /// Root folder holding the database
    #[arg(short, long, env = "CPREP_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Explicit TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cprep_coach=debug,cprep_common=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;
    config.apply_env_overrides();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ENV_ROOT_FOLDER, &config);
    let db_path = database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let db = init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let app = build_router(AppState::new(db, &config));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

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
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
