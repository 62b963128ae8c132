//! cprep-ingest - problem data ingestion
//!
//! Subcommands:
//! - `download`: fetch the company CSV feed into `ingest.csv_dir`
//! - `csv`: merge per-company frequency CSVs into the problem store
//! - `catalog`: sync problem metadata from the platform
//! - `solved`: archive a user's accepted problems
//!
//! Ctrl+C stops the current run at the next page or record boundary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cprep_common::config::{database_path, resolve_root_folder, TomlConfig, ENV_ROOT_FOLDER};
use cprep_common::db::init_database_pool;
use cprep_ingest::archive::{archive_solved, archive_submission_history, ArchiveOutcome};
use cprep_ingest::catalog::sync_catalog;
use cprep_ingest::{FeedDownloader, MergeEngine, SourceClient};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for cprep-ingest
#[derive(Parser, Debug)]
#[command(name = "cprep-ingest")]
#[command(about = "Ingest coding-interview problem data")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, env = "CPREP_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Explicit TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the company CSV feed
    Download {
        /// Target folder (defaults to `ingest.csv_dir`)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Merge every company CSV in a folder
    Csv {
        /// Folder of `<company>.csv` files (defaults to `ingest.csv_dir`)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Sync problem metadata from the platform catalog
    Catalog,
    /// Archive the session user's accepted problems
    Solved {
        /// User id the solved set is stored under
        #[arg(short, long)]
        user: String,

        /// Walk the submission history to keep real solve times
        #[arg(long)]
        history: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cprep_ingest=info,cprep_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;
    config.apply_env_overrides();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ENV_ROOT_FOLDER, &config);
    info!("Root folder: {}", root_folder.display());

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    match args.command {
        Command::Download { dir } => {
            let dir = dir.unwrap_or_else(|| root_folder.join(&config.ingest.csv_dir));
            if config.feed.token.is_none() {
                info!("GITHUB_TOKEN not set, using the anonymous rate limit");
            }
            let downloader = FeedDownloader::from_config(&config.feed)
                .context("Failed to build feed client")?;
            let report = downloader
                .download_all(&dir, &cancel)
                .await
                .with_context(|| format!("Failed to download feed into {}", dir.display()))?;
            if report.failed > 0 {
                tracing::warn!(failed = report.failed, "Some feed files were not downloaded");
            }
        }
        Command::Csv { dir } => {
            let pool = open_pool(&root_folder).await?;
            let dir = dir.unwrap_or_else(|| root_folder.join(&config.ingest.csv_dir));
            let engine = MergeEngine::new(pool, config.ingest.merge_max_attempts);
            let report = engine
                .ingest_folder(&dir, &cancel)
                .await
                .with_context(|| format!("Failed to read {}", dir.display()))?;

            info!(
                files = report.files.len(),
                processed = report.total.processed,
                inserted = report.total.inserted,
                updated = report.total.updated,
                unchanged = report.total.unchanged,
                skipped = report.total.skipped,
                unresolved = report.total.unresolved,
                errored = report.total.errored,
                "CSV ingestion complete"
            );
        }
        Command::Catalog => {
            let pool = open_pool(&root_folder).await?;
            let client = SourceClient::from_config(&config.source)
                .context("Failed to build platform client")?;
            let report = sync_catalog(&client, &pool, &cancel).await;
            if !report.complete {
                tracing::warn!("Catalog sync stopped before the last page");
            }
        }
        Command::Solved { user, history } => {
            let pool = open_pool(&root_folder).await?;
            let client = SourceClient::from_config(&config.source)
                .context("Failed to build platform client")?;
            let outcome = if history {
                archive_submission_history(&client, &pool, &user, &cancel).await
            } else {
                archive_solved(&client, &pool, &user, &cancel).await
            };

            match outcome {
                ArchiveOutcome::NothingFound => {
                    tracing::warn!(user = %user, "No solved problems found; check session credentials")
                }
                ArchiveOutcome::Archived(report) => {
                    info!(user = %user, found = report.found, archived = report.archived, "Solved set archived")
                }
            }
        }
    }

    Ok(())
}

async fn open_pool(root_folder: &Path) -> Result<SqlitePool> {
    init_database_pool(&database_path(root_folder))
        .await
        .context("Failed to open database")
}

/// Cancel the token on the first Ctrl+C
async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, stopping at next boundary");
            cancel.cancel();
        }
        Err(e) => tracing::error!("Failed to install Ctrl+C handler: {}", e),
    }
}
