//! Database access for cprep
//!
//! SQLite holds the canonical problem store and per-user solved sets.
//! JSON columns (`topics`, `by_company`, `companies`) are queried with
//! SQLite's `json_each`.

pub mod problems;
pub mod retry;
pub mod solved;

use crate::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

pub use retry::retry_on_conflict;

/// Initialize database connection pool
///
/// Creates the database file (and parent folder) when missing and
/// ensures the schema exists.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the schema applied
///
/// Every connection to `sqlite::memory:` is a separate database, so the
/// pool is capped at one connection.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create cprep tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS problems (
            slug TEXT PRIMARY KEY,
            title TEXT NOT NULL DEFAULT '',
            problem_name TEXT,
            problem_link TEXT,
            difficulty TEXT,
            topics TEXT NOT NULL DEFAULT '[]',
            companies TEXT NOT NULL DEFAULT '[]',
            by_company TEXT NOT NULL DEFAULT '{}',
            num_occur INTEGER NOT NULL DEFAULT 0,
            acceptance_rate REAL,
            last_updated TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_problems_num_occur ON problems(num_occur)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_solved (
            user_id TEXT NOT NULL,
            slug TEXT NOT NULL,
            title TEXT,
            solved_at TEXT NOT NULL,
            PRIMARY KEY (user_id, slug)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (problems, user_solved)");

    Ok(())
}
