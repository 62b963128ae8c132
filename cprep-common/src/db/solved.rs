//! Per-user solved sets
//!
//! Append-only from the caller's perspective: re-recording a slug keeps
//! the earliest known solve time and fills in a missing title.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

use crate::models::SolvedProblem;
use crate::Result;

/// Record one solved problem for a user
pub async fn record_solved(
    pool: &SqlitePool,
    user_id: &str,
    slug: &str,
    title: Option<&str>,
    solved_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_solved (user_id, slug, title, solved_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id, slug) DO UPDATE SET
            title = COALESCE(excluded.title, user_solved.title),
            solved_at = MIN(user_solved.solved_at, excluded.solved_at)
        "#,
    )
    .bind(user_id)
    .bind(slug)
    .bind(title)
    .bind(solved_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Slugs a user has solved
pub async fn load_solved_slugs(pool: &SqlitePool, user_id: &str) -> Result<HashSet<String>> {
    let slugs: Vec<String> = sqlx::query_scalar("SELECT slug FROM user_solved WHERE user_id = ?")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(slugs.into_iter().collect())
}

/// Full solved entries for a user, most recent first
pub async fn load_solved(pool: &SqlitePool, user_id: &str) -> Result<Vec<SolvedProblem>> {
    let rows = sqlx::query(
        r#"
        SELECT slug, title, solved_at FROM user_solved
        WHERE user_id = ?
        ORDER BY solved_at DESC, slug ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(SolvedProblem {
                slug: row.try_get("slug")?,
                title: row.try_get("title")?,
                solved_at: row.try_get("solved_at")?,
            })
        })
        .collect()
}
