//! Solved-set archive: a user's accepted problems into `user_solved`

use chrono::Utc;
use cprep_common::db::solved::record_solved;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use crate::source::{SourceClient, Transport};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    /// Slugs reported by the platform
    pub found: usize,
    /// Slugs for which a title was hydrated
    pub titled: usize,
    pub archived: usize,
    pub errored: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The platform reported no accepted problems
    NothingFound,
    Archived(ArchiveReport),
}

/// Archive every accepted problem with the current time as solve time
///
/// Slugs whose title lookup failed are still archived, without a title.
pub async fn archive_solved<T: Transport>(
    client: &SourceClient<T>,
    pool: &SqlitePool,
    user_id: &str,
    cancel: &CancellationToken,
) -> ArchiveOutcome {
    let slugs = client.fetch_all_accepted_slugs(cancel).await;
    if slugs.is_empty() {
        tracing::info!(user = %user_id, "No accepted problems found");
        return ArchiveOutcome::NothingFound;
    }

    let titles: HashMap<String, String> = client
        .fetch_titles_for_slugs(&slugs, cancel)
        .await
        .into_iter()
        .map(|t| (t.slug, t.title))
        .collect();

    let mut report = ArchiveReport {
        found: slugs.len(),
        titled: titles.len(),
        ..Default::default()
    };
    let now = Utc::now();

    for slug in &slugs {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        let title = titles.get(slug).map(String::as_str);
        match record_solved(pool, user_id, slug, title, now).await {
            Ok(()) => report.archived += 1,
            Err(e) => {
                tracing::warn!(user = %user_id, slug = %slug, error = %e, "Failed to archive solved problem");
                report.errored += 1;
            }
        }
    }

    tracing::info!(
        user = %user_id,
        found = report.found,
        archived = report.archived,
        errored = report.errored,
        "Solved set archived"
    );
    ArchiveOutcome::Archived(report)
}

/// Archive accepted submissions with their real solve times
pub async fn archive_submission_history<T: Transport>(
    client: &SourceClient<T>,
    pool: &SqlitePool,
    user_id: &str,
    cancel: &CancellationToken,
) -> ArchiveOutcome {
    let submissions = client.fetch_accepted_submissions(cancel).await;
    if submissions.is_empty() {
        return ArchiveOutcome::NothingFound;
    }

    let mut report = ArchiveReport {
        found: submissions.len(),
        titled: submissions.iter().filter(|s| s.title.is_some()).count(),
        ..Default::default()
    };

    for submission in &submissions {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        let result = record_solved(
            pool,
            user_id,
            &submission.slug,
            submission.title.as_deref(),
            submission.solved_at,
        )
        .await;
        match result {
            Ok(()) => report.archived += 1,
            Err(e) => {
                tracing::warn!(user = %user_id, slug = %submission.slug, error = %e, "Failed to archive submission");
                report.errored += 1;
            }
        }
    }

    tracing::info!(user = %user_id, found = report.found, archived = report.archived, "Submission history archived");
    ArchiveOutcome::Archived(report)
}
