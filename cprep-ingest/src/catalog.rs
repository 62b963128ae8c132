//! Catalog sync: platform problem metadata into the canonical store

use cprep_common::db::problems::{upsert_metadata, UpsertOutcome};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::source::{SourceClient, Transport};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    pub processed: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Catalog records without a resolvable slug
    pub unresolved: usize,
    pub errored: usize,
    /// False when the walk stopped early (failed page or cancellation)
    pub complete: bool,
}

/// Fetch the whole catalog and upsert each problem's metadata
///
/// Per-company frequencies are never touched.
pub async fn sync_catalog<T: Transport>(
    client: &SourceClient<T>,
    pool: &SqlitePool,
    cancel: &CancellationToken,
) -> CatalogReport {
    let fetch = client.fetch_problem_catalog(cancel).await;
    let mut report = CatalogReport {
        unresolved: fetch.unresolved,
        complete: fetch.complete,
        ..Default::default()
    };

    for metadata in &fetch.problems {
        if cancel.is_cancelled() {
            report.complete = false;
            break;
        }

        report.processed += 1;
        match upsert_metadata(pool, metadata).await {
            Ok(UpsertOutcome::Inserted) => report.inserted += 1,
            Ok(UpsertOutcome::Updated) | Ok(UpsertOutcome::Unchanged) => report.updated += 1,
            Err(e) => {
                tracing::warn!(slug = %metadata.slug, error = %e, "Catalog upsert failed");
                report.errored += 1;
            }
        }
    }

    tracing::info!(
        processed = report.processed,
        inserted = report.inserted,
        updated = report.updated,
        unresolved = report.unresolved,
        errored = report.errored,
        complete = report.complete,
        "Catalog sync finished"
    );
    report
}
