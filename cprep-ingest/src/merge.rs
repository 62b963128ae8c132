//! CSV merge engine
//!
//! Folds per-company frequency records into the canonical problem store.
//! Each record is an independent per-slug compare-and-set upsert; a bad
//! record is counted and the batch carries on.

use cprep_common::db::problems::{merge_company_frequency, UpsertOutcome};
use cprep_common::CompanyFrequencyRecord;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::csv_source::{read_company_csv, CsvBatch, RowRejection};

/// Counts for one ingestion batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub source: String,
    pub company: String,
    /// Rows seen, whatever their outcome
    pub processed: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Valid rows whose values were already stored
    pub unchanged: usize,
    /// Rows overridden by a later row for the same slug in the batch
    pub superseded: usize,
    /// Rows missing a name or link
    pub skipped: usize,
    /// Rows whose link yielded no slug
    pub unresolved: usize,
    /// Malformed rows and failed writes
    pub errored: usize,
    pub cancelled: bool,
}

impl BatchReport {
    fn new(source: &str, company: &str) -> Self {
        Self {
            source: source.to_string(),
            company: company.to_string(),
            ..Default::default()
        }
    }

    fn count_rejection(&mut self, rejection: &RowRejection) {
        self.processed += 1;
        match rejection {
            RowRejection::MissingName | RowRejection::MissingLink => self.skipped += 1,
            RowRejection::UnresolvableLink(_) => self.unresolved += 1,
            RowRejection::Malformed(_) => self.errored += 1,
        }
    }

    fn absorb(&mut self, other: &BatchReport) {
        self.processed += other.processed;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.superseded += other.superseded;
        self.skipped += other.skipped;
        self.unresolved += other.unresolved;
        self.errored += other.errored;
        self.cancelled |= other.cancelled;
    }
}

/// Per-file reports plus their sum
#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderReport {
    pub files: Vec<BatchReport>,
    pub total: BatchReport,
}

/// Applies company frequency batches to the problem store
#[derive(Clone)]
pub struct MergeEngine {
    pool: SqlitePool,
    max_attempts: u32,
}

impl MergeEngine {
    /// `max_attempts` bounds compare-and-set retries per slug
    pub fn new(pool: SqlitePool, max_attempts: u32) -> Self {
        Self {
            pool,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Merge already-validated records
    pub async fn merge_records(
        &self,
        source: &str,
        company: &str,
        records: &[CompanyFrequencyRecord],
        cancel: &CancellationToken,
    ) -> BatchReport {
        let mut report = BatchReport::new(source, company);
        self.apply(&mut report, records, cancel).await;
        report
    }

    /// Merge a parsed CSV batch, counting its rejected rows
    pub async fn ingest_csv_batch(&self, batch: &CsvBatch, cancel: &CancellationToken) -> BatchReport {
        let mut report = BatchReport::new(&batch.source, &batch.company);

        for (line, rejection) in &batch.rejections {
            tracing::debug!(source = %batch.source, line, ?rejection, "Row rejected");
            report.count_rejection(rejection);
        }

        self.apply(&mut report, &batch.records, cancel).await;

        tracing::info!(
            source = %report.source,
            company = %report.company,
            processed = report.processed,
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            superseded = report.superseded,
            skipped = report.skipped,
            unresolved = report.unresolved,
            errored = report.errored,
            "CSV batch merged"
        );
        report
    }

    /// Read and merge one company CSV file
    ///
    /// An unreadable file yields a report with a single errored entry.
    pub async fn ingest_file(&self, path: &Path, cancel: &CancellationToken) -> BatchReport {
        match read_company_csv(path) {
            Ok(batch) => self.ingest_csv_batch(&batch, cancel).await,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Unreadable company CSV");
                let mut report = BatchReport::new(&path.display().to_string(), "");
                report.errored = 1;
                report
            }
        }
    }

    /// Merge every `*.csv` in a folder, in file name order
    pub async fn ingest_folder(
        &self,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> cprep_common::Result<FolderReport> {
        let files = list_csv_files(dir)?;
        tracing::info!(dir = %dir.display(), files = files.len(), "Ingesting company CSV folder");

        let mut folder = FolderReport::default();
        folder.total.source = dir.display().to_string();

        for path in files {
            if cancel.is_cancelled() {
                folder.total.cancelled = true;
                break;
            }
            let report = self.ingest_file(&path, cancel).await;
            folder.total.absorb(&report);
            folder.files.push(report);
        }

        Ok(folder)
    }

    async fn apply(
        &self,
        report: &mut BatchReport,
        records: &[CompanyFrequencyRecord],
        cancel: &CancellationToken,
    ) {
        let (records, superseded) = collapse_by_slug(records);
        report.processed += superseded;
        report.superseded += superseded;

        for record in records {
            if cancel.is_cancelled() {
                tracing::info!(source = %report.source, processed = report.processed, "Merge cancelled");
                report.cancelled = true;
                return;
            }

            report.processed += 1;

            if !is_complete(record) {
                report.skipped += 1;
                continue;
            }

            match merge_company_frequency(&self.pool, record, self.max_attempts).await {
                Ok(UpsertOutcome::Inserted) => report.inserted += 1,
                Ok(UpsertOutcome::Updated) => report.updated += 1,
                Ok(UpsertOutcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    tracing::warn!(slug = %record.slug, company = %record.company, error = %e, "Merge failed");
                    report.errored += 1;
                }
            }
        }
    }
}

fn is_complete(record: &CompanyFrequencyRecord) -> bool {
    !record.slug.trim().is_empty()
        && !record.problem_link.trim().is_empty()
        && !record.problem_name.trim().is_empty()
}

/// One record per (company, slug), the last row winning, in first-seen order.
///
/// Incomplete records pass through untouched. Returns the kept records and
/// how many rows were overridden.
fn collapse_by_slug(records: &[CompanyFrequencyRecord]) -> (Vec<&CompanyFrequencyRecord>, usize) {
    let mut position: HashMap<(&str, &str), usize> = HashMap::new();
    let mut kept: Vec<&CompanyFrequencyRecord> = Vec::with_capacity(records.len());

    for record in records {
        if !is_complete(record) {
            kept.push(record);
            continue;
        }
        let key = (record.company.as_str(), record.slug.as_str());
        match position.get(&key) {
            Some(&index) => kept[index] = record,
            None => {
                position.insert(key, kept.len());
                kept.push(record);
            }
        }
    }

    let superseded = records.len() - kept.len();
    (kept, superseded)
}

/// Sorted `*.csv` paths directly inside `dir`
fn list_csv_files(dir: &Path) -> cprep_common::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cprep_common::db::init_memory_pool;
    use cprep_common::db::problems::load_problem;

    fn record(slug: &str, company: &str, count: u32) -> CompanyFrequencyRecord {
        CompanyFrequencyRecord {
            problem_name: slug.replace('-', " "),
            problem_link: format!("https://leetcode.com/problems/{}/", slug),
            slug: slug.to_string(),
            company: company.to_string(),
            occurrence_count: count,
        }
    }

    #[tokio::test]
    async fn test_merge_counts_outcomes() {
        let pool = init_memory_pool().await.unwrap();
        let engine = MergeEngine::new(pool.clone(), 5);
        let cancel = CancellationToken::new();

        let records = vec![record("two-sum", "Google", 4), record("lru-cache", "Google", 2)];
        let first = engine.merge_records("google.csv", "Google", &records, &cancel).await;
        assert_eq!((first.processed, first.inserted), (2, 2));

        let changed = vec![record("two-sum", "Google", 9), record("lru-cache", "Google", 2)];
        let second = engine.merge_records("google.csv", "Google", &changed, &cancel).await;
        assert_eq!((second.updated, second.unchanged), (1, 1));

        let problem = load_problem(&pool, "two-sum").await.unwrap().unwrap();
        assert_eq!(problem.frequency_for("Google"), 9);
        assert_eq!(problem.num_occur, 9);
    }

    #[tokio::test]
    async fn test_repeated_slug_last_row_wins() {
        let pool = init_memory_pool().await.unwrap();
        let engine = MergeEngine::new(pool.clone(), 5);
        let cancel = CancellationToken::new();

        let records = vec![
            record("two-sum", "Google", 12),
            record("lru-cache", "Google", 3),
            record("two-sum", "Google", 4),
        ];
        let first = engine.merge_records("google.csv", "Google", &records, &cancel).await;
        assert_eq!(first.processed, 3);
        assert_eq!(first.inserted, 2);
        assert_eq!(first.updated, 0);
        assert_eq!(first.superseded, 1);

        let second = engine.merge_records("google.csv", "Google", &records, &cancel).await;
        assert_eq!((second.unchanged, second.updated, second.superseded), (2, 0, 1));

        let problem = load_problem(&pool, "two-sum").await.unwrap().unwrap();
        assert_eq!(problem.frequency_for("Google"), 4);
        assert_eq!(problem.version, 1);
    }

    #[test]
    fn test_collapse_keeps_first_seen_order() {
        let records = vec![
            record("a", "Google", 1),
            record("b", "Google", 2),
            record("a", "Google", 3),
            record("a", "Amazon", 5),
        ];
        let (kept, superseded) = collapse_by_slug(&records);

        assert_eq!(superseded, 1);
        let summary: Vec<(&str, &str, u32)> = kept
            .iter()
            .map(|r| (r.slug.as_str(), r.company.as_str(), r.occurrence_count))
            .collect();
        assert_eq!(summary, vec![("a", "Google", 3), ("b", "Google", 2), ("a", "Amazon", 5)]);
    }

    #[tokio::test]
    async fn test_empty_fields_are_skipped() {
        let pool = init_memory_pool().await.unwrap();
        let engine = MergeEngine::new(pool, 5);

        let mut nameless = record("two-sum", "Google", 1);
        nameless.problem_name = "  ".to_string();
        let report = engine
            .merge_records("google.csv", "Google", &[nameless], &CancellationToken::new())
            .await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.inserted, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let pool = init_memory_pool().await.unwrap();
        let engine = MergeEngine::new(pool, 5);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = engine
            .merge_records("google.csv", "Google", &[record("two-sum", "Google", 1)], &cancel)
            .await;
        assert!(report.cancelled);
        assert_eq!(report.processed, 0);
    }
}
