//! Canonical problem store
//!
//! Query surface: upsert-by-slug (company frequency merge and catalog
//! metadata), find-by-slug, find-by-company, find-by-slug-set and the
//! top-companies aggregate.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::db::retry::retry_on_conflict;
use crate::models::{CompanyFrequencyRecord, CompanyTotal, Problem, ProblemMetadata};
use crate::{Error, Result};

const PROBLEM_COLUMNS: &str = "slug, title, problem_name, problem_link, difficulty, topics, \
     companies, by_company, num_occur, acceptance_rate, last_updated, version";

/// Result of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Document already held these values; nothing written
    Unchanged,
}

fn problem_from_row(row: &SqliteRow) -> Result<Problem> {
    let difficulty: Option<String> = row.try_get("difficulty")?;
    let topics: String = row.try_get("topics")?;
    let companies: String = row.try_get("companies")?;
    let by_company: String = row.try_get("by_company")?;
    let num_occur: i64 = row.try_get("num_occur")?;

    Ok(Problem {
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        problem_name: row.try_get("problem_name")?,
        problem_link: row.try_get("problem_link")?,
        difficulty: difficulty.as_deref().and_then(|d| d.parse().ok()),
        topics: serde_json::from_str(&topics)?,
        companies: serde_json::from_str(&companies)?,
        by_company: serde_json::from_str(&by_company)?,
        num_occur: num_occur.max(0) as u64,
        acceptance_rate: row.try_get("acceptance_rate")?,
        last_updated: row.try_get("last_updated")?,
        version: row.try_get("version")?,
    })
}

/// Load one problem by slug
pub async fn load_problem(pool: &SqlitePool, slug: &str) -> Result<Option<Problem>> {
    let sql = format!("SELECT {} FROM problems WHERE slug = ?", PROBLEM_COLUMNS);
    let row = sqlx::query(&sql).bind(slug).fetch_optional(pool).await?;

    row.as_ref().map(problem_from_row).transpose()
}

/// Merge one company's frequency into the problem document for a slug.
///
/// The read-merge-write is a compare-and-set on `version`, retried on
/// conflict up to `max_attempts` times. `companies` and `num_occur` are
/// re-derived from the merged map on every write.
pub async fn merge_company_frequency(
    pool: &SqlitePool,
    record: &CompanyFrequencyRecord,
    max_attempts: u32,
) -> Result<UpsertOutcome> {
    retry_on_conflict("merge company frequency", max_attempts, || {
        try_merge_company_frequency(pool, record)
    })
    .await
}

async fn try_merge_company_frequency(
    pool: &SqlitePool,
    record: &CompanyFrequencyRecord,
) -> Result<UpsertOutcome> {
    match load_problem(pool, &record.slug).await? {
        None => {
            let mut problem = Problem::new(record.slug.clone());
            problem.title = record.problem_name.clone();
            problem.problem_name = Some(record.problem_name.clone());
            problem.problem_link = Some(record.problem_link.clone());
            problem.set_company_frequency(&record.company, record.occurrence_count);

            let result = sqlx::query(
                r#"
                INSERT INTO problems (
                    slug, title, problem_name, problem_link, topics,
                    companies, by_company, num_occur, last_updated, version
                ) VALUES (?, ?, ?, ?, '[]', ?, ?, ?, ?, 1)
                ON CONFLICT(slug) DO NOTHING
                "#,
            )
            .bind(&problem.slug)
            .bind(&problem.title)
            .bind(&problem.problem_name)
            .bind(&problem.problem_link)
            .bind(serde_json::to_string(&problem.companies)?)
            .bind(serde_json::to_string(&problem.by_company)?)
            .bind(problem.num_occur as i64)
            .bind(problem.last_updated)
            .execute(pool)
            .await?;

            if result.rows_affected() == 1 {
                Ok(UpsertOutcome::Inserted)
            } else {
                Err(Error::Conflict(format!("{} inserted concurrently", record.slug)))
            }
        }
        Some(mut problem) => {
            let expected_version = problem.version;
            let frequency_changed =
                problem.set_company_frequency(&record.company, record.occurrence_count);
            let name_changed =
                problem.problem_name.as_deref() != Some(record.problem_name.as_str());
            let link_changed =
                problem.problem_link.as_deref() != Some(record.problem_link.as_str());

            if !(frequency_changed || name_changed || link_changed) {
                return Ok(UpsertOutcome::Unchanged);
            }

            problem.problem_name = Some(record.problem_name.clone());
            problem.problem_link = Some(record.problem_link.clone());
            if problem.title.is_empty() || problem.title == problem.slug {
                problem.title = record.problem_name.clone();
            }

            let result = sqlx::query(
                r#"
                UPDATE problems SET
                    title = ?,
                    problem_name = ?,
                    problem_link = ?,
                    companies = ?,
                    by_company = ?,
                    num_occur = ?,
                    last_updated = ?,
                    version = version + 1
                WHERE slug = ? AND version = ?
                "#,
            )
            .bind(&problem.title)
            .bind(&problem.problem_name)
            .bind(&problem.problem_link)
            .bind(serde_json::to_string(&problem.companies)?)
            .bind(serde_json::to_string(&problem.by_company)?)
            .bind(problem.num_occur as i64)
            .bind(Utc::now())
            .bind(&problem.slug)
            .bind(expected_version)
            .execute(pool)
            .await?;

            if result.rows_affected() == 1 {
                Ok(UpsertOutcome::Updated)
            } else {
                Err(Error::Conflict(format!(
                    "{} changed since version {}",
                    record.slug, expected_version
                )))
            }
        }
    }
}

/// Upsert catalog metadata (title, difficulty, topics, acceptance rate).
///
/// A single statement; the frequency columns are never touched.
pub async fn upsert_metadata(pool: &SqlitePool, meta: &ProblemMetadata) -> Result<UpsertOutcome> {
    let version: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO problems (
            slug, title, difficulty, topics, acceptance_rate, last_updated, version
        ) VALUES (?, ?, ?, ?, ?, ?, 1)
        ON CONFLICT(slug) DO UPDATE SET
            title = excluded.title,
            difficulty = excluded.difficulty,
            topics = excluded.topics,
            acceptance_rate = excluded.acceptance_rate,
            last_updated = excluded.last_updated,
            version = problems.version + 1
        RETURNING version
        "#,
    )
    .bind(&meta.slug)
    .bind(&meta.title)
    .bind(meta.difficulty.map(|d| d.as_str()))
    .bind(serde_json::to_string(&meta.topics)?)
    .bind(meta.acceptance_rate)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    if version == 1 {
        Ok(UpsertOutcome::Inserted)
    } else {
        Ok(UpsertOutcome::Updated)
    }
}

/// All problems tagged with a company, most frequent first
pub async fn find_by_company(pool: &SqlitePool, company: &str) -> Result<Vec<Problem>> {
    let sql = format!(
        r#"
        SELECT {} FROM problems
        WHERE EXISTS (
            SELECT 1 FROM json_each(problems.by_company) WHERE json_each.key = ?
        )
        ORDER BY num_occur DESC, slug ASC
        "#,
        PROBLEM_COLUMNS
    );

    let rows = sqlx::query(&sql).bind(company).fetch_all(pool).await?;
    rows.iter().map(problem_from_row).collect()
}

/// Problems whose slug is in the given set
pub async fn find_by_slugs(pool: &SqlitePool, slugs: &[String]) -> Result<Vec<Problem>> {
    if slugs.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM problems WHERE slug IN (", PROBLEM_COLUMNS));
    let mut separated = builder.separated(", ");
    for slug in slugs {
        separated.push_bind(slug);
    }
    separated.push_unseparated(") ORDER BY slug ASC");

    let rows = builder.build().fetch_all(pool).await?;
    rows.iter().map(problem_from_row).collect()
}

/// Every problem tagged with at least one company
pub async fn find_with_companies(pool: &SqlitePool) -> Result<Vec<Problem>> {
    let sql = format!(
        "SELECT {} FROM problems WHERE by_company != '{{}}' ORDER BY slug ASC",
        PROBLEM_COLUMNS
    );

    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(problem_from_row).collect()
}

/// Companies ranked by the sum of their per-problem frequencies
pub async fn top_companies(pool: &SqlitePool, limit: u32) -> Result<Vec<CompanyTotal>> {
    let rows = sqlx::query(
        r#"
        SELECT je.key AS company,
               SUM(je.value) AS total_occurrences,
               COUNT(*) AS problem_count
        FROM problems, json_each(problems.by_company) AS je
        GROUP BY je.key
        ORDER BY total_occurrences DESC, company ASC
        LIMIT ?
        "#,
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(CompanyTotal {
                name: row.try_get("company")?,
                total_occurrences: row.try_get("total_occurrences")?,
                problem_count: row.try_get("problem_count")?,
            })
        })
        .collect()
}
