//! Paginated platform operations
//!
//! Pagination is a strictly sequential loop: each page completes (or
//! exhausts its retries) before the next offset is requested. The
//! multi-page operations never fail; on the first failed page they stop
//! and return what was accumulated. Cancellation is honoured only between
//! pages and between per-slug lookups.

use chrono::{DateTime, Utc};
use cprep_common::config::SourceConfig;
use cprep_common::{Difficulty, ProblemMetadata};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::queries::{
    ACCEPTED_SLUGS_QUERY, PROBLEM_CATALOG_QUERY, QUESTION_TITLE_QUERY, SUBMISSION_LIST_QUERY,
};
use super::retry::{FetchError, RetryPolicy, RetryingTransport};
use super::transport::{HttpTransport, Transport};
use crate::slug::resolve_slug;

/// Tunables fixed at client construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub page_size: u32,
    pub submission_page_size: u32,
    pub page_delay: Duration,
    pub title_delay: Duration,
    pub retry: RetryPolicy,
}

impl From<&SourceConfig> for ClientSettings {
    fn from(config: &SourceConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            submission_page_size: config.submission_page_size.max(1),
            page_delay: Duration::from_millis(config.page_delay_ms),
            title_delay: Duration::from_millis(config.title_delay_ms),
            retry: RetryPolicy::from(config),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from(&SourceConfig::default())
    }
}

/// Minimum spacing between successive requests of one kind
struct Pacer {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl Pacer {
    fn new(period: Duration) -> Self {
        Self {
            limiter: Quota::with_period(period).map(RateLimiter::direct),
        }
    }

    async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

/// Slug with its display title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugTitle {
    pub slug: String,
    pub title: String,
}

/// Result of a catalog walk
#[derive(Debug, Clone, Default)]
pub struct CatalogFetch {
    pub problems: Vec<ProblemMetadata>,
    /// Records dropped because no slug could be resolved
    pub unresolved: usize,
    /// False when a page failed or the walk was cancelled
    pub complete: bool,
}

/// First accepted submission for one problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedSubmission {
    pub slug: String,
    pub title: Option<String>,
    pub solved_at: DateTime<Utc>,
}

/// One page of a `questionList` response
struct QuestionPage {
    total: Option<u64>,
    questions: Vec<Value>,
}

/// Client for the remote practice platform
pub struct SourceClient<T = HttpTransport> {
    transport: RetryingTransport<T>,
    settings: ClientSettings,
    page_pacer: Pacer,
    title_pacer: Pacer,
}

impl SourceClient<HttpTransport> {
    /// Client over HTTP, configured from the `[source]` section
    pub fn from_config(config: &SourceConfig) -> cprep_common::Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(transport, ClientSettings::from(config)))
    }
}

impl<T: Transport> SourceClient<T> {
    pub fn new(transport: T, settings: ClientSettings) -> Self {
        Self {
            transport: RetryingTransport::new(transport, settings.retry.clone()),
            page_pacer: Pacer::new(settings.page_delay),
            title_pacer: Pacer::new(settings.title_delay),
            settings,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        self.transport.inner()
    }

    /// Every problem the session user has an accepted submission for
    ///
    /// Always returns a list; a failed page ends the walk early.
    pub async fn fetch_all_accepted_slugs(&self, cancel: &CancellationToken) -> Vec<String> {
        let page_size = self.settings.page_size;
        let mut slugs = Vec::new();
        let mut skip: u64 = 0;

        tracing::info!("Scanning accepted problems");

        loop {
            if cancel.is_cancelled() {
                tracing::info!(collected = slugs.len(), "Accepted slug scan cancelled");
                break;
            }

            self.page_pacer.wait().await;

            let variables = json!({
                "categorySlug": "",
                "skip": skip,
                "limit": page_size,
                "filters": { "status": "AC" },
            });
            let page = match self.fetch_question_page(ACCEPTED_SLUGS_QUERY, variables).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(skip, error = %e, collected = slugs.len(), "Accepted slug page failed, returning partial result");
                    break;
                }
            };

            let page_len = page.questions.len();
            if page_len == 0 {
                break;
            }

            for question in &page.questions {
                match resolve_slug(question) {
                    Ok(resolved) => slugs.push(resolved.slug),
                    Err(e) => tracing::debug!(error = %e, "Skipping accepted record without slug"),
                }
            }

            tracing::debug!(skip, page_len, collected = slugs.len(), "Accepted slug page received");

            if page_len < page_size as usize {
                break;
            }
            skip += u64::from(page_size);
        }

        tracing::info!(count = slugs.len(), "Accepted slug scan finished");
        slugs
    }

    /// Title of one problem
    pub async fn fetch_title(&self, slug: &str) -> Result<SlugTitle, FetchError> {
        let data = self
            .transport
            .execute(QUESTION_TITLE_QUERY, json!({ "titleSlug": slug }))
            .await?;

        let question = data
            .get("question")
            .filter(|q| q.is_object())
            .ok_or_else(|| FetchError::NotFound(slug.to_string()))?;
        let title = question
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FetchError::Malformed(format!("question {} has no title", slug)))?;
        let canonical = question
            .get("titleSlug")
            .and_then(Value::as_str)
            .unwrap_or(slug);

        Ok(SlugTitle {
            slug: canonical.to_string(),
            title: title.to_string(),
        })
    }

    /// Titles for many slugs; a failing slug is logged and skipped
    pub async fn fetch_titles_for_slugs(
        &self,
        slugs: &[String],
        cancel: &CancellationToken,
    ) -> Vec<SlugTitle> {
        let mut titles = Vec::with_capacity(slugs.len());

        for slug in slugs {
            if cancel.is_cancelled() {
                tracing::info!(hydrated = titles.len(), "Title hydration cancelled");
                break;
            }

            self.title_pacer.wait().await;

            match self.fetch_title(slug).await {
                Ok(title) => titles.push(title),
                Err(e) => tracing::warn!(slug = %slug, error = %e, "Title lookup failed, skipping"),
            }
        }

        tracing::info!(requested = slugs.len(), hydrated = titles.len(), "Title hydration finished");
        titles
    }

    /// Walk the full problem catalog
    pub async fn fetch_problem_catalog(&self, cancel: &CancellationToken) -> CatalogFetch {
        let page_size = self.settings.page_size;
        let mut fetch = CatalogFetch::default();
        let mut skip: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                tracing::info!(collected = fetch.problems.len(), "Catalog walk cancelled");
                return fetch;
            }

            self.page_pacer.wait().await;

            let variables = json!({
                "categorySlug": "",
                "skip": skip,
                "limit": page_size,
                "filters": {},
            });
            let page = match self.fetch_question_page(PROBLEM_CATALOG_QUERY, variables).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(skip, error = %e, "Catalog page failed, stopping walk");
                    return fetch;
                }
            };

            let page_len = page.questions.len();
            for question in &page.questions {
                match problem_metadata(question) {
                    Some(metadata) => fetch.problems.push(metadata),
                    None => fetch.unresolved += 1,
                }
            }

            skip += page_len as u64;
            tracing::debug!(skip, total = ?page.total, "Catalog page received");

            let reached_total = page.total.is_some_and(|total| skip >= total);
            if page_len < page_size as usize || reached_total {
                break;
            }
        }

        fetch.complete = true;
        fetch
    }

    /// First accepted submission per problem from the submission history
    ///
    /// Re-solves are ignored; the earliest acceptance is the solve time.
    ///
    /// Always returns a list; a failed page ends the walk early.
    pub async fn fetch_accepted_submissions(
        &self,
        cancel: &CancellationToken,
    ) -> Vec<AcceptedSubmission> {
        let limit = self.settings.submission_page_size;
        let mut earliest: HashMap<String, AcceptedSubmission> = HashMap::new();
        let mut offset: u64 = 0;
        let mut last_key: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Submission history walk cancelled");
                break;
            }

            self.page_pacer.wait().await;

            let variables = json!({ "offset": offset, "limit": limit, "lastKey": last_key });
            let data = match self.transport.execute(SUBMISSION_LIST_QUERY, variables).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(offset, error = %e, "Submission page failed, returning partial result");
                    break;
                }
            };

            let Some(list) = data.get("submissionList").filter(|l| l.is_object()) else {
                tracing::warn!(offset, "Submission page carried no list");
                break;
            };
            let submissions = list
                .get("submissions")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            if submissions.is_empty() {
                break;
            }

            for submission in &submissions {
                if let Some(accepted) = accepted_submission(submission) {
                    match earliest.get(&accepted.slug) {
                        Some(existing) if existing.solved_at <= accepted.solved_at => {}
                        _ => {
                            earliest.insert(accepted.slug.clone(), accepted);
                        }
                    }
                }
            }

            offset += submissions.len() as u64;
            last_key = list
                .get("lastKey")
                .and_then(Value::as_str)
                .map(str::to_string);

            let has_next = list.get("hasNext").and_then(Value::as_bool).unwrap_or(false);
            if !has_next {
                break;
            }
        }

        let mut accepted: Vec<AcceptedSubmission> = earliest.into_values().collect();
        accepted.sort_by(|a, b| b.solved_at.cmp(&a.solved_at).then_with(|| a.slug.cmp(&b.slug)));
        tracing::info!(count = accepted.len(), "Submission history walk finished");
        accepted
    }

    async fn fetch_question_page(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<QuestionPage, FetchError> {
        let data = self.transport.execute(query, variables).await?;
        let list = data
            .get("problemsetQuestionList")
            .filter(|l| l.is_object())
            .ok_or_else(|| FetchError::Malformed("missing problemsetQuestionList".to_string()))?;

        let questions = match list.get("questions") {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(FetchError::Malformed("questions is not a list".to_string())),
        };
        let total = list
            .get("total")
            .or_else(|| list.get("totalNum"))
            .and_then(Value::as_u64);

        Ok(QuestionPage { total, questions })
    }
}

/// Metadata for one catalog record; `None` when no slug resolves
fn problem_metadata(question: &Value) -> Option<ProblemMetadata> {
    let slug = resolve_slug(question).ok()?.slug;

    let title = question
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or(slug.as_str())
        .to_string();
    let difficulty = question
        .get("difficulty")
        .and_then(Value::as_str)
        .and_then(|d| d.parse::<Difficulty>().ok());
    let topics: BTreeSet<String> = question
        .get("topicTags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag.get("slug").and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let acceptance_rate = question
        .get("acRate")
        .and_then(Value::as_f64)
        .filter(|rate| (0.0..=100.0).contains(rate));

    Some(ProblemMetadata {
        slug,
        title,
        difficulty,
        topics,
        acceptance_rate,
    })
}

/// Accepted submission from one history entry
fn accepted_submission(submission: &Value) -> Option<AcceptedSubmission> {
    if submission.get("statusDisplay").and_then(Value::as_str) != Some("Accepted") {
        return None;
    }
    let slug = resolve_slug(submission).ok()?.slug;
    let solved_at = submission.get("timestamp").and_then(parse_timestamp)?;
    let title = submission
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Some(AcceptedSubmission {
        slug,
        title,
        solved_at,
    })
}

/// Epoch seconds, sent either as a number or a numeric string
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let seconds = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp(seconds, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let settings = ClientSettings::from(&SourceConfig {
            page_size: 0,
            page_delay_ms: 250,
            ..Default::default()
        });
        assert_eq!(settings.page_size, 1);
        assert_eq!(settings.page_delay, Duration::from_millis(250));
        assert_eq!(settings.retry.max_retries, 5);
    }

    #[test]
    fn test_problem_metadata_parsing() {
        let question = json!({
            "title": "Two Sum",
            "titleSlug": "two-sum",
            "acRate": 51.2,
            "difficulty": "Easy",
            "topicTags": [{"name": "Array", "slug": "array"}, {"name": "Hash Table", "slug": "hash-table"}]
        });
        let metadata = problem_metadata(&question).unwrap();
        assert_eq!(metadata.slug, "two-sum");
        assert_eq!(metadata.title, "Two Sum");
        assert_eq!(metadata.difficulty, Some(Difficulty::Easy));
        assert_eq!(metadata.topics.len(), 2);
        assert_eq!(metadata.acceptance_rate, Some(51.2));

        assert!(problem_metadata(&json!({"title": "No Slug"})).is_none());
    }

    #[test]
    fn test_accepted_submission_filters_status() {
        let accepted = json!({
            "title": "Two Sum", "titleSlug": "two-sum",
            "statusDisplay": "Accepted", "timestamp": "1700000000"
        });
        let rejected = json!({
            "title": "Two Sum", "titleSlug": "two-sum",
            "statusDisplay": "Wrong Answer", "timestamp": "1700000001"
        });

        let submission = accepted_submission(&accepted).unwrap();
        assert_eq!(submission.slug, "two-sum");
        assert_eq!(submission.solved_at.timestamp(), 1_700_000_000);
        assert!(accepted_submission(&rejected).is_none());
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert_eq!(parse_timestamp(&json!(10)).map(|t| t.timestamp()), Some(10));
        assert_eq!(parse_timestamp(&json!("42")).map(|t| t.timestamp()), Some(42));
        assert!(parse_timestamp(&json!("soon")).is_none());
    }
}
