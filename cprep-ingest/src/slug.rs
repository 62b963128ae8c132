//! Slug resolution for heterogeneous upstream records
//!
//! Records arrive in several shapes (current API payloads, legacy
//! documents, CSV-derived documents keyed by link). Each [`SlugRule`] is
//! a predicate + extractor; [`resolve_slug`] applies them in
//! [`SlugRule::CHAIN`] order and returns the first match.

use serde_json::{Map, Value};
use thiserror::Error;

/// Fields that may carry a problem URL
const LINK_FIELDS: [&str; 4] = ["link", "url", "problem_link", "URL"];

/// URL path marker preceding the slug
const PROBLEMS_SEGMENT: &str = "/problems/";

/// One step of the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugRule {
    /// Non-empty `slug` string field
    ExplicitSlug,
    /// Non-empty `titleSlug` string field
    LegacyTitleSlug,
    /// `_id` primary key, when it is a non-empty string
    PrimaryKey,
    /// `.../problems/<slug>/` parsed from a link field
    ProblemLink,
}

impl SlugRule {
    /// Resolution order
    pub const CHAIN: [SlugRule; 4] = [
        SlugRule::ExplicitSlug,
        SlugRule::LegacyTitleSlug,
        SlugRule::PrimaryKey,
        SlugRule::ProblemLink,
    ];

    /// Apply this rule to a record
    pub fn extract(self, record: &Map<String, Value>) -> Option<String> {
        match self {
            SlugRule::ExplicitSlug => non_empty_str(record.get("slug")),
            SlugRule::LegacyTitleSlug => non_empty_str(record.get("titleSlug")),
            SlugRule::PrimaryKey => non_empty_str(record.get("_id")),
            SlugRule::ProblemLink => LINK_FIELDS
                .iter()
                .filter_map(|field| record.get(*field).and_then(Value::as_str))
                .find_map(slug_from_link),
        }
    }
}

/// Successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSlug {
    pub slug: String,
    /// Rule that produced the slug
    pub rule: SlugRule,
}

/// Resolution failure; the caller must skip the record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlugResolutionError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("no slug found in record")]
    Unresolvable,
}

/// Resolve the canonical slug of a record
pub fn resolve_slug(record: &Value) -> Result<ResolvedSlug, SlugResolutionError> {
    let object = record.as_object().ok_or(SlugResolutionError::NotAnObject)?;

    SlugRule::CHAIN
        .iter()
        .find_map(|rule| {
            rule.extract(object).map(|slug| ResolvedSlug { slug, rule: *rule })
        })
        .ok_or(SlugResolutionError::Unresolvable)
}

/// Extract `<slug>` from `.../problems/<slug>/...`
pub fn slug_from_link(link: &str) -> Option<String> {
    let start = link.find(PROBLEMS_SEGMENT)? + PROBLEMS_SEGMENT.len();
    let segment = link[start..]
        .split(|c: char| c == '/' || c == '?' || c == '#')
        .next()?
        .trim();

    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

/// Slug from a CSV link column, which may hold a URL or a bare slug
pub fn slug_from_link_or_bare(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Some(slug) = slug_from_link(raw) {
        return Some(slug);
    }
    if is_bare_slug(raw) {
        return Some(raw.to_string());
    }
    None
}

/// Lowercase letters, digits and hyphens only
fn is_bare_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
