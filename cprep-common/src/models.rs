//! Domain models shared by ingestion and coaching
//!
//! `Problem` is the canonical per-slug document. Its `companies` and
//! `num_occur` fields are always derived from `by_company`; use
//! [`Problem::set_company_frequency`] rather than mutating the map directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Public problem URL prefix on the practice platform
pub const PROBLEM_URL_PREFIX: &str = "https://leetcode.com/problems/";

/// Problem difficulty as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    /// Case-insensitive parse ("easy", "EASY" and "Easy" are all accepted)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(Error::InvalidInput(format!("unknown difficulty '{}'", other))),
        }
    }
}

/// Canonical problem document, keyed by slug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Stable identifier taken from the platform URL path segment
    pub slug: String,
    /// Display title (catalog title when known, CSV name otherwise)
    pub title: String,
    /// Name as it appeared in the company CSV dumps
    pub problem_name: Option<String>,
    /// Link as it appeared in the company CSV dumps
    pub problem_link: Option<String>,
    /// Absent until catalog sync hydrates it
    pub difficulty: Option<Difficulty>,
    pub topics: BTreeSet<String>,
    /// Always equal to the key set of `by_company`
    pub companies: BTreeSet<String>,
    /// Company name -> times reported asked
    pub by_company: BTreeMap<String, u32>,
    /// Always equal to the sum of `by_company` values
    pub num_occur: u64,
    /// Acceptance rate percentage (0-100)
    pub acceptance_rate: Option<f64>,
    pub last_updated: DateTime<Utc>,
    /// Compare-and-set token, bumped on every write
    pub version: i64,
}

impl Problem {
    /// Create an empty problem document for a slug
    pub fn new(slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            title: slug.clone(),
            slug,
            problem_name: None,
            problem_link: None,
            difficulty: None,
            topics: BTreeSet::new(),
            companies: BTreeSet::new(),
            by_company: BTreeMap::new(),
            num_occur: 0,
            acceptance_rate: None,
            last_updated: Utc::now(),
            version: 1,
        }
    }

    /// Overwrite one company's frequency and re-derive the totals.
    ///
    /// Last write wins per company. Returns true if the map changed.
    pub fn set_company_frequency(&mut self, company: &str, count: u32) -> bool {
        let previous = self.by_company.insert(company.to_string(), count);
        self.recompute_derived();
        previous != Some(count)
    }

    /// Rebuild `companies` and `num_occur` from `by_company`
    pub fn recompute_derived(&mut self) {
        self.companies = self.by_company.keys().cloned().collect();
        self.num_occur = self.by_company.values().map(|&v| u64::from(v)).sum();
    }

    /// Frequency recorded for one company (0 when untagged)
    pub fn frequency_for(&self, company: &str) -> u32 {
        self.by_company.get(company).copied().unwrap_or(0)
    }

    /// Public URL of the problem
    pub fn link(&self) -> String {
        format!("{}{}/", PROBLEM_URL_PREFIX, self.slug)
    }
}

/// One validated row of a per-company frequency CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyFrequencyRecord {
    pub problem_name: String,
    /// Canonical problem URL
    pub problem_link: String,
    /// Slug resolved from `problem_link`
    pub slug: String,
    pub company: String,
    pub occurrence_count: u32,
}

/// Problem metadata pulled from the platform catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemMetadata {
    pub slug: String,
    pub title: String,
    pub difficulty: Option<Difficulty>,
    pub topics: BTreeSet<String>,
    pub acceptance_rate: Option<f64>,
}

/// One entry of a user's solved set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvedProblem {
    pub slug: String,
    pub title: Option<String>,
    pub solved_at: DateTime<Utc>,
}

/// Aggregate frequency for a company across all problems
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyTotal {
    pub name: String,
    /// Sum of the company's per-problem frequencies
    pub total_occurrences: i64,
    /// Number of problems tagged with the company
    pub problem_count: i64,
}
