//! Practice plan generator
//!
//! Problems are bucketed by topic and picked round-robin across buckets in
//! a shuffled topic order, so a plan spreads over as many topics as the
//! pool allows before any topic contributes twice.

use cprep_common::db::problems::find_by_company;
use cprep_common::db::solved::load_solved_slugs;
use cprep_common::{Difficulty, Problem};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// Display label of the bucket for problems that carry no topic tag
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Bucket key; untagged problems never share a bucket with a real tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TopicKey<'a> {
    Tagged(&'a str),
    Untagged,
}

impl<'a> TopicKey<'a> {
    fn label(self) -> &'a str {
        match self {
            TopicKey::Tagged(topic) => topic,
            TopicKey::Untagged => UNCATEGORIZED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub company: String,
    pub num: usize,
    /// Allowed difficulties; empty means all
    pub difficulties: BTreeSet<Difficulty>,
    pub include_solved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    pub slug: String,
    pub title: String,
    pub difficulty: Option<Difficulty>,
    pub topics: BTreeSet<String>,
    /// Topic bucket the problem was picked from
    pub topic: String,
    /// How often the company asked this problem
    pub frequency: u32,
    pub link: String,
    pub solved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticePlan {
    pub company: String,
    pub requested: usize,
    pub problems: Vec<PlanItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no problems available for {company} with the requested filters")]
    NoProblemsAvailable { company: String },

    #[error("plan size must be at least 1")]
    InvalidSize,
}

impl PlanRequest {
    fn admits(&self, problem: &Problem, solved: &HashSet<String>) -> bool {
        if !self.include_solved && solved.contains(&problem.slug) {
            return false;
        }
        if self.difficulties.is_empty() {
            return true;
        }
        problem
            .difficulty
            .is_some_and(|d| self.difficulties.contains(&d))
    }
}

/// Build a topic-diverse plan from a company's problem pool
pub fn generate_plan<R: Rng + ?Sized>(
    pool: &[Problem],
    solved: &HashSet<String>,
    request: &PlanRequest,
    rng: &mut R,
) -> Result<PracticePlan, PlanError> {
    if request.num == 0 {
        return Err(PlanError::InvalidSize);
    }

    let candidates: Vec<&Problem> = pool
        .iter()
        .filter(|p| request.admits(p, solved))
        .collect();
    if candidates.is_empty() {
        return Err(PlanError::NoProblemsAvailable {
            company: request.company.clone(),
        });
    }

    let mut buckets: BTreeMap<TopicKey, Vec<&Problem>> = BTreeMap::new();
    for &problem in &candidates {
        if problem.topics.is_empty() {
            buckets.entry(TopicKey::Untagged).or_default().push(problem);
        }
        for topic in &problem.topics {
            buckets.entry(TopicKey::Tagged(topic.as_str())).or_default().push(problem);
        }
    }
    for bucket in buckets.values_mut() {
        bucket.sort_by(|a, b| {
            b.frequency_for(&request.company)
                .cmp(&a.frequency_for(&request.company))
                .then_with(|| a.slug.cmp(&b.slug))
        });
    }

    let mut topics: Vec<TopicKey> = buckets.keys().copied().collect();
    topics.shuffle(rng);

    let mut cursors = vec![0usize; topics.len()];
    let mut picked: HashSet<&str> = HashSet::new();
    let mut items = Vec::with_capacity(request.num.min(candidates.len()));

    'rounds: loop {
        let mut progressed = false;

        for (index, topic) in topics.iter().enumerate() {
            let bucket = &buckets[topic];
            let cursor = &mut cursors[index];

            while *cursor < bucket.len() && picked.contains(bucket[*cursor].slug.as_str()) {
                *cursor += 1;
            }
            let Some(problem) = bucket.get(*cursor) else {
                continue;
            };
            *cursor += 1;

            picked.insert(problem.slug.as_str());
            items.push(plan_item(problem, topic.label(), request, solved));
            progressed = true;

            if items.len() == request.num {
                break 'rounds;
            }
        }

        if !progressed {
            break;
        }
    }

    Ok(PracticePlan {
        company: request.company.clone(),
        requested: request.num,
        problems: items,
    })
}

fn plan_item(problem: &Problem, topic: &str, request: &PlanRequest, solved: &HashSet<String>) -> PlanItem {
    PlanItem {
        slug: problem.slug.clone(),
        title: problem.title.clone(),
        difficulty: problem.difficulty,
        topics: problem.topics.clone(),
        topic: topic.to_string(),
        frequency: problem.frequency_for(&request.company),
        link: problem.link(),
        solved: solved.contains(&problem.slug),
    }
}

/// Load the company pool and the user's solved set, then build the plan
pub async fn plan_for_company<R: Rng + ?Sized>(
    pool: &SqlitePool,
    user_id: &str,
    request: &PlanRequest,
    rng: &mut R,
) -> Result<PracticePlan, crate::ApiError> {
    let problems = find_by_company(pool, &request.company).await?;
    let solved = load_solved_slugs(pool, user_id).await?;

    let plan = generate_plan(&problems, &solved, request, rng)?;
    tracing::debug!(
        company = %request.company,
        pool = problems.len(),
        planned = plan.problems.len(),
        "Practice plan generated"
    );
    Ok(plan)
}
