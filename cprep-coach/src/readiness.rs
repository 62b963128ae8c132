//! Readiness engine
//!
//! Scores each company by how much of its core set (the `target` most
//! frequent problems) a user has solved, mapped through a clamped bucket
//! so the figure never reads 0% and never claims full mastery.

use cprep_common::config::ReadinessConfig;
use cprep_common::db::problems::find_with_companies;
use cprep_common::db::solved::load_solved_slugs;
use cprep_common::{Problem, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

/// Scoring constants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessParams {
    pub target: usize,
    pub frequency_cap: u64,
    pub floor: u32,
    pub ceiling: u32,
    pub top_k: usize,
}

impl From<&ReadinessConfig> for ReadinessParams {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            target: config.target,
            frequency_cap: config.frequency_cap,
            floor: config.floor,
            ceiling: config.ceiling,
            top_k: config.top_k,
        }
    }
}

impl Default for ReadinessParams {
    fn default() -> Self {
        Self::from(&ReadinessConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyReadiness {
    pub name: String,
    /// Core-set problems the user has solved
    pub common_problems: usize,
    pub readiness: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    pub user: String,
    pub companies: Vec<CompanyReadiness>,
}

/// `round(100 * solved / target)` (half up), clamped to `[floor, ceiling]`
///
/// A ceiling below the floor is raised to the floor.
pub fn readiness_bucket(solved_count: usize, params: &ReadinessParams) -> u32 {
    if params.target == 0 {
        return params.floor;
    }
    let solved = solved_count.min(params.target) as u64;
    let target = params.target as u64;
    let raw = (200 * solved + target) / (2 * target);

    (raw as u32).clamp(params.floor, params.ceiling.max(params.floor))
}

/// Score every company present in `problems`, best first, at most `top_k`
///
/// Companies whose capped weights sum to zero are left out.
pub fn compute_readiness(
    problems: &[Problem],
    solved: &HashSet<String>,
    params: &ReadinessParams,
) -> Vec<CompanyReadiness> {
    let mut by_company: BTreeMap<&str, Vec<(u64, &str)>> = BTreeMap::new();
    for problem in problems {
        let weight = problem.num_occur.min(params.frequency_cap);
        for company in &problem.companies {
            by_company
                .entry(company.as_str())
                .or_default()
                .push((weight, problem.slug.as_str()));
        }
    }

    let mut scores: Vec<CompanyReadiness> = by_company
        .into_iter()
        .filter_map(|(company, mut weighted)| {
            let weighted_total: u64 = weighted.iter().map(|(w, _)| w).sum();
            if weighted_total == 0 {
                return None;
            }

            weighted.sort_by_key(|&(weight, slug)| (Reverse(weight), slug));
            let solved_count = weighted
                .iter()
                .take(params.target)
                .filter(|(_, slug)| solved.contains(*slug))
                .count();

            Some(CompanyReadiness {
                name: company.to_string(),
                common_problems: solved_count,
                readiness: readiness_bucket(solved_count, params),
            })
        })
        .collect();

    scores.sort_by(|a, b| {
        b.readiness
            .cmp(&a.readiness)
            .then_with(|| b.common_problems.cmp(&a.common_problems))
            .then_with(|| a.name.cmp(&b.name))
    });
    scores.truncate(params.top_k);
    scores
}

/// Readiness report for one user from the stored problems and solved set
pub async fn readiness_for_user(
    pool: &SqlitePool,
    user_id: &str,
    params: &ReadinessParams,
) -> Result<ReadinessReport> {
    let problems = find_with_companies(pool).await?;
    let solved = load_solved_slugs(pool, user_id).await?;

    let companies = compute_readiness(&problems, &solved, params);
    tracing::debug!(user = %user_id, solved = solved.len(), companies = companies.len(), "Readiness computed");

    Ok(ReadinessReport {
        user: user_id.to_string(),
        companies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(slug: &str, companies: &[(&str, u32)]) -> Problem {
        let mut p = Problem::new(slug);
        for (company, count) in companies {
            p.set_company_frequency(company, *count);
        }
        p
    }

    fn solved(slugs: &[&str]) -> HashSet<String> {
        slugs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bucket_example() {
        let params = ReadinessParams::default();
        assert_eq!(readiness_bucket(36, &params), 30);
    }

    #[test]
    fn test_bucket_bounds() {
        let params = ReadinessParams::default();
        assert_eq!(readiness_bucket(0, &params), 15);
        assert_eq!(readiness_bucket(1, &params), 15);
        assert_eq!(readiness_bucket(120, &params), 92);
        assert_eq!(readiness_bucket(500, &params), 92);
    }

    #[test]
    fn test_bucket_inverted_bounds_pin_to_floor() {
        let params = ReadinessParams {
            floor: 50,
            ceiling: 20,
            ..ReadinessParams::default()
        };
        assert_eq!(readiness_bucket(0, &params), 50);
        assert_eq!(readiness_bucket(120, &params), 50);
    }

    #[test]
    fn test_bucket_rounds_half_up() {
        let params = ReadinessParams {
            target: 8,
            floor: 0,
            ceiling: 100,
            ..ReadinessParams::default()
        };
        // 100 * 1 / 8 = 12.5
        assert_eq!(readiness_bucket(1, &params), 13);
        // 100 * 3 / 8 = 37.5
        assert_eq!(readiness_bucket(3, &params), 38);
    }

    #[test]
    fn test_bucket_monotonic() {
        let params = ReadinessParams::default();
        let mut previous = 0;
        for solved in 0..=150 {
            let bucket = readiness_bucket(solved, &params);
            assert!(bucket >= previous, "bucket dropped at {}", solved);
            assert!((15..=92).contains(&bucket));
            previous = bucket;
        }
    }

    #[test]
    fn test_core_set_limits_scoring() {
        // 130 problems for Acme; only the 120 heaviest count
        let mut problems = Vec::new();
        for i in 0..120 {
            problems.push(problem(&format!("core-{:03}", i), &[("Acme", 10)]));
        }
        for i in 0..10 {
            problems.push(problem(&format!("tail-{:03}", i), &[("Acme", 1)]));
        }
        let mut user: Vec<String> = (0..36).map(|i| format!("core-{:03}", i)).collect();
        user.extend((0..10).map(|i| format!("tail-{:03}", i)));
        let solved: HashSet<String> = user.into_iter().collect();

        let scores = compute_readiness(&problems, &solved, &ReadinessParams::default());

        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].name, "Acme");
        assert_eq!(scores[0].common_problems, 36);
        assert_eq!(scores[0].readiness, 30);
    }

    #[test]
    fn test_weight_is_capped() {
        let params = ReadinessParams {
            target: 1,
            ..ReadinessParams::default()
        };
        // Both weigh 15 after the cap; slug order breaks the tie
        let problems = vec![
            problem("b-viral", &[("Acme", 500)]),
            problem("a-common", &[("Acme", 15)]),
        ];

        let scores = compute_readiness(&problems, &solved(&["a-common"]), &params);
        assert_eq!(scores[0].common_problems, 1);
    }

    #[test]
    fn test_zero_weight_company_excluded() {
        let problems = vec![
            problem("two-sum", &[("Ghost", 0)]),
            problem("lru-cache", &[("Acme", 3)]),
        ];

        let scores = compute_readiness(&problems, &solved(&[]), &ReadinessParams::default());

        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].name, "Acme");
        assert_eq!(scores[0].readiness, 15);
    }

    #[test]
    fn test_no_problems_no_companies() {
        let scores = compute_readiness(&[], &solved(&["two-sum"]), &ReadinessParams::default());
        assert!(scores.is_empty());
    }

    #[test]
    fn test_ranking_and_top_k() {
        let params = ReadinessParams {
            target: 4,
            top_k: 2,
            ..ReadinessParams::default()
        };
        let problems = vec![
            problem("p1", &[("Alpha", 5), ("Beta", 5), ("Gamma", 5)]),
            problem("p2", &[("Alpha", 5), ("Beta", 5)]),
            problem("p3", &[("Alpha", 5)]),
        ];

        // Alpha 3/4 -> 75, Beta 2/4 -> 50, Gamma 1/4 -> 25
        let scores = compute_readiness(&problems, &solved(&["p1", "p2", "p3"]), &params);

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].name, "Alpha");
        assert_eq!(scores[0].readiness, 75);
        assert_eq!(scores[1].name, "Beta");
        assert_eq!(scores[1].readiness, 50);
    }

    #[test]
    fn test_ties_break_on_common_problems_then_name() {
        // Both clamp to the floor; Beta has more solved
        let problems = vec![
            problem("p1", &[("Alpha", 5), ("Beta", 5)]),
            problem("p2", &[("Beta", 5)]),
            problem("p3", &[("Cobalt", 5)]),
        ];

        let scores =
            compute_readiness(&problems, &solved(&["p1", "p2"]), &ReadinessParams::default());

        let names: Vec<&str> = scores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Beta", "Alpha", "Cobalt"]);
        assert!(scores.iter().all(|s| s.readiness == 15));
    }
}
