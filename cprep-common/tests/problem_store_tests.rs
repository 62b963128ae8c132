//! Problem store integration tests against a file-backed database
//!
//! Exercises the compare-and-set merge under concurrent writers touching
//! the same slug for different companies.

use cprep_common::db::{init_database_pool, problems};
use cprep_common::CompanyFrequencyRecord;

fn record(company: &str, count: u32) -> CompanyFrequencyRecord {
    CompanyFrequencyRecord {
        problem_name: "Two Sum".to_string(),
        problem_link: "https://leetcode.com/problems/two-sum/".to_string(),
        slug: "two-sum".to_string(),
        company: company.to_string(),
        occurrence_count: count,
    }
}

#[tokio::test]
async fn test_concurrent_merges_do_not_lose_updates() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database_pool(&dir.path().join("cprep.db")).await.unwrap();

    let companies = ["Google", "Amazon", "Meta", "Apple"];
    let mut handles = Vec::new();
    for (i, company) in companies.iter().enumerate() {
        let pool = pool.clone();
        let record = record(company, (i as u32 + 1) * 10);
        handles.push(tokio::spawn(async move {
            problems::merge_company_frequency(&pool, &record, 20).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let problem = problems::load_problem(&pool, "two-sum").await.unwrap().unwrap();
    assert_eq!(problem.by_company.len(), 4);
    assert_eq!(problem.num_occur, 10 + 20 + 30 + 40);
    assert_eq!(
        problem.companies,
        problem.by_company.keys().cloned().collect()
    );
}

#[tokio::test]
async fn test_schema_init_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cprep.db");

    let pool = init_database_pool(&path).await.unwrap();
    problems::merge_company_frequency(&pool, &record("Google", 3), 3)
        .await
        .unwrap();
    drop(pool);

    let reopened = init_database_pool(&path).await.unwrap();
    let problem = problems::load_problem(&reopened, "two-sum").await.unwrap().unwrap();
    assert_eq!(problem.frequency_for("Google"), 3);
}
