//! HTTP API integration tests

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use cprep_coach::{build_router, AppState};
use cprep_common::config::TomlConfig;
use cprep_common::db::init_memory_pool;
use cprep_common::db::problems::{merge_company_frequency, upsert_metadata};
use cprep_common::db::solved::record_solved;
use cprep_common::{CompanyFrequencyRecord, Difficulty, ProblemMetadata};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

async fn seed_problem(
    pool: &SqlitePool,
    slug: &str,
    difficulty: Difficulty,
    topics: &[&str],
    companies: &[(&str, u32)],
) {
    upsert_metadata(
        pool,
        &ProblemMetadata {
            slug: slug.to_string(),
            title: slug.replace('-', " "),
            difficulty: Some(difficulty),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            acceptance_rate: Some(50.0),
        },
    )
    .await
    .unwrap();

    for (company, count) in companies {
        let record = CompanyFrequencyRecord {
            problem_name: slug.replace('-', " "),
            problem_link: format!("https://leetcode.com/problems/{}/", slug),
            slug: slug.to_string(),
            company: company.to_string(),
            occurrence_count: *count,
        };
        merge_company_frequency(pool, &record, 5).await.unwrap();
    }
}

/// Acme: 4 problems over 3 topics; Goldman Sachs: 1 problem
async fn test_app_state() -> AppState {
    let pool = init_memory_pool().await.unwrap();

    seed_problem(&pool, "two-sum", Difficulty::Easy, &["array"], &[("Acme", 10), ("Goldman Sachs", 3)]).await;
    seed_problem(&pool, "lru-cache", Difficulty::Medium, &["design"], &[("Acme", 8)]).await;
    seed_problem(&pool, "word-ladder", Difficulty::Hard, &["graph"], &[("Acme", 6)]).await;
    seed_problem(&pool, "three-sum", Difficulty::Medium, &["array"], &[("Acme", 4)]).await;

    record_solved(&pool, "alice", "two-sum", Some("Two Sum"), Utc::now())
        .await
        .unwrap();

    AppState::new(pool, &TomlConfig::default())
}

async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_reports_ok() {
    let (status, body) = get(test_app_state().await, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "cprep-coach");
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_readiness_for_user() {
    let (status, body) = get(test_app_state().await, "/api/users/alice/readiness").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "alice");

    let companies = body["companies"].as_array().unwrap();
    assert_eq!(companies.len(), 2);
    for company in companies {
        assert_eq!(company["commonProblems"], 1);
        assert_eq!(company["readiness"], 15);
    }
    // Equal scores fall back to name order
    assert_eq!(companies[0]["name"], "Acme");
    assert_eq!(companies[1]["name"], "Goldman Sachs");
}

#[tokio::test]
async fn test_readiness_unknown_user_sits_at_floor() {
    let (status, body) = get(test_app_state().await, "/api/users/nobody/readiness").await;

    assert_eq!(status, StatusCode::OK);
    let companies = body["companies"].as_array().unwrap();
    assert!(companies
        .iter()
        .all(|c| c["readiness"] == 15 && c["commonProblems"] == 0));
}

#[tokio::test]
async fn test_readiness_empty_store_is_empty_list() {
    let state = AppState::new(init_memory_pool().await.unwrap(), &TomlConfig::default());
    let (status, body) = get(state, "/api/users/alice/readiness").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["companies"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_plan_excludes_solved_and_spreads_topics() {
    let (status, body) = get(test_app_state().await, "/api/companies/Acme/plan?user=alice&num=3").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["company"], "Acme");
    assert_eq!(body["requested"], 3);

    let problems = body["problems"].as_array().unwrap();
    assert_eq!(problems.len(), 3);
    assert!(problems.iter().all(|p| p["slug"] != "two-sum"));
    assert!(problems.iter().all(|p| p["solved"] == false));

    let mut topics: Vec<&str> = problems.iter().map(|p| p["topic"].as_str().unwrap()).collect();
    topics.sort();
    assert_eq!(topics, vec!["array", "design", "graph"]);
}

#[tokio::test]
async fn test_plan_include_solved_and_difficulty_filter() {
    let (status, body) = get(
        test_app_state().await,
        "/api/companies/Acme/plan?user=alice&difficulty=Easy&include_solved=true",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let problems = body["problems"].as_array().unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0]["slug"], "two-sum");
    assert_eq!(problems[0]["solved"], true);
    assert_eq!(problems[0]["difficulty"], "Easy");
}

#[tokio::test]
async fn test_plan_company_with_spaces() {
    let (status, body) = get(test_app_state().await, "/api/companies/Goldman%20Sachs/plan?user=bob&num=5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["company"], "Goldman Sachs");
    assert_eq!(body["problems"].as_array().unwrap().len(), 1);
    assert_eq!(body["problems"][0]["frequency"], 3);
}

#[tokio::test]
async fn test_plan_nothing_left_is_not_found() {
    let (status, body) = get(test_app_state().await, "/api/companies/Goldman%20Sachs/plan?user=alice").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NO_PROBLEMS");
}

#[tokio::test]
async fn test_plan_unknown_company_is_not_found() {
    let (status, body) = get(test_app_state().await, "/api/companies/Initech/plan?user=alice").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NO_PROBLEMS");
}

#[tokio::test]
async fn test_plan_rejects_bad_parameters() {
    let (status, body) = get(test_app_state().await, "/api/companies/Acme/plan?user=alice&difficulty=Extreme").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = get(test_app_state().await, "/api/companies/Acme/plan?user=alice&num=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(test_app_state().await, "/api/companies/Acme/plan?user=alice&num=1000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plan_requires_user() {
    let (status, body) = get(test_app_state().await, "/api/companies/Acme/plan?num=10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = get(test_app_state().await, "/api/companies/Acme/plan?user=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_query_uses_error_body() {
    let (status, body) = get(test_app_state().await, "/api/companies/Acme/plan?user=alice&num=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].is_string());

    let (status, body) = get(test_app_state().await, "/api/companies/top?limit=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_top_companies() {
    let (status, body) = get(test_app_state().await, "/api/companies/top?limit=5").await;

    assert_eq!(status, StatusCode::OK);
    let companies = body.as_array().unwrap();
    assert_eq!(companies.len(), 2);
    assert_eq!(companies[0]["name"], "Acme");
    assert_eq!(companies[0]["totalOccurrences"], 28);
    assert_eq!(companies[0]["problemCount"], 4);
    assert_eq!(companies[1]["name"], "Goldman Sachs");

    let (status, _) = get(test_app_state().await, "/api/companies/top?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
