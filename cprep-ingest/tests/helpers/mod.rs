//! Test Helper Utilities
//!
//! Scripted transport and canned platform responses for cprep-ingest tests

#![allow(dead_code)]

use async_trait::async_trait;
use cprep_ingest::source::{ClientSettings, RetryPolicy, SourceClient};
use cprep_ingest::source::{Transport, TransportError, TransportResponse};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

type Outcome = Result<TransportResponse, TransportError>;

/// Replays a fixed sequence of outcomes and records every payload sent
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Outcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// `variables` of every request, in order
    pub fn variables(&self) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|payload| payload["variables"].clone())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, payload: &Value) -> Outcome {
        self.requests.lock().unwrap().push(payload.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("script exhausted".to_string())))
    }
}

/// Settings with no pacing or backoff delays
pub fn fast_settings(page_size: u32) -> ClientSettings {
    ClientSettings {
        page_size,
        submission_page_size: 20,
        page_delay: Duration::ZERO,
        title_delay: Duration::ZERO,
        retry: RetryPolicy {
            max_retries: 5,
            backoff_base: Duration::ZERO,
            retry_statuses: vec![429, 500, 502, 503, 504],
        },
    }
}

pub fn scripted_client(page_size: u32, script: Vec<Outcome>) -> SourceClient<ScriptedTransport> {
    SourceClient::new(ScriptedTransport::new(script), fast_settings(page_size))
}

pub fn ok(body: Value) -> Outcome {
    Ok(TransportResponse {
        status: 200,
        body: body.to_string(),
    })
}

pub fn status(code: u16) -> Outcome {
    Ok(TransportResponse {
        status: code,
        body: format!("HTTP {}", code),
    })
}

/// Accepted-slug page with `count` slugs numbered from `start`
pub fn slug_page(start: usize, count: usize) -> Outcome {
    let questions: Vec<Value> = (start..start + count)
        .map(|i| json!({ "titleSlug": format!("problem-{}", i) }))
        .collect();
    ok(json!({
        "data": { "problemsetQuestionList": { "total": null, "questions": questions } }
    }))
}

/// Catalog page from (slug, title, difficulty, comma-separated topic slugs)
pub fn catalog_page(total: u64, questions: &[(&str, &str, &str, &str)]) -> Outcome {
    let questions: Vec<Value> = questions
        .iter()
        .map(|(slug, title, difficulty, topics)| {
            let tags: Vec<Value> = topics
                .split(',')
                .filter(|t| !t.is_empty())
                .map(|t| json!({ "name": t, "slug": t }))
                .collect();
            json!({
                "title": title,
                "titleSlug": slug,
                "acRate": 50.0,
                "difficulty": difficulty,
                "topicTags": tags,
            })
        })
        .collect();
    ok(json!({
        "data": { "problemsetQuestionList": { "total": total, "questions": questions } }
    }))
}

pub fn title_response(slug: &str, title: &str) -> Outcome {
    ok(json!({ "data": { "question": { "title": title, "titleSlug": slug } } }))
}

/// Submission page from (slug, status, epoch seconds)
pub fn submission_page(has_next: bool, last_key: Option<&str>, items: &[(&str, &str, i64)]) -> Outcome {
    let submissions: Vec<Value> = items
        .iter()
        .map(|(slug, status, ts)| {
            json!({
                "title": slug.replace('-', " "),
                "titleSlug": slug,
                "statusDisplay": status,
                "timestamp": ts.to_string(),
            })
        })
        .collect();
    ok(json!({
        "data": {
            "submissionList": { "hasNext": has_next, "lastKey": last_key, "submissions": submissions }
        }
    }))
}
