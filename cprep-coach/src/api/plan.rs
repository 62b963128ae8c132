//! Practice plan endpoint
//!
//! GET /api/companies/:company/plan?user=&num=&difficulty=&include_solved=

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use cprep_common::Difficulty;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::plan::{plan_for_company, PlanRequest, PracticePlan};
use crate::{ApiError, ApiResult, AppState};

/// Plan size when `num` is omitted
pub const DEFAULT_PLAN_SIZE: usize = 10;
/// Largest plan served in one request
pub const MAX_PLAN_SIZE: usize = 200;

#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    /// Whose solved set filters the plan; required
    pub user: Option<String>,
    pub num: Option<usize>,
    /// Comma-separated difficulties, e.g. `Easy,Medium`
    pub difficulty: Option<String>,
    #[serde(default)]
    pub include_solved: bool,
}

/// Parse `Easy,Medium`; blank entries are ignored
pub fn parse_difficulties(raw: Option<&str>) -> cprep_common::Result<BTreeSet<Difficulty>> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::parse::<Difficulty>)
        .collect()
}

/// GET /api/companies/:company/plan
pub async fn get_plan(
    State(state): State<AppState>,
    Path(company): Path<String>,
    query: Result<Query<PlanQuery>, QueryRejection>,
) -> ApiResult<Json<PracticePlan>> {
    let Query(query) = query?;

    let company = company.trim();
    if company.is_empty() {
        return Err(ApiError::BadRequest("company must not be empty".to_string()));
    }
    let user = query
        .user
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("user is required".to_string()))?;

    let num = query.num.unwrap_or(DEFAULT_PLAN_SIZE);
    if num > MAX_PLAN_SIZE {
        return Err(ApiError::BadRequest(format!(
            "num must be at most {}",
            MAX_PLAN_SIZE
        )));
    }

    let request = PlanRequest {
        company: company.to_string(),
        num,
        difficulties: parse_difficulties(query.difficulty.as_deref())?,
        include_solved: query.include_solved,
    };
    let mut rng = StdRng::from_entropy();
    let plan = plan_for_company(&state.db, user, &request, &mut rng).await?;
    Ok(Json(plan))
}

pub fn plan_routes() -> Router<AppState> {
    Router::new().route("/api/companies/:company/plan", get(get_plan))
}
