//! Company aggregate endpoint
//!
//! GET /api/companies/top?limit=

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use cprep_common::db::problems::top_companies;
use cprep_common::models::CompanyTotal;
use serde::Deserialize;

use crate::{ApiError, ApiResult, AppState};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub limit: Option<u32>,
}

/// GET /api/companies/top
pub async fn get_top_companies(
    State(state): State<AppState>,
    query: Result<Query<TopQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<CompanyTotal>>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    Ok(Json(top_companies(&state.db, limit).await?))
}

pub fn company_routes() -> Router<AppState> {
    Router::new().route("/api/companies/top", get(get_top_companies))
}
