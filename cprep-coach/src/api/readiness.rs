//! Readiness endpoint
//!
//! GET /api/users/:user/readiness

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::readiness::{readiness_for_user, ReadinessReport};
use crate::{ApiError, ApiResult, AppState};

/// GET /api/users/:user/readiness
///
/// A user with no solved problems still gets every scored company at the
/// floor; an empty store yields an empty list.
pub async fn get_readiness(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<Json<ReadinessReport>> {
    let user = user.trim();
    if user.is_empty() {
        return Err(ApiError::BadRequest("user must not be empty".to_string()));
    }

    let report = readiness_for_user(&state.db, user, &state.readiness).await?;
    Ok(Json(report))
}

pub fn readiness_routes() -> Router<AppState> {
    Router::new().route("/api/users/:user/readiness", get(get_readiness))
}
