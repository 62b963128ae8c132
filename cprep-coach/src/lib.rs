//! cprep-coach library interface
//!
//! Readiness scoring and practice plans over the canonical problem store,
//! served over HTTP.

pub mod api;
pub mod error;
pub mod plan;
pub mod readiness;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use cprep_common::config::TomlConfig;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::readiness::ReadinessParams;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Scoring constants resolved from `config.readiness`
    pub readiness: ReadinessParams,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &TomlConfig) -> Self {
        Self {
            db,
            readiness: ReadinessParams::from(&config.readiness),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::readiness_routes())
        .merge(api::plan_routes())
        .merge(api::company_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
