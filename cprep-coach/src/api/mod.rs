//! HTTP API handlers for cprep-coach

pub mod companies;
pub mod health;
pub mod plan;
pub mod readiness;

pub use companies::company_routes;
pub use health::health_routes;
pub use plan::plan_routes;
pub use readiness::readiness_routes;
