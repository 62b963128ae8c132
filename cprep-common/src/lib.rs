//! # cprep Common Library
//!
//! Shared code for the cprep ingestion and coaching services:
//! - Error type and result alias
//! - Configuration loading and root folder resolution
//! - Canonical problem and solved-set persistence
//! - Domain models (problems, difficulty, frequency records)

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{CompanyFrequencyRecord, Difficulty, Problem, ProblemMetadata};
