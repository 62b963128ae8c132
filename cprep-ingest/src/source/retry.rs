//! Retrying transport
//!
//! Every source operation goes through [`RetryingTransport::execute`]:
//! transient failures (retryable HTTP statuses, timeouts, connection
//! errors) are retried with exponential backoff; anything else fails the
//! unit of work immediately.

use cprep_common::config::SourceConfig;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use super::transport::{Transport, TransportError};

/// Retry configuration, set once per client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before retry n is `backoff_base * 2^n`
    pub backoff_base: Duration,
    pub retry_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Backoff before the retry following `retries_used` earlier retries
    pub fn backoff_for(&self, retries_used: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(retries_used))
    }

    /// Upper bound on requests for one operation
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SourceConfig::default())
    }
}

impl From<&SourceConfig> for RetryPolicy {
    fn from(config: &SourceConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            retry_statuses: config.retry_statuses.clone(),
        }
    }
}

/// Failure of one fetch (one page, one slug)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Non-retryable HTTP status
    #[error("upstream returned HTTP {status}")]
    Status { status: u16, body: String },

    /// Non-transient transport failure
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Transient failures outlasted the retry budget
    #[error("gave up after {attempts} attempts (last: {last})")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    /// GraphQL `errors` array in an otherwise successful response
    #[error("upstream reported errors: {0}")]
    Api(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Transport wrapper applying a [`RetryPolicy`] and decoding GraphQL
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Run a GraphQL query, returning its `data` object
    pub async fn execute(&self, query: &str, variables: Value) -> Result<Value, FetchError> {
        let payload = json!({ "query": query, "variables": variables });
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let retry_reason = match self.inner.post(&payload).await {
                Ok(response) if (200..300).contains(&response.status) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "Request succeeded after retry");
                    }
                    return decode_graphql(&response.body);
                }
                Ok(response) if self.policy.is_retryable_status(response.status) => {
                    format!("HTTP {}", response.status)
                }
                Ok(response) => {
                    return Err(FetchError::Status {
                        status: response.status,
                        body: response.body,
                    });
                }
                Err(err) if err.is_transient() => err.to_string(),
                Err(err) => return Err(err.into()),
            };

            let retries_used = attempt - 1;
            if retries_used >= self.policy.max_retries {
                tracing::warn!(attempt, last = %retry_reason, "Retries exhausted");
                return Err(FetchError::RetriesExhausted {
                    attempts: attempt,
                    last: retry_reason,
                });
            }

            let backoff = self.policy.backoff_for(retries_used);
            tracing::warn!(
                attempt,
                reason = %retry_reason,
                backoff_ms = backoff.as_millis() as u64,
                "Transient upstream failure, will retry after backoff"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

/// Extract `data` from a GraphQL response body
fn decode_graphql(body: &str) -> Result<Value, FetchError> {
    let mut response: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    if let Some(errors) = response.get("errors").filter(|e| !e.is_null()) {
        return Err(FetchError::Api(errors.to_string()));
    }

    match response.get_mut("data").map(Value::take) {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(FetchError::Malformed("response carried no data".to_string())),
    }
}
