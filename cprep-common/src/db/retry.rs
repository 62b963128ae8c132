//! Retry logic for contended writes
//!
//! Problem upserts are compare-and-set on the row `version`. A lost race
//! surfaces as [`Error::Conflict`]; SQLite writer contention surfaces as a
//! "database is locked" error. Both are retried with exponential backoff.

use std::time::Duration;

use crate::{Error, Result};

const INITIAL_BACKOFF_MS: u64 = 5;
const MAX_BACKOFF_MS: u64 = 200;

/// Retry an operation while it fails with write contention.
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. If contention (conflict or "database is locked"):
///    a. If attempts < max_attempts: log WARN, backoff, retry
///    b. Otherwise: log ERROR, return `Error::Conflict`
/// 4. If other error: return error immediately (no retry)
///
/// **Backoff Strategy:** 5ms initial, doubling, capped at 200ms
pub async fn retry_on_conflict<F, Fut, T>(
    operation_name: &str,
    max_attempts: u32,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Write succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if is_contention(&err) => {
                if attempt >= max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Write failed: contention retries exhausted"
                    );
                    return Err(Error::Conflict(format!(
                        "{} still contended after {} attempts: {}",
                        operation_name, attempt, err
                    )));
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    error = %err,
                    "Write contended, will retry after backoff"
                );

                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_contention(err: &Error) -> bool {
    match err {
        Error::Conflict(_) => true,
        Error::Database(db_err) => db_err.to_string().contains("database is locked"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let result = retry_on_conflict("test_op", 5, || async { Ok::<i32, Error>(42) }).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_conflicts() {
        let mut attempts = 0;

        let result = retry_on_conflict("test_op", 5, || {
            attempts += 1;
            let current = attempts;
            async move {
                if current < 3 {
                    Err(Error::Conflict("version moved".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let mut attempts = 0;

        let result = retry_on_conflict("test_op", 4, || {
            attempts += 1;
            async { Err::<i32, Error>(Error::Conflict("version moved".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(Error::Conflict(_))));
        assert_eq!(attempts, 4);
    }

    #[tokio::test]
    async fn test_non_contention_error_fails_immediately() {
        let mut attempts = 0;

        let result = retry_on_conflict("test_op", 5, || {
            attempts += 1;
            async { Err::<i32, Error>(Error::InvalidInput("other error".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(attempts, 1);
    }
}
