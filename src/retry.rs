//! Bounded retry for transient storage failures.
//!
//! Write operations retry a fixed number of times with a fixed delay; the
//! loop is never unbounded and non-retryable errors (crypto, serialization)
//! fail immediately.

use std::future::Future;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::Result;

/// Execute an async operation with bounded fixed-delay retries.
///
/// Returns the first success, or the last error once all attempts are
/// exhausted. Errors for which [`Error::is_retryable`](crate::Error::is_retryable)
/// is false are returned immediately.
pub(crate) async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_retryable() || attempt >= max_attempts {
                    return Err(e);
                }

                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    operation_name, attempt, max_attempts, policy.delay, e
                );
                attempt += 1;
                sleep(policy.delay).await;
            }
        }
    }
}
