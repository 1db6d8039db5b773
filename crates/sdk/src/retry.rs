//! Retry executor for calls against the management API.

use crate::config::RetryPolicy;
use crate::error::{classify, ClassifiedError, UpstreamError};
use std::future::Future;
use tracing::{debug, warn};

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` attempts have been made.
///
/// Each failure goes through [`classify`]; only the `retryable` flag is
/// consulted here. On exhaustion the last classified error is returned.
/// There is no external cancellation: the loop ends on its own.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, ClassifiedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let max_attempts = policy.effective_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Request succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => classify(error),
        };

        if !error.retryable || attempt >= max_attempts {
            if attempt > 1 || error.retryable {
                warn!(
                    attempt,
                    max_attempts,
                    status = ?error.status,
                    kind = %error.kind,
                    "Request failed after retries"
                );
            }
            return Err(error);
        }

        let delay = policy.jittered_delay(attempt, &mut rand::thread_rng());
        warn!(
            attempt,
            max_attempts,
            status = ?error.status,
            delay_ms = delay.as_millis() as u64,
            "Retrying request after error"
        );
        tokio::time::sleep(delay).await;
    }
}
