use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::{AnalyzerError, Result};

/// Delay before the attempt following failed attempt number `attempt`
/// (1-based). Exponential from `base_delay`, capped at `max_delay`, with the
/// top `jitter` fraction randomized. A server `retry_after` hint wins when it
/// is longer, still bounded by `max_delay`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32, retry_after: Option<Duration>) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let nominal = policy
        .base_delay
        .saturating_mul(1u32 << exponent)
        .min(policy.max_delay);

    let jitter = policy.jitter.clamp(0.0, 1.0);
    let factor = if jitter > 0.0 {
        rand::thread_rng().gen_range((1.0 - jitter)..=1.0)
    } else {
        1.0
    };
    let delay = nominal.mul_f64(factor);

    match retry_after {
        Some(hint) => delay.max(hint).min(policy.max_delay),
        None => delay,
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// attempt cap is reached.
///
/// Exhausting the cap on transient failures yields `RetriesExhausted`
/// carrying the last message. Other errors are returned unchanged.
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() {
            return Err(err);
        }

        if attempt >= max_attempts {
            warn!(label, attempts = attempt, error = %err, "giving up after transient failures");
            let last = match err {
                AnalyzerError::Transient { message, .. } => message,
                other => other.to_string(),
            };
            return Err(AnalyzerError::RetriesExhausted {
                attempts: attempt,
                last,
            });
        }

        let retry_after = err.retry_after_secs().map(Duration::from_secs);
        let delay = backoff_delay(policy, attempt, retry_after);
        debug!(
            label,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retrying after transient failure"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
