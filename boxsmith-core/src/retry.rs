//! Bounded retry with backoff for calls to external services.
//!
//! Generic transient failures (timeouts, connection errors, 5xx) consume the
//! attempt budget and back off exponentially. A 429 is handled separately:
//! it waits for the server's `Retry-After` (or a fixed default) and draws on
//! its own budget, since the catalog enforces a known per-key quota and a
//! throttled call is not a sign the service is unhealthy.

use std::future::Future;

use tokio::time::Duration;

use crate::error::ServiceError;

/// Upper bound on a single `Retry-After` wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts for generic transient failures (including the first).
    pub max_attempts: u32,
    /// Delay after the first failure; doubled for each further failure.
    pub base_delay: Duration,
    /// Cap on the exponential delay.
    pub max_delay: Duration,
    /// Wait after a 429 that carries no `Retry-After`.
    pub rate_limit_delay: Duration,
    /// How many 429 responses are waited out before giving up.
    pub max_rate_limit_waits: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            rate_limit_delay: Duration::from_secs(3),
            max_rate_limit_waits: 5,
        }
    }
}

impl RetryPolicy {
    /// A policy with the default budgets and no waiting, for tests and
    /// in-memory services.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            rate_limit_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn rate_limit_wait(&self, retry_after: Option<Duration>) -> Duration {
        retry_after
            .unwrap_or(self.rate_limit_delay)
            .min(MAX_RETRY_AFTER)
    }
}

/// Run `op` until it succeeds, fails permanently, or exhausts the policy.
///
/// `label` names the call in log output.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut failures = 0u32;
    let mut rate_limit_waits = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(ServiceError::RateLimited { retry_after }) => {
                rate_limit_waits += 1;
                if rate_limit_waits > policy.max_rate_limit_waits {
                    log::warn!(
                        "{}: still rate limited after {} waits, giving up",
                        label,
                        policy.max_rate_limit_waits,
                    );
                    return Err(ServiceError::RateLimited { retry_after });
                }
                let wait = policy.rate_limit_wait(retry_after);
                log::warn!(
                    "{}: 429 Too Many Requests, waiting {:.1}s ({}/{})",
                    label,
                    wait.as_secs_f32(),
                    rate_limit_waits,
                    policy.max_rate_limit_waits,
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) if e.is_transient() => {
                failures += 1;
                if failures >= policy.max_attempts {
                    log::warn!(
                        "{}: giving up after {} attempts: {}",
                        label,
                        failures,
                        e
                    );
                    return Err(e);
                }
                let delay = policy.backoff(failures);
                log::warn!(
                    "{}: attempt {}/{} failed: {}; retrying in {:.1}s",
                    label,
                    failures,
                    policy.max_attempts,
                    e,
                    delay.as_secs_f32(),
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "tests/retry_tests.rs"]
mod tests;
