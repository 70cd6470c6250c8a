//! Call pacing and exponential backoff for provider calls.
//!
//! A [`Throttle`] is shared (behind an `Arc`) by every caller of one provider
//! account: it keeps a minimum spacing between consecutive calls and retries
//! calls that fail with `AppError::RateLimited`. Any other error is returned
//! to the caller on the first attempt.

use std::future::Future;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use ragline_core::config::RateLimitConfig;
use ragline_core::{AppError, AppResult};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::client::{LlmClient, LlmRequest, LlmResponse};

/// Pacing and backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Minimum spacing between consecutive calls
    pub min_interval: Duration,
    /// First backoff delay after a throttled call
    pub base_delay: Duration,
    /// Ceiling for any single backoff sleep
    pub max_delay: Duration,
    /// Total attempts before a throttled call is given up
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for RetryPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            min_interval: Duration::from_millis(config.min_interval_ms),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_retries: config.max_retries.max(1),
        }
    }
}

/// Shared pacing state plus the retry loop.
#[derive(Debug)]
pub struct Throttle {
    policy: RetryPolicy,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            last_call: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Wait until `min_interval` has passed since the previous call.
    ///
    /// The lock is held across the sleep so concurrent callers queue up
    /// instead of all waking at once.
    async fn pace(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.policy.min_interval {
                let wait = self.policy.min_interval - elapsed;
                tracing::debug!(wait_ms = wait.as_millis() as u64, "Pacing provider call");
                tokio::time::sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    /// Run `op` under the pacing floor, retrying throttled failures.
    pub async fn call<T, F, Fut>(&self, label: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt: u32 = 0;
        let mut delay = self.policy.base_delay.min(self.policy.max_delay);

        loop {
            self.pace().await;

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let retry_after = match &err {
                AppError::RateLimited {
                    retry_after_secs, ..
                } => *retry_after_secs,
                _ => return Err(err),
            };

            attempt += 1;
            if attempt >= self.policy.max_retries {
                tracing::warn!(
                    call = label,
                    attempts = attempt,
                    "Rate limit retries exhausted"
                );
                return Err(err);
            }

            let sleep_for = match retry_after {
                Some(secs) => {
                    // Header values are untrusted; clamp before any arithmetic.
                    delay = Duration::from_secs(secs).min(self.policy.max_delay);
                    delay
                        .saturating_add(Duration::from_secs_f64(jitter(1.0..5.0)))
                        .min(self.policy.max_delay)
                }
                None => delay.mul_f64(jitter(0.5..1.5)).min(self.policy.max_delay),
            };

            tracing::warn!(
                call = label,
                attempt,
                max_retries = self.policy.max_retries,
                sleep_ms = sleep_for.as_millis() as u64,
                "Rate limit hit, backing off"
            );
            tokio::time::sleep(sleep_for).await;

            delay = delay.saturating_mul(2).min(self.policy.max_delay);
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

fn jitter(range: Range<f64>) -> f64 {
    rand::rng().random_range(range)
}

/// An `LlmClient` whose calls go through a shared [`Throttle`].
pub struct RateLimitedClient {
    inner: Arc<dyn LlmClient>,
    throttle: Arc<Throttle>,
}

impl RateLimitedClient {
    pub fn new(inner: Arc<dyn LlmClient>, throttle: Arc<Throttle>) -> Self {
        Self { inner, throttle }
    }
}

#[async_trait::async_trait]
impl LlmClient for RateLimitedClient {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let inner = &self.inner;
        self.throttle
            .call(inner.provider_name(), || inner.complete(request))
            .await
    }
}
