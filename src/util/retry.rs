//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, VoiceGitError};

/// Backoff schedule for re-establishing a failed transport request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Default schedule with a custom retry count.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Un-jittered delay before retry number `retry` (0-based).
    pub fn base_delay(&self, retry: u32) -> Duration {
        let scaled = self.initial_backoff.as_secs_f64() * self.multiplier.powi(retry as i32);
        Duration::from_secs_f64(scaled.min(self.max_backoff.as_secs_f64()))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent. A server-provided `retry_after` wins over the
    /// computed backoff.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || retry >= self.max_retries {
                return Err(err);
            }

            let delay = match &err {
                VoiceGitError::RateLimited {
                    retry_after_ms: Some(ms),
                } => Duration::from_millis(*ms).min(self.max_backoff),
                _ => jittered(self.base_delay(retry)),
            };
            tracing::warn!(
                retry = retry + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transport request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}

// 75%..125% of the base delay.
fn jittered(base: Duration) -> Duration {
    Duration::from_secs_f64(base.as_secs_f64() * (0.75 + rand_factor() * 0.5))
}

/// Pseudo-random factor in [0, 1) without pulling in the rand crate.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);
    (hasher.finish() % 10_000) as f64 / 10_000.0
}
