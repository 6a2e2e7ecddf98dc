//! Bounded retry with per-call timeout for provider requests

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy applied to every remote call
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each time
    pub base_delay: Duration,
    /// Upper bound on the delay between attempts
    pub max_delay: Duration,
    /// Deadline for a single attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt count and timeout, default backoff
    pub fn new(max_attempts: u32, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout,
            ..Self::default()
        }
    }

    /// The same policy with retries disabled, for calls that are not
    /// idempotent
    pub const fn single_attempt(self) -> Self {
        Self {
            max_attempts: 1,
            ..self
        }
    }

    /// Run `op`, retrying transient failures until attempts are exhausted
    pub async fn run<T, F, Fut>(&self, name: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1;

        loop {
            let result = tokio::time::timeout(self.timeout, op())
                .await
                .unwrap_or(Err(Error::Timeout(self.timeout)));

            match result {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        op = name,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "transient API failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.max_delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
