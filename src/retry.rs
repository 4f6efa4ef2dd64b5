// src/retry.rs
use crate::rpc::ChainError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry with exponential backoff for transient chain errors
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_retries: u32,
    /// Base delay; attempt `i` waits `delay * 2^i` before attempt `i + 1`
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Sleep between attempt `attempt` and the next one (0-indexed)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `operation` until it succeeds, fails with a non-transient error,
    /// or the attempt budget runs out. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ChainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        let attempts = self.max_retries.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt + 1 >= attempts => return Err(e),
                Err(e) => {
                    let wait = self.backoff(attempt);
                    warn!(
                        "⚠️ Chain call failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempt + 1,
                        attempts,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(100))
    }

    #[test]
    fn backoff_doubles_each_attempt() {
        let p = policy();
        assert_eq!(p.backoff(0), Duration::from_millis(100));
        assert_eq!(p.backoff(1), Duration::from_millis(200));
        assert_eq!(p.backoff(2), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_budget_minus_one_failures() {
        let mut calls = 0;
        let result = policy()
            .run(|| {
                calls += 1;
                let n = calls;
                async move {
                    if n < 3 {
                        Err(ChainError::Network("connection reset".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_returns_last_error_with_doubling_sleeps() {
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let mut calls = 0;
        let result: Result<(), _> = policy()
            .run(|| {
                calls += 1;
                let n = calls;
                stamps.lock().unwrap().push(Instant::now());
                async move { Err(ChainError::Revert(format!("revert #{n}"))) }
            })
            .await;

        assert_eq!(result, Err(ChainError::Revert("revert #3".into())));
        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps.len(), 3);
        assert_eq!(stamps[1] - stamps[0], Duration::from_millis(100));
        assert_eq!(stamps[2] - stamps[1], Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_error_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = policy()
            .run(|| {
                calls += 1;
                async { Err(ChainError::Malformed("bad payload".into())) }
            })
            .await;

        assert!(matches!(result, Err(ChainError::Malformed(_))));
        assert_eq!(calls, 1);
    }
}
