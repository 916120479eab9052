//! Retry policy for transient remote failures.
//!
//! Exponential backoff with jitter, applied only to the remote-call error class (see
//! [`HandlerError::is_transient`]). Invariant violations, missing records and malformed payloads fail fast.
use std::{future::Future, time::Duration};

use log::warn;
use rand::Rng;

use crate::errors::HandlerError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling for the backoff delay.
    pub max_delay: Duration,
    /// Backoff multiplier applied after each retry.
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10%).
    pub jitter_factor: f64,
    /// Retries after the initial attempt. 0 disables retrying.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.1,
            max_attempts: 3,
        }
    }
}

#[derive(Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
    current_delay: Duration,
    attempt_count: u32,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        let initial_delay = config.initial_delay;
        Self { config, current_delay: initial_delay, attempt_count: 0 }
    }

    /// The delay to sleep before the next retry, or `None` once the attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt_count >= self.config.max_attempts {
            return None;
        }
        self.attempt_count += 1;
        let delay = self.apply_jitter(self.current_delay);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scaled = (self.current_delay.as_millis() as f64 * self.config.multiplier).round() as u64;
        self.current_delay = Duration::from_millis(scaled).min(self.config.max_delay);
        Some(delay)
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return duration;
        }
        #[allow(clippy::cast_precision_loss)]
        let base = duration.as_millis() as f64;
        let range = base * self.config.jitter_factor;
        let jitter: f64 = rand::thread_rng().gen_range(-range..=range);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_millis((base + jitter).max(1.0) as u64)
    }
}

/// Runs `op`, retrying per `config` while it fails with a transient error. The op is invoked at most
/// `1 + max_attempts` times.
pub async fn retry_transient<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, HandlerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HandlerError>>,
{
    let mut policy = RetryPolicy::new(config.clone());
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => match policy.next_delay() {
                Some(delay) => {
                    warn!("⏳️ Transient remote failure (attempt {}): {e}. Retrying in {delay:?}", policy.attempt_count());
                    tokio::time::sleep(delay).await;
                },
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU32, Ordering};

    use shopify_admin::ShopifyApiError;

    use super::*;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
            jitter_factor: 0.0,
            max_attempts,
        }
    }

    fn transient() -> HandlerError {
        HandlerError::RemoteCall(ShopifyApiError::QueryError { status: 503, message: "unavailable".into() })
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let mut policy = RetryPolicy::new(RetryConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(250),
            multiplier: 2.0,
            jitter_factor: 0.0,
            max_attempts: 4,
        });
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(250)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(250)));
        assert_eq!(policy.next_delay(), None);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&fast_config(3), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(transient())
            } else {
                Ok(42u32)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn attempt_budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = retry_transient(&fast_config(2), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = retry_transient(&fast_config(5), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(HandlerError::InvariantViolation("no variant mapping".into()))
        })
        .await;
        assert!(matches!(result, Err(HandlerError::InvariantViolation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
