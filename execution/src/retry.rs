//! Bounded exponential backoff

use crate::error::ExchangeError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for any single backoff
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Randomize each delay within its upper half
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` counts from 1.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let capped = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);

        let millis = if self.jitter && capped > 1 {
            fastrand::u64(capped / 2..=capped)
        } else {
            capped
        };
        Duration::from_millis(millis)
    }

    /// Run `call` until it succeeds, fails with an error `should_retry`
    /// rejects, or the attempt budget runs out.
    pub async fn run<T, F, Fut, P>(
        &self,
        operation: &str,
        should_retry: P,
        mut call: F,
    ) -> Result<T, ExchangeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExchangeError>>,
        P: Fn(&ExchangeError) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !should_retry(&err) {
                return Err(err);
            }

            if attempt >= max_attempts {
                return Err(ExchangeError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.delay_for(attempt);
            warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}

fn default_jitter() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter: false,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            jitter: false,
            ..Default::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(4_000));
        assert_eq!(policy.delay_for(5), Duration::from_millis(8_000));
        assert_eq!(policy.delay_for(30), Duration::from_millis(8_000));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 1..6 {
            let upper = policy.delay_for(attempt).as_millis();
            assert!(upper <= 8_000);
            assert!(upper >= 250);
        }
    }

    #[tokio::test]
    async fn test_auth_error_attempted_once() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .run("balance", ExchangeError::is_retryable, || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ExchangeError::Http {
                    status: 401,
                    code: Some("invalid_api_key".to_string()),
                    message: "unauthorized".to_string(),
                })
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(result.unwrap_err().is_auth_error());
    }

    #[tokio::test]
    async fn test_timeouts_exhaust_the_budget() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .run("candles", ExchangeError::is_retryable, || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ExchangeError::Timeout)
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        match result {
            Err(ExchangeError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, ExchangeError::Timeout));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let attempts = AtomicU32::new(0);
        let result = fast_policy(3)
            .run("ticker", ExchangeError::is_retryable, || async {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ExchangeError::Connect("refused".into()))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_order_predicate_does_not_repeat_timeouts() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .run("order", ExchangeError::is_connect, || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ExchangeError::Timeout)
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ExchangeError::Timeout)));
    }
}
