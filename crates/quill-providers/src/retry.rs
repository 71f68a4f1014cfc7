//! Retry executor — bounded retries with exponential backoff and jitter.
//!
//! After each failed attempt the error is classified:
//! - `RateLimit`, `Network`, `Timeout` → back off and retry while budget remains
//! - `Authentication`, `InvalidRequest`, `Unknown` → give up immediately
//!
//! The delay before retry *i* (0-based) is `base_delay * 2^i` plus up to one
//! second of random jitter. Both the attempt and the backoff sleep race a
//! [`CancellationToken`].

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::classify::{classify, ErrorKind};
use crate::error::BackendError;
use crate::stats::StatsTracker;

/// Why the executor stopped without a value.
#[derive(Debug, Error)]
pub enum RetryError {
    #[error("{error}")]
    Failed {
        kind: ErrorKind,
        attempts: u32,
        error: BackendError,
    },

    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

/// Retry budget and backoff shape.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Add `[0, 1)` seconds of random jitter to every backoff.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            jitter: true,
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after failed attempt `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        if self.jitter {
            let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
            exp.saturating_add(Duration::from_secs_f64(jitter))
        } else {
            exp
        }
    }

    /// Run `op` until it succeeds, fails non-retryably, exhausts the budget,
    /// or `cancel` fires.
    ///
    /// `op` receives the 0-based attempt index. Every `RateLimit`
    /// classification is counted in `stats`, the last attempt included.
    pub async fn execute<T, F, Fut>(
        &self,
        stats: &StatsTracker,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                result = op(attempt) => result,
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            let attempts = attempt + 1;
            let kind = classify(&error);
            if kind == ErrorKind::RateLimit {
                stats.record_rate_limit();
            }

            if !kind.is_retryable() {
                warn!(kind = %kind, attempts, error = %error, "Non-retryable error");
                return Err(RetryError::Failed {
                    kind,
                    attempts,
                    error,
                });
            }

            if attempt >= self.max_retries {
                warn!(kind = %kind, attempts, error = %error, "Retries exhausted");
                return Err(RetryError::Failed {
                    kind,
                    attempts,
                    error,
                });
            }

            let delay = self.backoff_delay(attempt);
            warn!(
                kind = %kind,
                attempt = attempts,
                max_attempts = self.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retryable error, backing off"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RetryError::Cancelled { attempts });
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

// ─────────────────────────────────────────────
// Pacer
// ─────────────────────────────────────────────

/// Enforces a minimum spacing between successive requests of one client.
#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until this caller's request slot. Slots are handed out in call order.
    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = match *next {
                Some(t) if t > now => t,
                _ => now,
            };
            *next = Some(slot + self.min_interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
