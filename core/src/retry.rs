//! Bounded retry for transient storage failures.
//!
//! Once a ledger entry is durable, the matching account credit must land
//! too. Lock contention (SQLITE_BUSY / SQLITE_LOCKED) is retried here;
//! anything else fails fast.

use crate::error::LedgerResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryStrategy {
    None,
    Fixed { delay_ms: u64 },
    Exponential {
        initial_delay_ms: u64,
        max_delay_ms:     u64,
        multiplier:       f64,
    },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Exponential {
            initial_delay_ms: 10,
            max_delay_ms:     500,
            multiplier:       2.0,
        }
    }
}

impl RetryStrategy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            RetryStrategy::None => Duration::ZERO,
            RetryStrategy::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            RetryStrategy::Exponential {
                initial_delay_ms,
                max_delay_ms,
                multiplier,
            } => {
                let exp = attempt.saturating_sub(1) as i32;
                let delay = (*initial_delay_ms as f64) * multiplier.powi(exp);
                let delay = delay.min(*max_delay_ms as f64).max(0.0);
                Duration::from_millis(delay as u64)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(default)]
    pub strategy:     RetryStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            strategy:     RetryStrategy::default(),
        }
    }
}

impl RetryPolicy {
    /// Run `op`, retrying transient failures up to `max_attempts` total tries.
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> LedgerResult<T>) -> LedgerResult<T> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.strategy.delay_for_attempt(attempt);
                    log::warn!("{what}: transient failure on attempt {attempt}/{attempts}: {e}; retrying in {delay:?}");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
