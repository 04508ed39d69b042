//! Retry budget and backoff policy.
//!
//! The replicator retries a whole object transfer a bounded number of times,
//! waiting a linearly growing delay between attempts:
//!
//! ```text
//! Attempt failed  Wait before next
//! --------------  ----------------
//! 1               3s
//! 2               6s
//! 3               9s
//! 4               12s
//! 5               (terminal, no wait)
//! ```
//!
//! There is no jitter and no cap; the attempt budget bounds the total wait.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attempts made for one object before the failure becomes terminal.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Backoff step: attempt `n` waits `n * step` before attempt `n + 1`.
pub const DEFAULT_BACKOFF_STEP_MS: u64 = 3_000;

/// Configuration for transfer retry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of transfer attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff step in milliseconds.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_step_ms() -> u64 {
    DEFAULT_BACKOFF_STEP_MS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_step_ms: DEFAULT_BACKOFF_STEP_MS,
        }
    }
}

impl RetryConfig {
    /// Fast-fail retry for tests.
    pub fn testing() -> Self {
        Self {
            max_attempts: 3,
            backoff_step_ms: 10,
        }
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff_step_ms: 0,
        }
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }

    /// Delay to wait after the given failed attempt (1-indexed).
    ///
    /// Linear: `attempt * step`. Attempt 0 is treated as 1.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_step().saturating_mul(attempt.max(1))
    }

    /// Total time spent sleeping if every attempt fails.
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.max_attempts)
            .map(|n| self.delay_for_attempt(n))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}
