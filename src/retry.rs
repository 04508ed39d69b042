// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry controller for object transfers.
//!
//! # State Transitions
//!
//! ```text
//!                 success
//! Attempting(n) ─────────────────────────────► Succeeded
//!    │    ▲
//!    │    │ sleep(backoff(n))
//!    │    └──────── failure, n < max
//!    │
//!    └─ failure, n == max (or non-retryable) ──► Exhausted
//! ```
//!
//! Each attempt produces a fresh [`TransferAttempt`] that is folded into the
//! next state immediately; nothing is carried between attempts except the
//! attempt number. Attempts are strictly sequential and an in-flight attempt
//! always runs to completion before the retry decision.

use crate::error::{TerminalError, TransferError};
use crate::metrics;
use crate::resilience::RetryConfig;
use std::future::Future;
use tracing::{error, info, warn};

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure(TransferError),
    FatalFailure(TransferError),
}

impl AttemptOutcome {
    fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::RetryableFailure(_) => "retryable_failure",
            AttemptOutcome::FatalFailure(_) => "fatal_failure",
        }
    }
}

impl From<Result<(), TransferError>> for AttemptOutcome {
    fn from(result: Result<(), TransferError>) -> Self {
        match result {
            Ok(()) => AttemptOutcome::Success,
            Err(e) if e.is_retryable() => AttemptOutcome::RetryableFailure(e),
            Err(e) => AttemptOutcome::FatalFailure(e),
        }
    }
}

/// One attempt, numbered from 1.
#[derive(Debug)]
pub struct TransferAttempt {
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
}

/// State of the retry loop for one object.
#[derive(Debug)]
pub enum RetryState {
    /// About to run the given attempt.
    Attempting(u32),
    /// An attempt succeeded.
    Succeeded { attempts: u32 },
    /// Budget spent or fatal failure; carries the final cause.
    Exhausted { attempts: u32, cause: TransferError },
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RetryState::Attempting(_))
    }
}

impl TransferAttempt {
    /// Fold this attempt into the next state.
    pub fn next_state(self, max_attempts: u32) -> RetryState {
        let n = self.attempt_number;
        match self.outcome {
            AttemptOutcome::Success => RetryState::Succeeded { attempts: n },
            AttemptOutcome::RetryableFailure(_) if n < max_attempts => RetryState::Attempting(n + 1),
            AttemptOutcome::RetryableFailure(cause) | AttemptOutcome::FatalFailure(cause) => {
                RetryState::Exhausted { attempts: n, cause }
            }
        }
    }
}

/// Drives an operation through the bounded retry loop.
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    config: RetryConfig,
}

impl RetryController {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    ///
    /// `operation` receives the 1-based attempt number. Returns the number of
    /// attempts used on success; on failure, the final attempt's error wrapped
    /// with the key.
    pub async fn run<F, Fut>(&self, key: &str, mut operation: F) -> Result<u32, TerminalError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), TransferError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut state = RetryState::Attempting(1);

        loop {
            state = match state {
                RetryState::Attempting(attempt_number) => {
                    let attempt = TransferAttempt {
                        attempt_number,
                        outcome: operation(attempt_number).await.into(),
                    };
                    metrics::record_transfer_attempt(attempt.outcome.label());

                    if let AttemptOutcome::RetryableFailure(cause) = &attempt.outcome {
                        if attempt_number < max_attempts {
                            let delay = self.config.delay_for_attempt(attempt_number);
                            warn!(
                                key = %key,
                                attempt = attempt_number,
                                max_attempts,
                                delay_ms = delay.as_millis() as u64,
                                error = %cause,
                                "Transfer attempt failed, retrying"
                            );
                            metrics::record_transfer_retry(attempt_number, delay);
                            tokio::time::sleep(delay).await;
                        }
                    }
                    attempt.next_state(max_attempts)
                }
                RetryState::Succeeded { attempts } => {
                    if attempts > 1 {
                        info!(key = %key, attempts, "Transfer succeeded after retry");
                    }
                    metrics::record_attempts_used(attempts);
                    return Ok(attempts);
                }
                RetryState::Exhausted { attempts, cause } => {
                    error!(
                        key = %key,
                        attempts,
                        error = %cause,
                        "Could not copy object, giving up"
                    );
                    return Err(TerminalError {
                        key: key.to_string(),
                        attempts,
                        source: cause,
                    });
                }
            };
        }
    }
}
