use std::time::Duration;

use ns_core::{exponential_backoff, CallFailure, Deadline, Sleeper, ThreadSleeper};
use ns_remote::RemoteError;
use rand::Rng;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Randomize each delay within [delay/2, delay].
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Pure retry decision for the failure of attempt `attempt_number` (1-based):
/// - rate limited / transient: retry with exponential backoff until the budget is spent
/// - anything else: give up immediately
pub fn decide_retry(policy: &RetryPolicy, error: &RemoteError, attempt_number: u32) -> RetryDecision {
    if !error.is_retryable() || attempt_number >= policy.max_attempts {
        return RetryDecision::GiveUp;
    }
    RetryDecision::RetryAfter(exponential_backoff(attempt_number, policy.base_delay, policy.max_delay))
}

/// Last failure of a call, tagged with how it should be reported.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{} failure after {attempts} attempt(s): {source}", .class.as_str())]
pub struct CallError {
    pub class: CallFailure,
    pub attempts: u32,
    pub source: RemoteError,
}

pub struct RetryOrchestrator<S: Sleeper = ThreadSleeper> {
    policy: RetryPolicy,
    sleeper: S,
}

impl RetryOrchestrator<ThreadSleeper> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, ThreadSleeper)
    }
}

impl<S: Sleeper> RetryOrchestrator<S> {
    pub fn with_sleeper(policy: RetryPolicy, sleeper: S) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails terminally, exhausts the attempt
    /// budget, or the deadline would be crossed. Deadline expiry is terminal.
    pub fn invoke<T, F>(&self, deadline: Deadline, mut operation: F) -> Result<T, CallError>
    where
        F: FnMut(Deadline) -> Result<T, RemoteError>,
    {
        let mut attempt = 1;
        loop {
            if deadline.is_expired() {
                return Err(deadline_error(attempt - 1, format!("before attempt {attempt}")));
            }

            let err = match operation(deadline) {
                Ok(v) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "remote call succeeded after retry");
                    }
                    return Ok(v);
                }
                Err(e) => e,
            };

            match decide_retry(&self.policy, &err, attempt) {
                RetryDecision::GiveUp => {
                    tracing::warn!(attempt, error = %err, retryable = err.is_retryable(), "remote call failed; giving up");
                    return Err(CallError {
                        class: err.failure(),
                        attempts: attempt,
                        source: err,
                    });
                }
                RetryDecision::RetryAfter(delay) => {
                    let delay = if self.policy.jitter { jittered(delay) } else { delay };
                    if !deadline.allows(delay) {
                        tracing::warn!(attempt, ?delay, "backoff would cross the deadline");
                        return Err(deadline_error(attempt, format!("backoff after attempt {attempt}")));
                    }
                    tracing::warn!(attempt, ?delay, error = %err, "retryable remote failure; backing off");
                    self.sleeper.sleep(delay);
                }
            }
            attempt += 1;
        }
    }
}

fn deadline_error(attempts: u32, during: String) -> CallError {
    CallError {
        class: CallFailure::Deadline,
        attempts,
        source: RemoteError::DeadlineExceeded(during),
    }
}

fn jittered(delay: Duration) -> Duration {
    let half = delay / 2;
    let spread = u64::try_from(half.as_millis()).unwrap_or(u64::MAX);
    half + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
}
