//! Per-request attempt bookkeeping.
//!
//! # State Transitions
//! ```text
//! forward failed, retries < max_retries  → next_retry()   (same backend)
//! forward failed, retries == max_retries → next_attempt() (backend demoted, reselect)
//! attempts > max_attempts                → give up with 503
//! ```
//!
//! The retry count belongs to the logical request and survives failover, so
//! only the first backend tried gets same-backend retries.

use crate::resilience::RetryPolicy;

/// Progress of one logical request through the retry/failover policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptState {
    attempts: u32,
    retries: u32,
}

impl Default for AttemptState {
    fn default() -> Self {
        Self {
            attempts: 1,
            retries: 0,
        }
    }
}

impl AttemptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct backends selected so far, counting the current one.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Same-backend retries performed so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn next_retry(self) -> Self {
        Self {
            retries: self.retries + 1,
            ..self
        }
    }

    pub fn next_attempt(self) -> Self {
        Self {
            attempts: self.attempts + 1,
            ..self
        }
    }

    pub fn can_retry(&self, policy: &RetryPolicy) -> bool {
        self.retries < policy.max_retries
    }

    pub fn attempts_exhausted(&self, policy: &RetryPolicy) -> bool {
        self.attempts > policy.max_attempts
    }
}
