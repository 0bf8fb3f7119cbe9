//! Retry and failover bounds.
//!
//! # Design Decisions
//! - Only transport failures are retried; upstream status codes pass through
//! - Same-backend retries wait a fixed backoff, failover does not wait
//! - Both bounds are small constants by default (3 retries, 3 backends)

use std::time::Duration;

use crate::config::RetryConfig;

/// Bounds applied by the request router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries against one backend before it is demoted.
    pub max_retries: u32,
    /// Distinct backends tried before giving up.
    pub max_attempts: u32,
    /// Delay before each same-backend retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            max_attempts: config.max_attempts,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Upper bound on forwarding calls for one request.
    pub fn max_forwards(&self) -> u32 {
        self.max_retries + self.max_attempts
    }
}
