//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarding failure:
//!     → retries.rs bounds (same-backend retries, then failover)
//!     → routing::attempt tracks progress against those bounds
//!     → exhausted: backend demoted, request answered with 503
//! ```
//!
//! # Design Decisions
//! - Every bound is finite, so one request performs a bounded number of forwards
//! - Upstream connect and response timeouts live on the proxy client

pub mod retries;

pub use retries::RetryPolicy;
