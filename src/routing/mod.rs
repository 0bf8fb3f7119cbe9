//! Request routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (any method, any path)
//!     → router.rs (stamp request ID, buffer body)
//!     → ServerPool::get_next_peer
//!     → Backend::forward
//!     → on transport error: attempt.rs decides retry or failover
//!     → Return: backend response, or 503
//! ```
//!
//! # Design Decisions
//! - Single catch-all route; every request goes through the same router
//! - Retry/failover state is a plain value threaded through one loop
//! - Bounded: at most max_retries + max_attempts forwards per request

pub mod attempt;
pub mod router;

pub use attempt::AttemptState;
pub use router::{RequestRouter, RouteError};
