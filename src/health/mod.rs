//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → probe.rs (TCP connect with timeout) for each backend, in order
//!     → Backend::set_alive
//!
//! Passive demotion (routing::router):
//!     Retries against one backend exhausted
//!     → ServerPool::mark_backend_status(url, false)
//! ```
//!
//! # Design Decisions
//! - Liveness means "accepts a TCP connection", no application handshake
//! - Probes are sequential; one tick takes at most backends × timeout
//! - A single probe result flips the flag, no hysteresis

pub mod active;
pub mod probe;

pub use active::HealthMonitor;
