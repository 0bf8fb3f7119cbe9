//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Validate → Build server pool → Start server + health monitor
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → stop accepting, drain → health monitor exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::build_server_pool;
