//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request router asks for a peer
//!     → pool.rs (ordered backend registry)
//!     → round_robin.rs (advance cursor, skip dead backends)
//!     → backend.rs (liveness flag + forwarding handle)
//!     → Return backend or "no peer"
//! ```
//!
//! # Design Decisions
//! - Backends fixed at startup; the pool is shared via Arc
//! - Cursor is a lone atomic, no pool-wide lock
//! - Liveness read per candidate, so a scan may observe backends flipping
//! - Dead backends excluded from selection

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use pool::ServerPool;
