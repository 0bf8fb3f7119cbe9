//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route)
//!     → request.rs (request ID, buffered body)
//!     → [routing layer picks backend and drives retries]
//!     → proxy.rs (rewrite URI, strip hop-by-hop headers, send upstream)
//!     → response.rs (balancer generated errors)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::{Forward, ForwardError, ReverseProxy};
pub use request::{RequestId, RequestIdGenerator, X_REQUEST_ID};
pub use server::HttpServer;
