//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command line overrides (--backends, --port)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → lifecycle::startup builds the server pool from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the backend set is fixed for the process lifetime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::BackendConfig;
pub use schema::BalancerConfig;
pub use schema::HealthCheckConfig;
pub use schema::ListenerConfig;
pub use schema::RetryConfig;
