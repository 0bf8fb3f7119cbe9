//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the server pool, one reverse proxy per backend
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Backends are registered in configuration order

use std::sync::Arc;
use std::time::Duration;

use crate::config::validation::{parse_backend_url, validate_config};
use crate::config::{BalancerConfig, ConfigError};
use crate::http::proxy::{build_client, ReverseProxy};
use crate::load_balancer::{Backend, ServerPool};

/// Validate `config` and build the shared server pool from its backends.
pub fn build_server_pool(config: &BalancerConfig) -> Result<Arc<ServerPool>, ConfigError> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let client = build_client(Duration::from_secs(config.timeouts.connect_secs));
    let response_timeout = config.timeouts.upstream_secs.map(Duration::from_secs);

    let mut pool = ServerPool::new();
    for (index, backend) in config.backends.iter().enumerate() {
        let url = parse_backend_url(&backend.url).map_err(|e| ConfigError::Validation(vec![e]))?;
        let name = backend.display_name(index);

        let proxy = ReverseProxy::new(url.clone(), client.clone()).with_response_timeout(response_timeout);
        pool.add_backend(Backend::new(name.clone(), url.clone(), Arc::new(proxy)));

        tracing::info!(backend = %name, url = %url, "Configured server");
    }

    Ok(Arc::new(pool))
}
