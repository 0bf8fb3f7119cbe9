//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Parse backend URLs and reject anything the proxy cannot dial
//! - Validate value ranges (intervals and timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("backend `{url}` is not a valid URL: {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("backend `{url}` uses unsupported scheme `{scheme}` (only http is proxied)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("backend `{url}` has no host")]
    MissingHost { url: String },

    #[error("listener port must be non-zero")]
    ZeroPort,

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("metrics address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Parse and check one backend base URL.
pub fn parse_backend_url(raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw).map_err(|e| ValidationError::MalformedUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" {
        return Err(ValidationError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    if url.host().is_none() {
        return Err(ValidationError::MissingHost {
            url: raw.to_string(),
        });
    }

    Ok(url)
}

/// Check the whole configuration, collecting every error.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }
    for backend in &config.backends {
        if let Err(e) = parse_backend_url(&backend.url) {
            errors.push(e);
        }
    }

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::ZeroValue {
                field: "health_check.interval_secs",
            });
        }
        if config.health_check.timeout_secs == 0 {
            errors.push(ValidationError::ZeroValue {
                field: "health_check.timeout_secs",
            });
        }
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroValue {
            field: "timeouts.connect_secs",
        });
    }
    if config.timeouts.upstream_secs == Some(0) {
        errors.push(ValidationError::ZeroValue {
            field: "timeouts.upstream_secs",
        });
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
