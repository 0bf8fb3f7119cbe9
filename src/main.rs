//! Round-robin reverse proxy load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                  LOAD BALANCER                   │
//!                      │                                                  │
//!   Client Request     │  ┌─────────┐    ┌──────────┐    ┌─────────────┐  │
//!   ───────────────────┼─▶│  http   │───▶│ routing  │───▶│ server pool │  │
//!                      │  │ server  │    │  router  │    │ round robin │  │
//!                      │  └─────────┘    └────┬─────┘    └──────┬──────┘  │
//!                      │                      │ retry /         │         │
//!                      │                      │ failover        ▼         │
//!   Client Response    │                      │          ┌─────────────┐  │
//!   ◀──────────────────┼──────────────────────┴──────────│   backend   │◀─┼── Backend
//!                      │                                 │    proxy    │  │   Server
//!                      │                                 └──────▲──────┘  │
//!                      │  ┌────────────────┐                    │         │
//!                      │  │ health monitor │── TCP probe ───────┘         │
//!                      │  └────────────────┘                              │
//!                      └──────────────────────────────────────────────────┘
//! ```
//!
//! Backends come from `--backends` (comma separated) or a TOML file given with
//! `--config`; command line flags override the file.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use lb_proxy::config::loader::read_config;
use lb_proxy::config::schema::parse_backend_list;
use lb_proxy::config::{BalancerConfig, ConfigError};
use lb_proxy::lifecycle::{build_server_pool, signals, Shutdown};
use lb_proxy::observability::{logging, metrics};
use lb_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "lb-proxy")]
#[command(about = "Round-robin HTTP load balancer with health checks and failover", long_about = None)]
struct Cli {
    /// Load balanced backends, use commas to separate
    #[arg(short, long)]
    backends: Option<String>,

    /// Port to serve
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Read the config file, if any, and apply command line overrides.
    fn into_config(self) -> Result<BalancerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => BalancerConfig::default(),
        };

        if let Some(list) = &self.backends {
            config.backends = parse_backend_list(list);
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = addr;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let fallback_level = cli.log_level.clone().unwrap_or_else(|| "info".to_string());

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging(&fallback_level);
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    logging::init_logging(&config.observability.log_level);

    tracing::info!("lb-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let pool = match build_server_pool(&config) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Please provide one or more valid backends to load balance");
            return Err(e.into());
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        backends = pool.len(),
        health_check_interval_secs = config.health_check.interval_secs,
        max_retries = config.retries.max_retries,
        max_attempts = config.retries.max_attempts,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(&config, pool);

    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
