//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends
//! - Update backend liveness based on results

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::probe::probe;
use crate::load_balancer::ServerPool;
use crate::observability::metrics;

pub struct HealthMonitor {
    pool: Arc<ServerPool>,
    interval: Duration,
    timeout: Duration,
}

impl HealthMonitor {
    pub fn new(pool: Arc<ServerPool>, config: &HealthCheckConfig) -> Self {
        Self {
            pool,
            interval: config.interval(),
            timeout: config.timeout(),
        }
    }

    /// Tick every interval until shutdown. The first check runs one full
    /// interval after start; backends begin alive.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            timeout = ?self.timeout,
            backends = self.pool.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::info!("Starting health check...");
                    self.check_all().await;
                    tracing::info!(alive = self.pool.alive_count(), "Health check completed");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend once, in registry order, one at a time.
    pub async fn check_all(&self) {
        for backend in self.pool.backends() {
            let alive = probe(backend.url(), self.timeout).await;
            backend.set_alive(alive);

            let status = if alive { "up" } else { "down" };
            tracing::info!(
                backend = %backend.name(),
                url = %backend.url(),
                status,
                "Status check"
            );
            metrics::record_backend_health(backend.name(), alive);
        }
    }
}
