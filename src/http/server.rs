//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a single catch-all handler
//! - Wire up middleware (tracing)
//! - Bind server to listener
//! - Dispatch requests to the request router
//! - Start the active health monitor alongside the server
//! - Stop both on the shutdown signal

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::{BalancerConfig, HealthCheckConfig};
use crate::health::HealthMonitor;
use crate::http::proxy::ClientAddr;
use crate::load_balancer::ServerPool;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::routing::RequestRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RequestRouter>,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    pool: Arc<ServerPool>,
    health_check: HealthCheckConfig,
}

impl HttpServer {
    /// Create a new HTTP server over an already built server pool.
    pub fn new(config: &BalancerConfig, pool: Arc<ServerPool>) -> Self {
        let request_router = Arc::new(RequestRouter::new(
            pool.clone(),
            RetryPolicy::from(&config.retries),
            config.limits.max_body_size,
        ));

        let state = AppState {
            router: request_router,
        };

        Self {
            router: Self::build_router(state),
            pool,
            health_check: config.health_check.clone(),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The axum router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, backends = self.pool.len(), "Load balancer started");

        if self.health_check.enabled {
            let monitor = HealthMonitor::new(self.pool.clone(), &self.health_check);
            tokio::spawn(monitor.run(shutdown.resubscribe()));
        } else {
            tracing::info!("Active health checks disabled");
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler. Every method and path is load balanced.
async fn proxy_handler(State(state): State<AppState>, mut request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    if let Some(addr) = peer {
        request.extensions_mut().insert(ClientAddr(addr));
    }

    let response = match state.router.route(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(error = %e, "Request answered by balancer");
            e.into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
