//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::any,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use lb_proxy::config::{BackendConfig, BalancerConfig};
use lb_proxy::lifecycle::build_server_pool;
use lb_proxy::{HttpServer, ServerPool, Shutdown};

#[derive(Clone)]
struct EchoState {
    name: &'static str,
    status: StatusCode,
    hits: Arc<AtomicU32>,
}

async fn echo(State(state): State<EchoState>, request: Request) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let body = json!({
        "server": state.name,
        "request_id": header("x-request-id"),
        "forwarded_for": header("x-forwarded-for"),
        "method": request.method().as_str(),
        "uri": request.uri().to_string(),
    });
    (state.status, Json(body))
}

/// A running mock backend.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicU32>,
    task: JoinHandle<()>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    /// Stop serving and release the port.
    pub fn stop(self) {
        self.task.abort();
    }
}

/// Start an axum backend that answers every request with a JSON echo.
pub async fn start_backend(name: &'static str) -> MockBackend {
    start_backend_with_status(name, StatusCode::OK).await
}

pub async fn start_backend_with_status(name: &'static str, status: StatusCode) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    serve_on(listener, name, status)
}

/// Serve the echo backend on an already bound listener.
pub fn serve_on(listener: TcpListener, name: &'static str, status: StatusCode) -> MockBackend {
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let state = EchoState {
        name,
        status,
        hits: hits.clone(),
    };
    let app = Router::new()
        .route("/", any(echo))
        .route("/{*path}", any(echo))
        .with_state(state);

    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, hits, task }
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    closed_ports(1).await[0]
}

/// `n` distinct addresses nothing listens on.
pub async fn closed_ports(n: usize) -> Vec<SocketAddr> {
    let mut listeners = Vec::with_capacity(n);
    for _ in 0..n {
        listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
    }
    listeners.iter().map(|l| l.local_addr().unwrap()).collect()
}

/// Config for the given backend URLs with health checks off.
pub fn config_for(urls: &[String]) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.backends = urls.iter().map(|u| BackendConfig::new(u.clone())).collect();
    config.health_check.enabled = false;
    config
}

/// A balancer serving on an ephemeral port.
pub struct RunningBalancer {
    pub addr: SocketAddr,
    pub pool: Arc<ServerPool>,
    pub shutdown: Shutdown,
}

impl RunningBalancer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningBalancer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_balancer(config: BalancerConfig) -> RunningBalancer {
    let pool = build_server_pool(&config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, pool.clone());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningBalancer { addr, pool, shutdown }
}

/// HTTP client without connection reuse, so every request is independent.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
