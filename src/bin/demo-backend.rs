//! Minimal upstream for trying the balancer locally.
//!
//! Answers every request with its name and the `X-Request-ID` it was given.

use std::net::SocketAddr;

use axum::{extract::State, http::HeaderMap, routing::any, Json, Router};
use clap::Parser;
use serde_json::{json, Value};

use lb_proxy::http::X_REQUEST_ID;
use lb_proxy::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "demo-backend")]
#[command(about = "Demo upstream server for lb-proxy", long_about = None)]
struct Cli {
    /// Port to serve on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Server name
    #[arg(short, long, default_value = "server")]
    name: String,
}

async fn handle(State(name): State<String>, headers: HeaderMap) -> Json<Value> {
    let request_id = headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info!(server = %name, request_id = %request_id, "Received request from balancer");

    Json(json!({ "server": name, "request_id": request_id }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging("info");

    let app = Router::new()
        .route("/", any(handle))
        .route("/{*path}", any(handle))
        .with_state(cli.name.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(server = %cli.name, address = %addr, "Starting server");

    axum::serve(listener, app).await?;
    Ok(())
}
