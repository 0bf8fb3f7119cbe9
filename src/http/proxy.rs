//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI onto a single backend's base URL
//! - Strip hop-by-hop headers in both directions
//! - Append the client address to `X-Forwarded-For`
//! - Send the request with the shared hyper-util client
//!
//! # Design Decisions
//! - Only transport failures are errors; any upstream status is a response
//! - One `ReverseProxy` per backend, bound to its URL for the process lifetime
//! - The client (and its connection pool) is shared by every backend

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response, Uri, Version};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

pub type HttpClient = Client<HttpConnector, Body>;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that describe a single hop and must not be forwarded.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Reasons a request could not be delivered to a backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to build upstream request: {0}")]
    Build(#[from] axum::http::Error),

    #[error("upstream {target} unreachable: {source}")]
    Transport {
        target: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("upstream {target} did not respond within {timeout:?}")]
    Timeout { target: String, timeout: Duration },
}

/// A forwarding delegate bound to one backend.
pub trait Forward: Send + Sync + fmt::Debug {
    /// Deliver `request` upstream and return whatever the backend answered.
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>>;
}

/// Build the shared upstream client.
pub fn build_client(connect_timeout: Duration) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Single-host reverse proxy over hyper-util.
#[derive(Clone)]
pub struct ReverseProxy {
    target: Url,
    client: HttpClient,
    response_timeout: Option<Duration>,
}

impl fmt::Debug for ReverseProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReverseProxy")
            .field("target", &self.target.as_str())
            .field("response_timeout", &self.response_timeout)
            .finish()
    }
}

impl ReverseProxy {
    pub fn new(target: Url, client: HttpClient) -> Self {
        Self {
            target,
            client,
            response_timeout: None,
        }
    }

    /// Bound the wait for upstream response headers.
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    fn prepare(&self, request: Request<Body>) -> Result<Request<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = upstream_uri(&self.target, &parts.uri)?;
        // Upstream connections are HTTP/1.1 regardless of the inbound protocol.
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);

        let client_addr = parts.extensions.get::<ClientAddr>().map(|c| c.0);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr);
        }

        Ok(Request::from_parts(parts, body))
    }

    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let request = self.prepare(request)?;
        let target = self.target.as_str();

        let response = match self.response_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.client.request(request))
                .await
                .map_err(|_| ForwardError::Timeout {
                    target: target.to_string(),
                    timeout,
                })?,
            None => self.client.request(request).await,
        }
        .map_err(|source| ForwardError::Transport {
            target: target.to_string(),
            source,
        })?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl Forward for ReverseProxy {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>> {
        Box::pin(self.send(request))
    }
}

/// Request extension carrying the downstream peer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub SocketAddr);

/// Point `original` at `target`, joining paths and merging query strings.
pub fn upstream_uri(target: &Url, original: &Uri) -> Result<Uri, axum::http::Error> {
    let path = join_paths(target.path(), original.path());
    let path_and_query = match (target.query().unwrap_or(""), original.query().unwrap_or("")) {
        ("", "") => path,
        (t, "") => format!("{}?{}", path, t),
        ("", o) => format!("{}?{}", path, o),
        (t, o) => format!("{}?{}&{}", path, t, o),
    };

    let authority = &target[url::Position::BeforeHost..url::Position::AfterPort];

    Uri::builder()
        .scheme(target.scheme())
        .authority(authority)
        .path_and_query(path_and_query)
        .build()
}

/// Join a base path and a request path with exactly one slash between them.
pub fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in `Connection` are hop-by-hop as well.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let ip = addr.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
