//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate sequential request IDs for log correlation
//! - Buffer the inbound request so it can be replayed on retries
//! - Produce a fresh outbound request for each forwarding attempt
//!
//! # Design Decisions
//! - Request ID assigned once per logical request, before the first attempt
//! - Any client supplied `X-Request-ID` is replaced
//! - Body buffered up to a configured limit; the original is never mutated

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::{Body, Bytes};
use axum::http::{request::Parts, HeaderValue, Request};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Identifier stamped on every proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn header_value(&self) -> HeaderValue {
        HeaderValue::from(self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic request ID source shared by all request handlers.
/// Relaxed ordering is enough, only uniqueness and monotonicity are needed.
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    counter: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next ID; the first one handed out is 1.
    pub fn next_id(&self) -> RequestId {
        RequestId(self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// An inbound request held in memory so every attempt sends the same bytes.
#[derive(Debug)]
pub struct BufferedRequest {
    parts: Parts,
    body: Bytes,
}

impl BufferedRequest {
    /// Read the whole body, failing if it exceeds `limit` bytes.
    pub async fn from_request(request: Request<Body>, limit: usize) -> Result<Self, axum::Error> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit).await?;
        Ok(Self { parts, body })
    }

    pub fn set_request_id(&mut self, id: RequestId) {
        self.parts.headers.insert(X_REQUEST_ID, id.header_value());
    }

    pub fn method(&self) -> &axum::http::Method {
        &self.parts.method
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Build the request for one forwarding attempt.
    pub fn to_request(&self) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.parts.method.clone();
        *request.uri_mut() = self.parts.uri.clone();
        *request.version_mut() = self.parts.version;
        *request.headers_mut() = self.parts.headers.clone();
        *request.extensions_mut() = self.parts.extensions.clone();
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[test]
    fn test_ids_are_sequential() {
        let ids = RequestIdGenerator::new();
        let first = ids.next_id();
        let second = ids.next_id();
        assert_eq!(first.as_u64(), 1);
        assert!(second > first);
        assert_eq!(second.to_string(), "2");
    }

    #[tokio::test]
    async fn test_buffered_request_replays() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/submit?x=1")
            .header(X_REQUEST_ID, "client-chosen")
            .body(Body::from("payload"))
            .unwrap();

        let mut buffered = BufferedRequest::from_request(request, 1024).await.unwrap();
        buffered.set_request_id(RequestIdGenerator::new().next_id());

        for _ in 0..2 {
            let attempt = buffered.to_request();
            assert_eq!(attempt.method(), Method::POST);
            assert_eq!(attempt.uri(), "/submit?x=1");
            assert_eq!(attempt.headers()[X_REQUEST_ID], "1");
            let body = axum::body::to_bytes(attempt.into_body(), 1024).await.unwrap();
            assert_eq!(&body[..], b"payload");
        }
    }

    #[tokio::test]
    async fn test_body_limit() {
        let request = Request::builder()
            .body(Body::from(vec![0u8; 64]))
            .unwrap();
        assert!(BufferedRequest::from_request(request, 16).await.is_err());
    }
}
