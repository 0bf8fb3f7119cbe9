//! Request routing with retry and failover.
//!
//! # Responsibilities
//! - Stamp each request with a sequential `X-Request-ID`
//! - Select a peer from the server pool and forward to it
//! - Retry the same peer on transport errors, then demote it and fail over
//! - Collapse every terminal failure into a single 503
//!
//! # Design Decisions
//! - One bounded loop per request; no re-entry from error callbacks
//! - Attempts within one request are strictly sequential
//! - Backend responses are returned as-is, whatever their status

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use thiserror::Error;

use crate::http::request::{BufferedRequest, RequestId, RequestIdGenerator};
use crate::http::response;
use crate::load_balancer::ServerPool;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::routing::attempt::AttemptState;

/// Why a request was answered by the balancer instead of a backend.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("max attempts reached after trying {backends_tried} backends")]
    AttemptsExhausted { backends_tried: u32 },

    #[error("no live backend available")]
    NoPeerAvailable,

    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),
}

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::AttemptsExhausted { .. } | RouteError::NoPeerAvailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RouteError::Body(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> axum::response::Response {
        match self {
            RouteError::Body(_) => response::payload_too_large(),
            _ => response::service_unavailable(),
        }
    }
}

/// Entry point for every proxied request.
#[derive(Debug)]
pub struct RequestRouter {
    pool: Arc<ServerPool>,
    policy: RetryPolicy,
    ids: RequestIdGenerator,
    max_body_size: usize,
}

impl RequestRouter {
    pub fn new(pool: Arc<ServerPool>, policy: RetryPolicy, max_body_size: usize) -> Self {
        Self {
            pool,
            policy,
            ids: RequestIdGenerator::new(),
            max_body_size,
        }
    }

    /// Route one inbound request to a live backend.
    pub async fn route(&self, request: Request<Body>) -> Result<Response<Body>, RouteError> {
        let id = self.ids.next_id();

        let mut buffered = BufferedRequest::from_request(request, self.max_body_size)
            .await
            .map_err(|e| {
                tracing::warn!(request_id = %id, error = %e, "Failed to buffer request body");
                RouteError::Body(e)
            })?;
        buffered.set_request_id(id);

        tracing::info!(
            request_id = %id,
            method = %buffered.method(),
            path = %buffered.path(),
            "Received request"
        );

        self.dispatch(id, &buffered).await
    }

    async fn dispatch(
        &self,
        id: RequestId,
        request: &BufferedRequest,
    ) -> Result<Response<Body>, RouteError> {
        let mut state = AttemptState::new();

        loop {
            if state.attempts_exhausted(&self.policy) {
                tracing::warn!(
                    request_id = %id,
                    path = %request.path(),
                    attempts = state.attempts(),
                    "Max attempts reached, terminating"
                );
                return Err(RouteError::AttemptsExhausted {
                    backends_tried: state.attempts() - 1,
                });
            }

            let Some(peer) = self.pool.get_next_peer() else {
                tracing::warn!(request_id = %id, attempts = state.attempts(), "No live backend available");
                return Err(RouteError::NoPeerAvailable);
            };

            tracing::info!(
                request_id = %id,
                backend = %peer.name(),
                attempt = state.attempts(),
                "Forwarding request"
            );

            loop {
                match peer.forward(request.to_request()).await {
                    Ok(response) => {
                        tracing::debug!(
                            request_id = %id,
                            backend = %peer.name(),
                            status = %response.status(),
                            "Upstream responded"
                        );
                        return Ok(response);
                    }
                    Err(e) => {
                        tracing::warn!(
                            request_id = %id,
                            backend = %peer.name(),
                            retries = state.retries(),
                            error = %e,
                            "Upstream error"
                        );

                        if state.can_retry(&self.policy) {
                            tokio::time::sleep(self.policy.backoff).await;
                            state = state.next_retry();
                            metrics::record_retry(peer.name());
                            continue;
                        }

                        self.pool.mark_backend_status(peer.url(), false);
                        metrics::record_demotion(peer.name());
                        state = state.next_attempt();
                        tracing::warn!(
                            request_id = %id,
                            backend = %peer.name(),
                            attempt = state.attempts(),
                            "Backend marked down, failing over"
                        );
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use futures_util::future::BoxFuture;
    use url::Url;

    use crate::http::proxy::{Forward, ForwardError};
    use crate::http::request::X_REQUEST_ID;
    use crate::http::response::SERVICE_NOT_AVAILABLE;
    use crate::load_balancer::Backend;

    /// Fails a fixed number of times, then answers with `status`.
    #[derive(Debug)]
    struct Scripted {
        failures_left: AtomicU32,
        calls: AtomicU32,
        status: StatusCode,
    }

    impl Scripted {
        fn new(failures: u32, status: StatusCode) -> Arc<Self> {
            Arc::new(Self {
                failures_left: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                status,
            })
        }

        fn healthy() -> Arc<Self> {
            Self::new(0, StatusCode::OK)
        }

        fn dead() -> Arc<Self> {
            Self::new(u32::MAX, StatusCode::OK)
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Forward for Scripted {
        fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            let request_id = request.headers().get(X_REQUEST_ID).cloned();
            let status = self.status;

            Box::pin(async move {
                if fail {
                    return Err(ForwardError::Timeout {
                        target: "scripted".into(),
                        timeout: Duration::ZERO,
                    });
                }
                let mut response = Response::builder().status(status).body(Body::empty()).unwrap();
                if let Some(id) = request_id {
                    response.headers_mut().insert(X_REQUEST_ID, id);
                }
                Ok(response)
            })
        }
    }

    fn pool_of(upstreams: &[Arc<Scripted>]) -> Arc<ServerPool> {
        let mut pool = ServerPool::new();
        for (i, upstream) in upstreams.iter().enumerate() {
            let url = Url::parse(&format!("http://10.0.0.{}:80", i + 1)).unwrap();
            pool.add_backend(Backend::new(format!("server-{}", i + 1), url, upstream.clone()));
        }
        Arc::new(pool)
    }

    fn router(pool: Arc<ServerPool>) -> RequestRouter {
        let policy = RetryPolicy {
            backoff: Duration::ZERO,
            ..RetryPolicy::default()
        };
        RequestRouter::new(pool, policy, 1024)
    }

    fn get() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let upstream = Scripted::healthy();
        let router = router(pool_of(&[upstream.clone()]));

        let response = router.route(get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn test_three_failures_then_success_on_same_backend() {
        let upstream = Scripted::new(3, StatusCode::OK);
        let pool = pool_of(&[upstream.clone()]);
        let router = router(pool.clone());

        let response = router.route(get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(upstream.calls(), 4);
        assert!(pool.backends()[0].is_alive(), "retry bound not exceeded, no demotion");
    }

    #[tokio::test]
    async fn test_fourth_failure_demotes_and_fails_over() {
        // A fresh pool starts rotation at index 1.
        let first = Scripted::healthy();
        let flaky = Scripted::new(4, StatusCode::OK);
        let pool = pool_of(&[first.clone(), flaky.clone()]);
        let router = router(pool.clone());

        let response = router.route(get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(flaky.calls(), 4, "never a fifth call to the same backend");
        assert!(!pool.backends()[1].is_alive());
        assert_eq!(first.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_backends_failing_is_bounded() {
        let upstreams = [Scripted::dead(), Scripted::dead(), Scripted::dead()];
        let pool = pool_of(&upstreams);
        let router = router(pool.clone());

        let err = router.route(get()).await.unwrap_err();
        assert!(matches!(err, RouteError::AttemptsExhausted { backends_tried: 3 }));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let total: u32 = upstreams.iter().map(|u| u.calls()).sum();
        assert!(total <= 9, "made {} forwarding calls", total);
        assert_eq!(total, router.policy.max_forwards());
        assert_eq!(pool.alive_count(), 0);
    }

    #[tokio::test]
    async fn test_more_backends_than_attempts() {
        let upstreams = [Scripted::dead(), Scripted::dead(), Scripted::dead(), Scripted::healthy()];
        let pool = pool_of(&upstreams);
        let router = router(pool.clone());

        // Rotation visits index 1, 2, 3: the healthy backend is the third attempt.
        let response = router.route(get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(upstreams[0].calls(), 0);
        assert_eq!(pool.alive_count(), 2);
    }

    #[tokio::test]
    async fn test_no_live_backend() {
        let upstream = Scripted::healthy();
        let pool = pool_of(&[upstream.clone()]);
        pool.backends()[0].set_alive(false);

        let err = router(pool).route(get()).await.unwrap_err();
        assert!(matches!(err, RouteError::NoPeerAvailable));
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_two_dead_backends_run_out_of_peers() {
        let upstreams = [Scripted::dead(), Scripted::dead()];
        let router = router(pool_of(&upstreams));

        let err = router.route(get()).await.unwrap_err();
        assert!(matches!(err, RouteError::NoPeerAvailable));
        assert_eq!(upstreams[0].calls() + upstreams[1].calls(), 5);
    }

    #[tokio::test]
    async fn test_upstream_error_status_passes_through() {
        let upstream = Scripted::new(0, StatusCode::INTERNAL_SERVER_ERROR);
        let pool = pool_of(&[upstream.clone()]);

        let response = router(pool.clone()).route(get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(upstream.calls(), 1);
        assert!(pool.backends()[0].is_alive());
    }

    #[tokio::test]
    async fn test_request_ids_increase() {
        let router = router(pool_of(&[Scripted::healthy()]));

        let mut previous = 0u64;
        for _ in 0..3 {
            let request = Request::builder()
                .uri("/")
                .header(X_REQUEST_ID, "spoofed")
                .body(Body::empty())
                .unwrap();
            let response = router.route(request).await.unwrap();
            let id: u64 = response.headers()[X_REQUEST_ID].to_str().unwrap().parse().unwrap();
            assert!(id > previous);
            previous = id;
        }
        assert_eq!(previous, 3);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let upstream = Scripted::healthy();
        let router = router(pool_of(&[upstream.clone()]));
        let request = Request::builder()
            .uri("/")
            .body(Body::from(vec![b'x'; 4096]))
            .unwrap();

        let err = router.route(request).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = RouteError::NoPeerAvailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], SERVICE_NOT_AVAILABLE.as_bytes());
    }
}
