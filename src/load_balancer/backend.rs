//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Track liveness (read by every selection, written by probes and demotions)
//! - Own the forwarding handle bound to the backend's URL

use std::sync::{Arc, RwLock};

use axum::body::Body;
use axum::http::{Request, Response};
use url::Url;

use crate::http::proxy::{Forward, ForwardError, HttpClient, ReverseProxy};

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Label used in logs and metrics.
    name: String,
    /// Base URL requests are rewritten onto.
    url: Url,
    /// Liveness flag; backends start alive.
    alive: RwLock<bool>,
    /// Forwarding delegate, fixed at construction.
    proxy: Arc<dyn Forward>,
}

impl Backend {
    /// Create a backend with an explicit forwarding delegate.
    pub fn new(name: impl Into<String>, url: Url, proxy: Arc<dyn Forward>) -> Self {
        Self {
            name: name.into(),
            url,
            alive: RwLock::new(true),
            proxy,
        }
    }

    /// Create a backend that forwards through a [`ReverseProxy`] on `client`.
    pub fn with_client(name: impl Into<String>, url: Url, client: HttpClient) -> Self {
        let proxy = Arc::new(ReverseProxy::new(url.clone(), client));
        Self::new(name, url, proxy)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Set liveness.
    pub fn set_alive(&self, alive: bool) {
        // A poisoned lock still holds a valid bool.
        let mut guard = self.alive.write().unwrap_or_else(|e| e.into_inner());
        *guard = alive;
    }

    /// Return true when the backend is eligible for selection.
    pub fn is_alive(&self) -> bool {
        *self.alive.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Hand the request to this backend's forwarding delegate.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        self.proxy.forward(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::http::proxy::build_client;

    #[test]
    fn test_liveness_flips() {
        let url = Url::parse("http://127.0.0.1:8080").unwrap();
        let backend = Backend::with_client("server-1", url.clone(), build_client(Duration::from_secs(1)));
        assert!(backend.is_alive());
        assert_eq!(backend.url(), &url);
        assert_eq!(backend.name(), "server-1");

        backend.set_alive(false);
        assert!(!backend.is_alive());
        backend.set_alive(true);
        assert!(backend.is_alive());
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let url = Url::parse("http://127.0.0.1:8080").unwrap();
        let backend = Arc::new(Backend::with_client("b", url, build_client(Duration::from_secs(1))));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let backend = backend.clone();
                std::thread::spawn(move || {
                    for n in 0..1000 {
                        if i == 0 {
                            backend.set_alive(n % 2 == 0);
                        } else {
                            let _ = backend.is_alive();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // Last write by the writer thread was n = 999 -> false.
        assert!(!backend.is_alive());
    }
}
