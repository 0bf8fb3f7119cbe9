//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered backend list for the process lifetime
//! - Apply round-robin selection over live backends
//! - Update a backend's liveness by address

use std::sync::Arc;

use url::Url;

use crate::load_balancer::{backend::Backend, round_robin::RoundRobin};

/// Ordered registry of upstream backends.
#[derive(Debug, Default)]
pub struct ServerPool {
    backends: Vec<Arc<Backend>>,
    balancer: RoundRobin,
}

impl ServerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a backend. It is eligible for selection immediately.
    ///
    /// Takes `&mut self`, so backends can only be added before the pool is shared.
    pub fn add_backend(&mut self, backend: Backend) -> Arc<Backend> {
        let backend = Arc::new(backend);
        self.backends.push(backend.clone());
        backend
    }

    /// Advance the shared cursor and return the rotation's starting index.
    /// Returns `None` for an empty pool.
    pub fn next_index(&self) -> Option<usize> {
        if self.backends.is_empty() {
            return None;
        }
        Some(self.balancer.next_index(self.backends.len()))
    }

    /// Select the next alive backend, or `None` when every backend is down.
    pub fn get_next_peer(&self) -> Option<Arc<Backend>> {
        let peer = self.balancer.next_server(&self.backends);
        if peer.is_none() {
            tracing::debug!(backend_count = self.backends.len(), "No alive backends in pool");
        }
        peer
    }

    /// Set liveness of the first backend whose URL equals `url`.
    pub fn mark_backend_status(&self, url: &Url, alive: bool) {
        match self.backends.iter().find(|b| b.url().as_str() == url.as_str()) {
            Some(backend) => backend.set_alive(alive),
            None => tracing::debug!(url = %url, "Status update for unknown backend ignored"),
        }
    }

    /// All backends in registration order (for health checking).
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Backend>> {
        self.backends.get(index)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Number of backends currently alive.
    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }
}
