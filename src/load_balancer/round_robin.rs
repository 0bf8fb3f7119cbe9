//! Round-robin selection that skips dead backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::Backend;

/// Round-robin selector.
/// Stores the shared cursor used to pick a rotating starting point.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the cursor once and map it onto `len` slots.
    ///
    /// Every caller observes a distinct cursor value. `len` must be non-zero.
    pub fn next_index(&self, len: usize) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed).wrapping_add(1) % len
    }

    /// Pick the first alive backend at or after the next index.
    ///
    /// When dead entries were skipped, the cursor jumps to the backend found so
    /// the next call resumes rotation from there. Concurrent callers may
    /// overwrite each other's jump; selection stays correct either way.
    pub fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        let len = backends.len();
        let start = self.next_index(len);

        for i in start..start + len {
            let index = i % len;
            let backend = &backends[index];
            if backend.is_alive() {
                if i != start {
                    self.cursor.store(index, Ordering::Relaxed);
                }
                return Some(backend.clone());
            }
        }
        None
    }
}
