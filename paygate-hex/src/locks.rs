//! Per-key async locks.
//!
//! Serializes work on the same key (a gateway transaction reference) while
//! letting different keys proceed in parallel. Entries are removed once the
//! last holder or waiter lets go, so the map only holds keys in flight.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Held lock for one key. Released on drop.
pub struct KeyGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds `key`.
    ///
    /// Cancel safe: a waiter dropped before it acquires still removes the
    /// entry if nobody else is using it.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        // Built before waiting so its drop runs the cleanup on cancellation too.
        let mut held = KeyGuard {
            key: key.to_string(),
            guard: None,
            locks: self.locks.clone(),
        };
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        // The pending acquire owns the only extra handle, and is dropped before `held`.
        held.guard = Some(mutex.lock_owned().await);
        held
    }

    /// Number of keys currently locked or waited on.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Release first so the strong count below only sees the map and any waiters.
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
