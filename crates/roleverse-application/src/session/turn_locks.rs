//! Per-session turn locks shared by the resolver and the lifecycle manager.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Registry of per-session exclusive locks.
///
/// Every operation that reads a session, mutates it and writes it back holds
/// that session's lock for the whole read-modify-write, so two turns on the
/// same session never interleave. Different sessions never contend.
#[derive(Default)]
pub struct TurnLocks {
    locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the session's lock and returns its guard.
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().await.get(session_id).cloned();
        let lock = match existing {
            Some(lock) => lock,
            None => self
                .locks
                .write()
                .await
                .entry(session_id.to_string())
                .or_default()
                .clone(),
        };
        lock.lock_owned().await
    }

    /// Drops the lock entry of a deleted session.
    ///
    /// Call while holding the session's guard so queued waiters observe the
    /// deletion when they reload the session.
    pub async fn forget(&self, session_id: &str) {
        self.locks.write().await.remove(session_id);
    }

    /// Number of sessions with a registered lock.
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }
}
