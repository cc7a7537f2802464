//! Keyed chore registries and the periodic purge sweeper
//!
//! Each chore family (global searches, index builds) gets its own registry.
//! Concurrent chores own disjoint keys, so atomic insert/remove on the
//! underlying map is all the coordination needed. The sweeper wakes on a
//! fixed interval and removes terminal chores whose TTL has elapsed; it never
//! touches a running chore.

use annostore_core::{Error, ResourceKind, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

use crate::chore::Chore;

/// Concurrency-safe keyed store of active chores
pub struct ChoreRegistry<C: Chore> {
    chores: DashMap<String, Arc<C>>,
}

impl<C: Chore> ChoreRegistry<C> {
    /// Empty registry
    pub fn new() -> Self {
        ChoreRegistry {
            chores: DashMap::new(),
        }
    }

    /// Register a chore under its id
    pub fn insert(&self, chore: Arc<C>) {
        self.chores.insert(chore.id().to_string(), chore);
    }

    /// Look up a chore; NotFound once purged or never registered
    pub fn get(&self, id: &str) -> Result<Arc<C>> {
        self.chores
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::not_found(ResourceKind::Chore, id))
    }

    /// Remove a chore (e.g. when submission to the pool was rejected)
    pub fn remove(&self, id: &str) {
        self.chores.remove(id);
    }

    /// Remove terminal chores whose expiration time lies before `now`
    ///
    /// Running chores are never removed. Returns how many were purged.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .chores
            .iter()
            .filter(|entry| entry.value().status().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();
        for id in &expired {
            self.chores.remove(id);
        }
        if !expired.is_empty() {
            debug!(purged = expired.len(), "purged expired chores");
        }
        expired.len()
    }

    /// Number of registered chores
    pub fn len(&self) -> usize {
        self.chores.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.chores.is_empty()
    }
}

impl<C: Chore> Default for ChoreRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

struct SweeperShared {
    stop: AtomicBool,
    gate: Mutex<()>,
    wake: Condvar,
}

/// Periodic background sweep running a purge closure on a fixed interval
pub struct Sweeper {
    shared: Arc<SweeperShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Start sweeping: `sweep` runs every `interval` until shutdown
    pub fn start(interval: Duration, sweep: impl Fn() + Send + 'static) -> Self {
        let shared = Arc::new(SweeperShared {
            stop: AtomicBool::new(false),
            gate: Mutex::new(()),
            wake: Condvar::new(),
        });
        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("annostore-sweeper".to_string())
            .spawn(move || loop {
                {
                    let mut gate = thread_shared.gate.lock();
                    thread_shared.wake.wait_for(&mut gate, interval);
                }
                if thread_shared.stop.load(Ordering::Acquire) {
                    return;
                }
                sweep();
            })
            .expect("failed to spawn sweeper thread");
        Sweeper {
            shared,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stop the sweeper and join its thread
    pub fn shutdown(&self) {
        self.shared.stop.store(true, Ordering::Release);
        {
            let _gate = self.shared.gate.lock();
            self.shared.wake.notify_all();
        }
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ChoreState, StatusHandle};
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct StubChore {
        id: String,
        status: StatusHandle,
    }

    impl StubChore {
        fn new(id: &str, ttl: ChronoDuration) -> Arc<Self> {
            Arc::new(StubChore {
                id: id.to_string(),
                status: StatusHandle::new(None, ttl),
            })
        }
    }

    impl Chore for StubChore {
        fn id(&self) -> &str {
            &self.id
        }
        fn status(&self) -> &StatusHandle {
            &self.status
        }
        fn run(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_insert_and_get() {
        let registry = ChoreRegistry::new();
        let chore = StubChore::new("c1", ChronoDuration::hours(1));
        registry.insert(Arc::clone(&chore));
        assert_eq!(registry.get("c1").unwrap().id(), "c1");
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let registry: ChoreRegistry<StubChore> = ChoreRegistry::new();
        let err = registry.get("missing").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_purge_removes_expired_terminal_chores() {
        let registry = ChoreRegistry::new();

        // Done with zero TTL: purgeable immediately
        let done = StubChore::new("done", ChronoDuration::zero());
        done.status.begin();
        done.status.finish();
        registry.insert(Arc::clone(&done));

        // Done with a long TTL: retained
        let fresh = StubChore::new("fresh", ChronoDuration::hours(1));
        fresh.status.begin();
        fresh.status.finish();
        registry.insert(Arc::clone(&fresh));

        // Still running: never purged
        let running = StubChore::new("running", ChronoDuration::zero());
        running.status.begin();
        registry.insert(Arc::clone(&running));

        let purged = registry.purge_expired(Utc::now() + ChronoDuration::seconds(1));
        assert_eq!(purged, 1);
        assert!(registry.get("done").is_err());
        assert!(registry.get("fresh").is_ok());
        assert!(registry.get("running").is_ok());
        assert_eq!(running.status.state(), ChoreState::Running);
    }

    #[test]
    fn test_purge_removes_expired_failed_chores() {
        let registry = ChoreRegistry::new();
        let failed = StubChore::new("failed", ChronoDuration::zero());
        failed.status.begin();
        failed.status.fail("Storage", "boom");
        registry.insert(Arc::clone(&failed));

        let purged = registry.purge_expired(Utc::now() + ChronoDuration::seconds(1));
        assert_eq!(purged, 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sweeper_runs_and_shuts_down() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = Arc::clone(&ticks);
        let sweeper = Sweeper::start(Duration::from_millis(10), move || {
            t.fetch_add(1, Ordering::Relaxed);
        });
        std::thread::sleep(Duration::from_millis(60));
        sweeper.shutdown();
        let after_shutdown = ticks.load(Ordering::Relaxed);
        assert!(after_shutdown >= 1);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(ticks.load(Ordering::Relaxed), after_shutdown);
    }
}
