//! Query-result cache for per-container search sessions
//!
//! Keyed by search id. An entry holds the original query, the compiled stage
//! list, and a lazily computed hit count. Eviction is by capacity (least
//! recently used beyond the bound) and by access-refreshing TTL: every read
//! restamps the entry, an entry untouched for the TTL is gone on its next
//! access and at the periodic sweep.
//!
//! The hit count is computed at most once per entry and never recomputed:
//! later document mutations do not invalidate it, so a pagination session
//! keeps a stable total for its whole lifetime.

use annostore_core::{Error, ResourceKind, Result};
use annostore_query::Stage;
use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::debug;

struct SearchEntry {
    query: Value,
    stages: Vec<Stage>,
    hit_count: Option<u64>,
    last_access: Instant,
}

/// TTL + LRU bounded cache of compiled search sessions
pub struct SearchCache {
    entries: Mutex<LruCache<String, SearchEntry>>,
    time_to_live: Duration,
}

impl SearchCache {
    /// Cache holding at most `capacity` entries, each for `time_to_live`
    /// since its last access
    pub fn new(capacity: usize, time_to_live: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        SearchCache {
            entries: Mutex::new(LruCache::new(capacity)),
            time_to_live,
        }
    }

    /// Store a freshly compiled search session
    pub fn put(&self, search_id: String, query: Value, stages: Vec<Stage>) {
        let mut entries = self.entries.lock();
        entries.put(
            search_id,
            SearchEntry {
                query,
                stages,
                hit_count: None,
                last_access: Instant::now(),
            },
        );
    }

    /// The compiled stage list; NotFound when unknown or expired
    pub fn stages(&self, search_id: &str) -> Result<Vec<Stage>> {
        self.read(search_id, |entry| entry.stages.clone())
    }

    /// The original query; NotFound when unknown or expired
    pub fn query(&self, search_id: &str) -> Result<Value> {
        self.read(search_id, |entry| entry.query.clone())
    }

    /// The hit count, computing it on first use and freezing it after
    ///
    /// `compute` runs outside the cache lock; if the entry was evicted while
    /// computing, the computed value is returned without being stored.
    pub fn hit_count_or_compute(
        &self,
        search_id: &str,
        compute: impl FnOnce(&[Stage]) -> Result<u64>,
    ) -> Result<u64> {
        let stages = {
            let mut entries = self.entries.lock();
            let entry = self.live_entry(&mut entries, search_id)?;
            if let Some(count) = entry.hit_count {
                return Ok(count);
            }
            entry.stages.clone()
        };

        let count = compute(&stages)?;

        let mut entries = self.entries.lock();
        match entries.get_mut(search_id) {
            Some(entry) => {
                // first writer wins; the count stays immutable afterwards
                let frozen = *entry.hit_count.get_or_insert(count);
                entry.last_access = Instant::now();
                Ok(frozen)
            }
            None => Ok(count),
        }
    }

    /// Drop entries whose TTL elapsed; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_access) > self.time_to_live)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            entries.pop(id);
        }
        if !expired.is_empty() {
            debug!(purged = expired.len(), "purged expired search sessions");
        }
        expired.len()
    }

    /// Number of live entries (expired ones included until purged)
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn read<R>(&self, search_id: &str, extract: impl FnOnce(&SearchEntry) -> R) -> Result<R> {
        let mut entries = self.entries.lock();
        let entry = self.live_entry(&mut entries, search_id)?;
        Ok(extract(entry))
    }

    /// Fetch an entry, dropping it when expired and refreshing it otherwise
    fn live_entry<'a>(
        &self,
        entries: &'a mut LruCache<String, SearchEntry>,
        search_id: &str,
    ) -> Result<&'a mut SearchEntry> {
        let expired = entries
            .peek(search_id)
            .map(|entry| entry.last_access.elapsed() > self.time_to_live)
            .ok_or_else(|| Error::not_found(ResourceKind::Search, search_id))?;
        if expired {
            entries.pop(search_id);
            return Err(Error::not_found(ResourceKind::Search, search_id));
        }
        let entry = entries
            .get_mut(search_id)
            .ok_or_else(|| Error::not_found(ResourceKind::Search, search_id))?;
        entry.last_access = Instant::now();
        Ok(entry)
    }
}
