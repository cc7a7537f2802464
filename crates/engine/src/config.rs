//! Engine configuration
//!
//! Plain data with defaults; loading from files or the environment is the
//! embedding application's concern.

use serde::Deserialize;

/// Tunables for one [`crate::Repository`] instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepositoryConfig {
    /// Page size for every paginated read
    pub page_size: usize,
    /// The selector type the range functions match on
    pub range_selector_type: String,
    /// Maximum number of cached search sessions
    pub search_cache_capacity: usize,
    /// Seconds since last access before a cached search expires
    pub search_cache_ttl_secs: u64,
    /// Seconds a terminal chore stays pollable
    pub chore_ttl_secs: u64,
    /// Seconds between purge sweeps
    pub sweep_interval_secs: u64,
    /// Worker threads executing background chores
    pub worker_threads: usize,
    /// Maximum queued chores before submissions are rejected
    pub max_queue_depth: usize,
    /// Maximum number of cached distinct-value listings
    pub distinct_cache_capacity: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            page_size: 100,
            range_selector_type: "TextAnchorSelector".to_string(),
            search_cache_capacity: 1000,
            search_cache_ttl_secs: 3600,
            chore_ttl_secs: 3600,
            sweep_interval_secs: 3600,
            worker_threads: 4,
            max_queue_depth: 1024,
            distinct_cache_capacity: 100,
        }
    }
}
