//! Chore status: state machine and published snapshots
//!
//! States move Created → Running → (Done | Failed), each terminal state
//! entered exactly once. The record behind a [`StatusHandle`] is written by
//! the worker thread and read by pollers; pollers always get a consistent
//! snapshot, never a half-updated view. The containers-searched counter is an
//! atomic published separately so progress is monotonic under polling.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Lifecycle state of a chore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChoreState {
    /// Accepted, not yet picked up by a worker
    Created,
    /// Executing on a worker
    Running,
    /// Finished successfully
    Done,
    /// Finished with a recorded error
    Failed,
}

impl ChoreState {
    /// Whether the state is terminal (Done or Failed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChoreState::Done | ChoreState::Failed)
    }
}

#[derive(Debug)]
struct StatusRecord {
    state: ChoreState,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    errors: Vec<String>,
    total_containers_to_search: u32,
    hits_found: u64,
}

#[derive(Debug)]
struct StatusInner {
    query: Option<Value>,
    time_to_live: Duration,
    record: Mutex<StatusRecord>,
    containers_searched: AtomicU32,
}

/// Shared handle to one chore's status
#[derive(Debug, Clone)]
pub struct StatusHandle {
    inner: Arc<StatusInner>,
}

impl StatusHandle {
    /// Fresh status in the Created state
    ///
    /// `query` is echoed in summaries for search chores; index chores pass
    /// None. `time_to_live` is how long a terminal chore stays pollable.
    pub fn new(query: Option<Value>, time_to_live: Duration) -> Self {
        StatusHandle {
            inner: Arc::new(StatusInner {
                query,
                time_to_live,
                record: Mutex::new(StatusRecord {
                    state: ChoreState::Created,
                    start_time: None,
                    end_time: None,
                    errors: Vec::new(),
                    total_containers_to_search: 0,
                    hits_found: 0,
                }),
                containers_searched: AtomicU32::new(0),
            }),
        }
    }

    /// Created → Running, stamping the start time
    pub fn begin(&self) {
        let mut record = self.inner.record.lock();
        if record.state != ChoreState::Created {
            warn!(state = ?record.state, "begin() on a chore that already started");
            return;
        }
        record.state = ChoreState::Running;
        record.start_time = Some(Utc::now());
    }

    /// Running → Done, stamping the end time
    pub fn finish(&self) {
        let mut record = self.inner.record.lock();
        if record.state.is_terminal() {
            warn!(state = ?record.state, "finish() on a terminal chore");
            return;
        }
        record.state = ChoreState::Done;
        record.end_time = Some(Utc::now());
    }

    /// → Failed, recording the error as "kind: message"
    pub fn fail(&self, kind: &str, message: &str) {
        let mut record = self.inner.record.lock();
        if record.state.is_terminal() {
            warn!(state = ?record.state, "fail() on a terminal chore");
            return;
        }
        record.state = ChoreState::Failed;
        record.end_time = Some(Utc::now());
        record.errors.push(format!("{kind}: {message}"));
    }

    /// Current state
    pub fn state(&self) -> ChoreState {
        self.inner.record.lock().state
    }

    /// Set once, up front, by a global search chore
    pub fn set_total_containers(&self, total: u32) {
        self.inner.record.lock().total_containers_to_search = total;
    }

    /// Incremented after each container finishes
    pub fn container_searched(&self) {
        self.inner.containers_searched.fetch_add(1, Ordering::Release);
    }

    /// Add to the running hit tally
    pub fn add_hits(&self, hits: u64) {
        self.inner.record.lock().hits_found += hits;
    }

    /// When a terminal chore becomes purgeable (end time + TTL)
    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        let record = self.inner.record.lock();
        record.end_time.map(|end| end + self.inner.time_to_live)
    }

    /// Terminal and past its expiration time
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let record = self.inner.record.lock();
        record.state.is_terminal()
            && record
                .end_time
                .map(|end| end + self.inner.time_to_live < now)
                .unwrap_or(false)
    }

    /// A consistent snapshot for pollers
    pub fn summary(&self) -> StatusSummary {
        let record = self.inner.record.lock();
        let processing_time = match (record.start_time, record.end_time) {
            (Some(start), Some(end)) => (end - start).num_milliseconds(),
            (Some(start), None) => (Utc::now() - start).num_milliseconds(),
            _ => 0,
        };
        StatusSummary {
            query: self.inner.query.clone(),
            started_at: record.start_time,
            finished_at: record.end_time,
            expires_after: record.end_time.map(|end| end + self.inner.time_to_live),
            state: record.state,
            containers_searched: self.inner.containers_searched.load(Ordering::Acquire),
            total_containers_to_search: record.total_containers_to_search,
            hits_found_so_far: record.hits_found,
            errors: record.errors.clone(),
            processing_time_in_millis: processing_time,
        }
    }
}

/// Serialized status snapshot, the shape clients poll
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    /// The query this chore executes (search chores only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    /// When the chore entered Running
    pub started_at: Option<DateTime<Utc>>,
    /// When the chore reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
    /// When a terminal chore becomes purgeable
    pub expires_after: Option<DateTime<Utc>>,
    /// Current lifecycle state
    pub state: ChoreState,
    /// Containers fully searched so far
    pub containers_searched: u32,
    /// Total containers this search will visit, set once up front
    pub total_containers_to_search: u32,
    /// Matches accumulated so far
    pub hits_found_so_far: u64,
    /// Recorded errors ("kind: message"), non-empty iff Failed
    pub errors: Vec<String>,
    /// Elapsed execution time in milliseconds
    pub processing_time_in_millis: i64,
}
