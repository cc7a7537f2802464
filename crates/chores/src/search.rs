//! Global search: one chore searching many containers
//!
//! The accessible-container list is supplied by the caller (role resolution
//! happens upstream) and is visited in the order given. Progress is published
//! as it happens: the total is set once up front, the searched counter ticks
//! after each container, so a poller observes monotonic progress. Matched
//! annotation references accumulate in memory and are paginated once Done.

use annostore_core::{AnnotationRef, Result};
use annostore_query::Stage;
use annostore_store::DocumentStore;
use chrono::Duration;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::chore::Chore;
use crate::status::StatusHandle;

/// A page of global search results
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalResultPage {
    /// Page number, zero-based
    pub page: usize,
    /// Total number of accumulated hits
    pub total: u64,
    /// The references on this page
    pub annotations: Vec<AnnotationRef>,
    /// Whether more pages follow
    pub has_more: bool,
}

/// Cross-container search executed as a background chore
pub struct GlobalSearchChore {
    id: String,
    store: Arc<dyn DocumentStore>,
    container_names: Vec<String>,
    stages: Vec<Stage>,
    status: StatusHandle,
    results: Mutex<Vec<AnnotationRef>>,
}

impl GlobalSearchChore {
    /// Set up a chore over the given containers, compiled stages included
    pub fn new(
        store: Arc<dyn DocumentStore>,
        container_names: Vec<String>,
        query: Value,
        stages: Vec<Stage>,
        time_to_live: Duration,
    ) -> Self {
        GlobalSearchChore {
            id: Uuid::new_v4().to_string(),
            store,
            container_names,
            stages,
            status: StatusHandle::new(Some(query), time_to_live),
            results: Mutex::new(Vec::new()),
        }
    }

    /// Slice the accumulated result set; only meaningful once Done
    pub fn result_page(&self, page: usize, page_size: usize) -> GlobalResultPage {
        let results = self.results.lock();
        let start = page.saturating_mul(page_size).min(results.len());
        let end = (start + page_size).min(results.len());
        GlobalResultPage {
            page,
            total: results.len() as u64,
            annotations: results[start..end].to_vec(),
            has_more: end < results.len(),
        }
    }
}

impl Chore for GlobalSearchChore {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &StatusHandle {
        &self.status
    }

    fn run(&self) -> Result<()> {
        self.status
            .set_total_containers(self.container_names.len() as u32);
        for container in &self.container_names {
            let hits = self.store.execute(container, &self.stages)?;
            debug!(container = container.as_str(), hits = hits.len(), "container searched");
            self.status.add_hits(hits.len() as u64);
            {
                let mut results = self.results.lock();
                results.extend(hits.into_iter().map(|annotation| AnnotationRef {
                    container: container.clone(),
                    annotation: annotation.name,
                }));
            }
            self.status.container_searched();
        }
        Ok(())
    }
}
