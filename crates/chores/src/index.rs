//! Index builds as background chores
//!
//! The caller gets an accepted response with the chore's initial status; the
//! store-level createIndex call happens on a worker. A conflicting index (or
//! any other store failure) surfaces only as a Failed chore status.

use annostore_core::{IndexConfig, Result};
use annostore_store::DocumentStore;
use chrono::Duration;
use std::sync::Arc;
use tracing::info;

use crate::chore::Chore;
use crate::status::StatusHandle;

/// Builds one index on one container
pub struct IndexChore {
    id: String,
    store: Arc<dyn DocumentStore>,
    container: String,
    config: IndexConfig,
    status: StatusHandle,
}

impl IndexChore {
    /// Set up an index build; the chore id doubles as the index id
    pub fn new(
        store: Arc<dyn DocumentStore>,
        container: impl Into<String>,
        index_id: impl Into<String>,
        config: IndexConfig,
        time_to_live: Duration,
    ) -> Self {
        IndexChore {
            id: index_id.into(),
            store,
            container: container.into(),
            config,
            status: StatusHandle::new(None, time_to_live),
        }
    }

    /// The index definition this chore builds
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The container the index is built on
    pub fn container(&self) -> &str {
        &self.container
    }
}

impl Chore for IndexChore {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &StatusHandle {
        &self.status
    }

    fn run(&self) -> Result<()> {
        let name = self
            .store
            .create_index(&self.container, &self.id, &self.config)?;
        info!(container = self.container.as_str(), index = %name, "created index");
        Ok(())
    }
}
