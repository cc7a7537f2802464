//! Index operations: accepted as chores, catalogued on the container
//!
//! The definition is recorded in the container's index map the moment the
//! request is accepted; the store-level build runs on the worker pool. A
//! build failure is visible only through the chore's status — the caller
//! already has its accepted response.

use annostore_chores::{execute_chore, Chore, IndexChore, StatusSummary};
use annostore_core::{Error, IndexConfig, IndexField, IndexKind, ResourceKind, Result};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use uuid::Uuid;

use crate::repository::Repository;

impl Repository {
    /// Accept a multi-field index build; returns the index id and the
    /// chore's initial status
    ///
    /// `fields` pairs each field path with an index kind name (ascending,
    /// descending, hashed, text). The partial filter requires the first
    /// field to exist.
    pub fn add_index(
        &self,
        container: &str,
        fields: &[(String, String)],
    ) -> Result<(String, StatusSummary)> {
        let handle = self.controller.get(container)?;

        let mut parsed = Vec::with_capacity(fields.len());
        for (path, kind_name) in fields {
            let kind = IndexKind::parse(kind_name).ok_or_else(|| {
                Error::invalid_query(format!(
                    "unknown index kind '{kind_name}'; expected one of: ascending, descending, hashed, text"
                ))
            })?;
            parsed.push(IndexField {
                path: path.clone(),
                kind,
            });
        }
        if parsed.is_empty() {
            return Err(Error::invalid_query("at least one indexed field is required"));
        }

        let config = IndexConfig {
            partial_filter_field: Some(parsed[0].path.clone()),
            fields: parsed,
        };
        let index_id = Uuid::new_v4().to_string();
        handle
            .lock()
            .indexes
            .insert(index_id.clone(), config.clone());

        let chore = Arc::new(IndexChore::new(
            Arc::clone(&self.store),
            container,
            index_id.clone(),
            config,
            ChronoDuration::seconds(self.config.chore_ttl_secs as i64),
        ));
        self.index_chores.insert(Arc::clone(&chore));

        // snapshot before submission so the caller sees the accepted state
        let initial_status = chore.status().summary();
        let task = Arc::clone(&chore);
        if let Err(e) = self.pool.submit(move || execute_chore(task.as_ref())) {
            self.index_chores.remove(&index_id);
            handle.lock().indexes.remove(&index_id);
            return Err(e);
        }
        Ok((index_id, initial_status))
    }

    /// Read one index definition
    pub fn index_definition(&self, container: &str, index_id: &str) -> Result<IndexConfig> {
        self.controller
            .metadata(container)?
            .indexes
            .get(index_id)
            .cloned()
            .ok_or_else(|| Error::not_found(ResourceKind::Index, index_id))
    }

    /// All index definitions on a container, keyed by id
    pub fn list_indexes(&self, container: &str) -> Result<Vec<(String, IndexConfig)>> {
        Ok(self
            .controller
            .metadata(container)?
            .indexes
            .into_iter()
            .collect())
    }

    /// Poll an index build's status; NotFound once purged
    pub fn index_status(&self, index_id: &str) -> Result<StatusSummary> {
        Ok(self.index_chores.get(index_id)?.status().summary())
    }

    /// Delete an index: drop it from the store and the container's catalogue
    pub fn delete_index(&self, container: &str, index_id: &str) -> Result<()> {
        let handle = self.controller.get(container)?;
        let mut metadata = handle.lock();
        if metadata.indexes.remove(index_id).is_none() {
            return Err(Error::not_found(ResourceKind::Index, index_id));
        }
        self.store.drop_index(container, index_id)?;
        Ok(())
    }
}
