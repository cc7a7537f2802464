//! The repository facade: containers and annotations
//!
//! Every mutation takes the owning container's lock, verifies any declared
//! version precondition, applies the document change through the store, and
//! updates the field-count ledger before releasing — both succeed or the
//! operation fails with no silently diverging ledger state.

use annostore_core::{
    annotation_tag, container_tag, extract_field_paths, is_valid_name, Annotation,
    ContainerMetadata, Error, ResourceKind, Result, VersionTag,
};
use annostore_chores::{ChoreRegistry, GlobalSearchChore, IndexChore, Sweeper, WorkerPool};
use annostore_query::QueryCompiler;
use annostore_store::DocumentStore;
use chrono::Utc;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::SearchCache;
use crate::catalogue::CustomQueryCatalogue;
use crate::config::RepositoryConfig;
use crate::controller::{
    update_field_counts, verify_annotation_tag, verify_container_tag, ConcurrencyController,
};

/// A container read: metadata snapshot, current tag, document count
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    /// The metadata record, ledger included
    pub metadata: ContainerMetadata,
    /// Current container version tag
    pub tag: VersionTag,
    /// Number of stored annotations
    pub annotation_count: u64,
}

/// An annotation read or mutation result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationInfo {
    /// The owning container
    pub container: String,
    /// The assigned annotation name
    pub name: String,
    /// The stored content
    pub content: Value,
    /// Current annotation version tag
    pub tag: VersionTag,
}

/// The annotation repository engine
pub struct Repository {
    pub(crate) config: RepositoryConfig,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) controller: ConcurrencyController,
    pub(crate) compiler: QueryCompiler,
    pub(crate) search_cache: Arc<SearchCache>,
    pub(crate) distinct_cache: Mutex<LruCache<String, Vec<Value>>>,
    pub(crate) custom_queries: CustomQueryCatalogue,
    pub(crate) pool: WorkerPool,
    pub(crate) search_chores: Arc<ChoreRegistry<GlobalSearchChore>>,
    pub(crate) index_chores: Arc<ChoreRegistry<IndexChore>>,
    sweeper: Sweeper,
}

impl Repository {
    /// Build a repository over the given document store
    pub fn new(store: Arc<dyn DocumentStore>, config: RepositoryConfig) -> Self {
        let search_cache = Arc::new(SearchCache::new(
            config.search_cache_capacity,
            Duration::from_secs(config.search_cache_ttl_secs),
        ));
        let search_chores = Arc::new(ChoreRegistry::new());
        let index_chores = Arc::new(ChoreRegistry::new());

        let sweeper = {
            let search_cache = Arc::clone(&search_cache);
            let search_chores: Arc<ChoreRegistry<GlobalSearchChore>> = Arc::clone(&search_chores);
            let index_chores: Arc<ChoreRegistry<IndexChore>> = Arc::clone(&index_chores);
            Sweeper::start(Duration::from_secs(config.sweep_interval_secs), move || {
                let now = Utc::now();
                search_chores.purge_expired(now);
                index_chores.purge_expired(now);
                search_cache.purge_expired();
            })
        };

        let distinct_capacity =
            NonZeroUsize::new(config.distinct_cache_capacity.max(1)).expect("capacity is at least 1");

        Repository {
            compiler: QueryCompiler::new(config.range_selector_type.clone()),
            pool: WorkerPool::new(config.worker_threads, config.max_queue_depth),
            distinct_cache: Mutex::new(LruCache::new(distinct_capacity)),
            custom_queries: CustomQueryCatalogue::new(),
            controller: ConcurrencyController::new(),
            search_cache,
            search_chores,
            index_chores,
            sweeper,
            store,
            config,
        }
    }

    /// Stop the sweeper and the worker pool, joining their threads
    pub fn shutdown(&self) {
        self.sweeper.shutdown();
        self.pool.shutdown();
    }

    /// Block until all accepted chores have completed (test support)
    pub fn drain_chores(&self) {
        self.pool.drain();
    }

    /// The configured page size
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    // =========================================================================
    // Containers
    // =========================================================================

    /// Create a container
    ///
    /// A taken slug falls back to a generated name; an invalid slug is
    /// rejected outright.
    pub fn create_container(&self, slug: Option<&str>, label: &str) -> Result<ContainerInfo> {
        let mut name = match slug {
            Some(slug) if !is_valid_name(slug) => {
                return Err(Error::InvalidName(slug.to_string()))
            }
            Some(slug) => slug.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        if self.controller.contains(&name) {
            warn!(
                suggested = name.as_str(),
                "a container with the suggested name already exists, generating a new name"
            );
            name = Uuid::new_v4().to_string();
        }
        if !self.controller.register(ContainerMetadata::new(name.clone(), label)) {
            return Err(Error::Storage(format!(
                "container '{name}' was created concurrently"
            )));
        }
        if let Err(e) = self.store.create_collection(&name) {
            self.controller.remove(&name);
            return Err(e);
        }
        info!(container = name.as_str(), "created container");
        self.container_info(&name)
    }

    /// Read a container's metadata, tag and size
    pub fn container_info(&self, name: &str) -> Result<ContainerInfo> {
        let metadata = self.controller.metadata(name)?;
        Ok(ContainerInfo {
            tag: container_tag(name),
            annotation_count: self.store.document_count(name)?,
            metadata,
        })
    }

    /// All container names, sorted
    pub fn container_names(&self) -> Vec<String> {
        self.controller.names()
    }

    /// Delete a container
    ///
    /// A declared version precondition is verified first. A non-empty
    /// container is only deleted when `force` is set.
    pub fn delete_container(
        &self,
        name: &str,
        tag: Option<&VersionTag>,
        force: bool,
    ) -> Result<()> {
        let handle = self.controller.get(name)?;
        let metadata = handle.lock();
        verify_container_tag(name, tag)?;
        let count = self.store.document_count(name)?;
        if count > 0 && !force {
            return Err(Error::ContainerNotEmpty(name.to_string()));
        }
        self.store.drop_collection(name)?;
        drop(metadata);
        self.controller.remove(name);
        info!(container = name, forced = force, "deleted container");
        Ok(())
    }

    /// Turn anonymous read access for a container on or off
    pub fn set_anonymous_read(&self, name: &str, setting: bool) -> Result<()> {
        let handle = self.controller.get(name)?;
        handle.lock().read_only_for_anonymous = setting;
        Ok(())
    }

    /// The container's field-count ledger, verbatim
    pub fn field_counts(&self, name: &str) -> Result<BTreeMap<String, u64>> {
        Ok(self.controller.metadata(name)?.field_counts)
    }

    /// Rebuild a container's ledger from its stored annotations
    pub fn recalculate_field_counts(&self, name: &str) -> Result<BTreeMap<String, u64>> {
        let handle = self.controller.get(name)?;
        let mut metadata = handle.lock();
        let annotations = self.store.execute(name, &[])?;
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for annotation in &annotations {
            for path in extract_field_paths(&annotation.content) {
                if !path.contains('@') {
                    *counts.entry(path).or_insert(0) += 1;
                }
            }
        }
        metadata.field_counts = counts.clone();
        info!(container = name, fields = counts.len(), "recalculated field counts");
        Ok(counts)
    }

    /// Distinct values of one content field, cached per collection size
    pub fn distinct_values(&self, name: &str, field: &str) -> Result<Vec<Value>> {
        let size = self.store.document_count(name)?;
        let cache_key = format!("{name}:{size}:{field}");
        if let Some(values) = self.distinct_cache.lock().get(&cache_key) {
            return Ok(values.clone());
        }
        let values = self.store.distinct(name, field)?;
        self.distinct_cache.lock().put(cache_key, values.clone());
        Ok(values)
    }

    // =========================================================================
    // Annotations
    // =========================================================================

    /// Create an annotation; a taken slug falls back to a generated name
    pub fn create_annotation(
        &self,
        container: &str,
        slug: Option<&str>,
        content: Value,
    ) -> Result<AnnotationInfo> {
        let handle = self.controller.get(container)?;
        let mut metadata = handle.lock();

        let mut name = slug
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.store.get(container, &name)?.is_some() {
            warn!(
                container,
                suggested = name.as_str(),
                "an annotation with the suggested name already exists, generating a new name"
            );
            name = Uuid::new_v4().to_string();
        }

        let added = extract_field_paths(&content);
        self.store
            .insert(container, Annotation::new(name.clone(), content.clone()))?;
        update_field_counts(&mut metadata.field_counts, &added, &[]);
        metadata.modified_at = Utc::now();

        Ok(AnnotationInfo {
            tag: annotation_tag(container, &name),
            container: container.to_string(),
            name,
            content,
        })
    }

    /// Read one annotation
    pub fn get_annotation(&self, container: &str, name: &str) -> Result<AnnotationInfo> {
        self.controller.get(container)?;
        let annotation = self
            .store
            .get(container, name)?
            .ok_or_else(|| Error::not_found(ResourceKind::Annotation, name))?;
        Ok(AnnotationInfo {
            tag: annotation_tag(container, name),
            container: container.to_string(),
            name: annotation.name,
            content: annotation.content,
        })
    }

    /// Replace an annotation's content
    ///
    /// The declared version precondition is verified before any effect; the
    /// ledger moves by the delta between old and new content.
    pub fn replace_annotation(
        &self,
        container: &str,
        name: &str,
        tag: Option<&VersionTag>,
        content: Value,
    ) -> Result<AnnotationInfo> {
        let handle = self.controller.get(container)?;
        let mut metadata = handle.lock();
        verify_annotation_tag(container, name, tag)?;

        let old = self
            .store
            .get(container, name)?
            .ok_or_else(|| Error::not_found(ResourceKind::Annotation, name))?;

        self.store
            .replace(container, Annotation::new(name, content.clone()))?;
        let added = extract_field_paths(&content);
        let removed = extract_field_paths(&old.content);
        update_field_counts(&mut metadata.field_counts, &added, &removed);
        metadata.modified_at = Utc::now();

        Ok(AnnotationInfo {
            tag: annotation_tag(container, name),
            container: container.to_string(),
            name: name.to_string(),
            content,
        })
    }

    /// Delete an annotation, verifying any declared version precondition
    pub fn delete_annotation(
        &self,
        container: &str,
        name: &str,
        tag: Option<&VersionTag>,
    ) -> Result<()> {
        let handle = self.controller.get(container)?;
        let mut metadata = handle.lock();
        verify_annotation_tag(container, name, tag)?;

        let old = self
            .store
            .get(container, name)?
            .ok_or_else(|| Error::not_found(ResourceKind::Annotation, name))?;

        self.store.delete(container, name)?;
        let removed = extract_field_paths(&old.content);
        update_field_counts(&mut metadata.field_counts, &[], &removed);
        metadata.modified_at = Utc::now();
        Ok(())
    }
}
