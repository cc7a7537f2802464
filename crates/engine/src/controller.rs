//! Per-resource concurrency control and the field-count ledger
//!
//! Each registered container carries one mutex around its metadata record.
//! A mutation takes that lock first, verifies any declared version
//! precondition, applies the document change, and updates the ledger before
//! releasing — so ledger updates to one container are serialized while
//! different containers proceed fully independently.
//!
//! Version tags are pure functions of resource identity: verification
//! recomputes the current tag and compares. A mismatch aborts before any
//! effect.

use annostore_core::{
    annotation_tag, container_tag, ContainerMetadata, Error, ResourceKind, Result, VersionTag,
};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One container's lockable metadata record
#[derive(Debug)]
pub struct ContainerHandle {
    metadata: Mutex<ContainerMetadata>,
}

impl ContainerHandle {
    /// Take the container's single-writer lock
    pub fn lock(&self) -> MutexGuard<'_, ContainerMetadata> {
        self.metadata.lock()
    }
}

/// Registry of live containers, keyed by name
pub struct ConcurrencyController {
    containers: DashMap<String, Arc<ContainerHandle>>,
}

impl ConcurrencyController {
    /// Empty controller
    pub fn new() -> Self {
        ConcurrencyController {
            containers: DashMap::new(),
        }
    }

    /// Atomically register a container; false if the name is taken
    pub fn register(&self, metadata: ContainerMetadata) -> bool {
        match self.containers.entry(metadata.name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(ContainerHandle {
                    metadata: Mutex::new(metadata),
                }));
                true
            }
        }
    }

    /// Whether a container with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.containers.contains_key(name)
    }

    /// Get a container's handle; NotFound otherwise
    pub fn get(&self, name: &str) -> Result<Arc<ContainerHandle>> {
        self.containers
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::not_found(ResourceKind::Container, name))
    }

    /// Snapshot of a container's metadata
    pub fn metadata(&self, name: &str) -> Result<ContainerMetadata> {
        Ok(self.get(name)?.lock().clone())
    }

    /// Drop a container's registration
    pub fn remove(&self, name: &str) {
        self.containers.remove(name);
    }

    /// All registered container names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .containers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }
}

impl Default for ConcurrencyController {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a container-level version precondition, if one was declared
pub fn verify_container_tag(container: &str, supplied: Option<&VersionTag>) -> Result<()> {
    match supplied {
        None => Ok(()),
        Some(tag) if *tag == container_tag(container) => Ok(()),
        Some(_) => Err(Error::precondition_failed(container)),
    }
}

/// Check an annotation-level version precondition, if one was declared
pub fn verify_annotation_tag(
    container: &str,
    annotation: &str,
    supplied: Option<&VersionTag>,
) -> Result<()> {
    match supplied {
        None => Ok(()),
        Some(tag) if *tag == annotation_tag(container, annotation) => Ok(()),
        Some(_) => Err(Error::precondition_failed(format!(
            "{container}/{annotation}"
        ))),
    }
}

/// Apply one mutation's path delta to a container's field-count ledger
///
/// Paths containing '@' (linked-data metadata) are excluded. Occurrences in
/// `added` increment, occurrences in `removed` decrement; entries reaching 0
/// are deleted. Inputs are occurrence multisets, so a path repeated across
/// list entries moves the count once per occurrence.
pub fn update_field_counts(
    field_counts: &mut BTreeMap<String, u64>,
    added: &[String],
    removed: &[String],
) {
    for path in added.iter().filter(|p| !p.contains('@')) {
        *field_counts.entry(path.clone()).or_insert(0) += 1;
    }
    for path in removed.iter().filter(|p| !p.contains('@')) {
        if let Some(count) = field_counts.get_mut(path) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                field_counts.remove(path);
            }
        }
    }
}
