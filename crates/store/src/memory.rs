//! In-memory document store
//!
//! Collections are kept in a concurrent map; each collection guards its
//! documents (insertion-ordered) and its index catalogue with its own lock,
//! so different collections never contend. Stored documents are materialized
//! with the annotation content under the `annotation` root, the shape every
//! compiled field path addresses.

use annostore_core::{Annotation, Error, IndexConfig, ResourceKind, Result};
use annostore_query::{Stage, CONTENT_ROOT_PREFIX};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::eval::{filter_matches, resolve};
use crate::traits::DocumentStore;

struct StoredDocument {
    name: String,
    root: Value,
}

impl StoredDocument {
    fn new(annotation: Annotation) -> Self {
        let root = json!({
            "annotation_name": annotation.name,
            "annotation": annotation.content,
        });
        StoredDocument {
            name: annotation.name,
            root,
        }
    }

    fn to_annotation(&self) -> Annotation {
        Annotation {
            name: self.name.clone(),
            content: self.root["annotation"].clone(),
        }
    }
}

#[derive(Default)]
struct Collection {
    documents: RwLock<Vec<StoredDocument>>,
    indexes: RwLock<Vec<(String, IndexConfig)>>,
}

/// In-memory [`DocumentStore`] implementation
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Arc<Collection>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        MemoryStore {
            collections: DashMap::new(),
        }
    }

    fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.collections
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::not_found(ResourceKind::Container, name))
    }
}

impl DocumentStore for MemoryStore {
    fn create_collection(&self, collection: &str) -> Result<()> {
        match self.collections.entry(collection.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::Storage(format!(
                "collection '{collection}' already exists"
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(Collection::default()));
                debug!(collection, "created collection");
                Ok(())
            }
        }
    }

    fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collections
            .remove(collection)
            .map(|_| debug!(collection, "dropped collection"))
            .ok_or_else(|| Error::not_found(ResourceKind::Container, collection))
    }

    fn collection_exists(&self, collection: &str) -> bool {
        self.collections.contains_key(collection)
    }

    fn document_count(&self, collection: &str) -> Result<u64> {
        Ok(self.collection(collection)?.documents.read().len() as u64)
    }

    fn insert(&self, collection: &str, annotation: Annotation) -> Result<()> {
        let shard = self.collection(collection)?;
        let mut documents = shard.documents.write();
        if documents.iter().any(|d| d.name == annotation.name) {
            return Err(Error::Storage(format!(
                "document '{}' already exists in '{collection}'",
                annotation.name
            )));
        }
        documents.push(StoredDocument::new(annotation));
        Ok(())
    }

    fn get(&self, collection: &str, name: &str) -> Result<Option<Annotation>> {
        let shard = self.collection(collection)?;
        let documents = shard.documents.read();
        Ok(documents
            .iter()
            .find(|d| d.name == name)
            .map(StoredDocument::to_annotation))
    }

    fn replace(&self, collection: &str, annotation: Annotation) -> Result<()> {
        let shard = self.collection(collection)?;
        let mut documents = shard.documents.write();
        let slot = documents
            .iter_mut()
            .find(|d| d.name == annotation.name)
            .ok_or_else(|| Error::not_found(ResourceKind::Annotation, &annotation.name))?;
        *slot = StoredDocument::new(annotation);
        Ok(())
    }

    fn delete(&self, collection: &str, name: &str) -> Result<()> {
        let shard = self.collection(collection)?;
        let mut documents = shard.documents.write();
        let index = documents
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| Error::not_found(ResourceKind::Annotation, name))?;
        documents.remove(index);
        Ok(())
    }

    fn execute(&self, collection: &str, stages: &[Stage]) -> Result<Vec<Annotation>> {
        let shard = self.collection(collection)?;
        let documents = shard.documents.read();
        let mut current: Vec<&StoredDocument> = documents.iter().collect();
        for stage in stages {
            match stage {
                Stage::Match(filter) => current.retain(|d| filter_matches(filter, &d.root)),
                Stage::Skip(n) => {
                    let n = (*n as usize).min(current.len());
                    current.drain(..n);
                }
                Stage::Limit(n) => current.truncate(*n as usize),
            }
        }
        Ok(current
            .into_iter()
            .map(StoredDocument::to_annotation)
            .collect())
    }

    fn count(&self, collection: &str, stages: &[Stage]) -> Result<u64> {
        Ok(self.execute(collection, stages)?.len() as u64)
    }

    fn create_index(&self, collection: &str, id: &str, config: &IndexConfig) -> Result<String> {
        let shard = self.collection(collection)?;
        let mut indexes = shard.indexes.write();
        let name = config.index_name();
        for (existing_id, existing) in indexes.iter() {
            if existing_id == id {
                return Err(Error::Storage(format!(
                    "index '{id}' already exists in '{collection}'"
                )));
            }
            if existing.index_name() == name {
                return Err(Error::Storage(format!(
                    "an index on the same fields already exists in '{collection}': {name}"
                )));
            }
        }
        indexes.push((id.to_string(), config.clone()));
        debug!(collection, index = %name, "created index");
        Ok(name)
    }

    fn drop_index(&self, collection: &str, id: &str) -> Result<()> {
        let shard = self.collection(collection)?;
        let mut indexes = shard.indexes.write();
        indexes.retain(|(existing_id, _)| existing_id != id);
        Ok(())
    }

    fn distinct(&self, collection: &str, path: &str) -> Result<Vec<Value>> {
        let shard = self.collection(collection)?;
        let documents = shard.documents.read();
        let full_path = format!("{CONTENT_ROOT_PREFIX}{path}");
        let mut values: Vec<Value> = Vec::new();
        for document in documents.iter() {
            for candidate in resolve(&document.root, &full_path) {
                let flattened: Vec<&Value> = match candidate {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for value in flattened {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                }
            }
        }
        Ok(values)
    }
}
