//! The document store interface consumed by the repository core

use annostore_core::{Annotation, IndexConfig, Result};
use annostore_query::Stage;
use serde_json::Value;

/// A named-collection document store executing compiled pipeline stages
///
/// Collections map one-to-one to annotation containers. Implementations must
/// preserve insertion order within a collection: result iteration order is
/// part of the pagination contract.
pub trait DocumentStore: Send + Sync {
    /// Create an empty collection; fails if the name is taken
    fn create_collection(&self, collection: &str) -> Result<()>;

    /// Drop a collection and everything in it
    fn drop_collection(&self, collection: &str) -> Result<()>;

    /// Whether the collection exists
    fn collection_exists(&self, collection: &str) -> bool;

    /// Number of documents in the collection
    fn document_count(&self, collection: &str) -> Result<u64>;

    /// Insert a new document; fails if the name is taken in this collection
    fn insert(&self, collection: &str, annotation: Annotation) -> Result<()>;

    /// Fetch one document by name
    fn get(&self, collection: &str, name: &str) -> Result<Option<Annotation>>;

    /// Replace an existing document; fails if it does not exist
    fn replace(&self, collection: &str, annotation: Annotation) -> Result<()>;

    /// Delete one document by name; fails if it does not exist
    fn delete(&self, collection: &str, name: &str) -> Result<()>;

    /// Run a compiled stage list and return the matching documents in order
    fn execute(&self, collection: &str, stages: &[Stage]) -> Result<Vec<Annotation>>;

    /// Run a compiled stage list and return only the match count
    fn count(&self, collection: &str, stages: &[Stage]) -> Result<u64>;

    /// Create a named index; fails on a conflicting definition
    ///
    /// Returns the canonical index name derived from the indexed fields.
    fn create_index(&self, collection: &str, id: &str, config: &IndexConfig) -> Result<String>;

    /// Drop an index by id; unknown ids are ignored
    fn drop_index(&self, collection: &str, id: &str) -> Result<()>;

    /// Distinct values of one content field across the collection
    fn distinct(&self, collection: &str, path: &str) -> Result<Vec<Value>>;
}
