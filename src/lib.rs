//! Annostore — an annotation repository core
//!
//! A document store of annotations grouped into named containers, compliant
//! in spirit with the W3C annotation protocol: structured JSON queries are
//! compiled once into backing-store pipeline stages, per-container searches
//! run synchronously against a result cache, cross-container searches and
//! index builds run as background chores with pollable status, and every
//! mutation is coordinated through deterministic version tags and a
//! per-container field-count ledger.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use annostore::{MemoryStore, Repository, RepositoryConfig};
//! use serde_json::json;
//!
//! let repo = Repository::new(Arc::new(MemoryStore::new()), RepositoryConfig::default());
//!
//! repo.create_container(Some("volume-1"), "Volume one").unwrap();
//! repo.create_annotation("volume-1", Some("anno-1"), json!({"body": {"type": "Page"}}))
//!     .unwrap();
//!
//! let search_id = repo.create_search("volume-1", &json!({"body.type": "Page"})).unwrap();
//! let page = repo.search_result_page("volume-1", &search_id, 0).unwrap();
//! assert_eq!(page.annotations.len(), 1);
//!
//! repo.shutdown();
//! ```
//!
//! # Architecture
//!
//! The crates layer bottom-up: `annostore-core` (types, errors, version
//! tags), `annostore-query` (the compiler), `annostore-store` (the document
//! store interface and its in-memory implementation), `annostore-chores`
//! (worker pool, registries, concrete chores), `annostore-engine` (the
//! [`Repository`] facade). HTTP routing, authentication, and configuration
//! loading live outside this workspace.

pub use annostore_core::{
    annotation_tag, container_tag, extract_field_paths, Annotation, AnnotationRef,
    ContainerMetadata, Error, IndexConfig, IndexField, IndexKind, ResourceKind, Result,
    VersionTag,
};

pub use annostore_query::{CustomQuery, CustomQueryCall, Filter, QueryCompiler, Stage};

pub use annostore_store::{DocumentStore, MemoryStore};

pub use annostore_chores::{ChoreState, StatusSummary};

pub use annostore_engine::{
    AnnotationInfo, ContainerInfo, GlobalResultPage, GlobalSearchOutcome, Repository,
    RepositoryConfig, SearchInfo, SearchPage,
};
