//! Repository engine: the facade tying the core together
//!
//! [`Repository`] owns the document-store handle, the per-container
//! concurrency controller with its field-count ledger, the query-result
//! cache, the custom-query catalogue, the chore registries, the worker pool,
//! and the purge sweeper. Every annotation/container mutation goes through
//! the controller; every search goes through the compiler exactly once.

pub mod cache;
pub mod catalogue;
pub mod config;
pub mod controller;
pub mod indexes;
pub mod repository;
pub mod search;

pub use cache::SearchCache;
pub use catalogue::CustomQueryCatalogue;
pub use config::RepositoryConfig;
pub use controller::{update_field_counts, ConcurrencyController, ContainerHandle};
pub use repository::{AnnotationInfo, ContainerInfo, Repository};
pub use search::{GlobalResultPage, GlobalSearchOutcome, SearchInfo, SearchPage};
