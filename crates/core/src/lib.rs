//! Core types for the annotation repository
//!
//! This crate defines the foundational types shared by every layer:
//! - Error: the error taxonomy (InvalidQuery, PreconditionFailed, NotFound, ...)
//! - ContainerMetadata: per-container record with the field-count ledger
//! - Annotation / AnnotationRef: stored documents and cross-container references
//! - IndexConfig / IndexKind: index definitions built by index chores
//! - VersionTag: deterministic tags for optimistic concurrency
//! - field paths: dotted-path extraction feeding the field-count ledger

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod etag;
pub mod fields;
pub mod types;

pub use error::{Error, ResourceKind, Result};
pub use etag::{annotation_tag, container_tag, VersionTag};
pub use fields::extract_field_paths;
pub use types::{
    is_valid_name, Annotation, AnnotationRef, ContainerMetadata, IndexConfig, IndexField,
    IndexKind,
};
