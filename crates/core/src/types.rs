//! Shared data model types
//!
//! - ContainerMetadata: the per-container record, including the field-count
//!   ledger and the index definition map
//! - Annotation: a named JSON document inside a container
//! - AnnotationRef: a (container, annotation) reference, used by global search
//! - IndexKind / IndexField / IndexConfig: index definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Check a container or custom-query name: non-empty, alphanumerics plus '-' and '_'
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Metadata record for one annotation container
///
/// `field_counts` is the field-occurrence ledger: dotted field path → total
/// number of occurrences of that path across all annotations currently stored
/// in the container. It is an occurrence count, not a distinct-document count:
/// repeated list entries sharing a path each contribute one occurrence.
/// Metadata endpoints expose the map verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerMetadata {
    /// Unique container name, doubles as the backing-store collection name
    pub name: String,
    /// Human-readable label
    pub label: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub modified_at: DateTime<Utc>,
    /// Field-occurrence ledger (path → occurrence count, zero entries removed)
    #[serde(default)]
    pub field_counts: BTreeMap<String, u64>,
    /// Whether anonymous users get read access
    #[serde(default)]
    pub read_only_for_anonymous: bool,
    /// Index definitions, keyed by index id
    #[serde(default)]
    pub indexes: BTreeMap<String, IndexConfig>,
}

impl ContainerMetadata {
    /// Fresh metadata for a newly created container
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        let now = Utc::now();
        ContainerMetadata {
            name: name.into(),
            label: label.into(),
            created_at: now,
            modified_at: now,
            field_counts: BTreeMap::new(),
            read_only_for_anonymous: false,
            indexes: BTreeMap::new(),
        }
    }
}

/// A named annotation document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Name, unique within its container
    pub name: String,
    /// The annotation body, an arbitrary JSON document
    pub content: serde_json::Value,
}

impl Annotation {
    /// Construct an annotation record
    pub fn new(name: impl Into<String>, content: serde_json::Value) -> Self {
        Annotation {
            name: name.into(),
            content,
        }
    }
}

/// Reference to an annotation in some container
///
/// Global search accumulates these instead of full documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationRef {
    /// The owning container
    pub container: String,
    /// The annotation name within that container
    pub annotation: String,
}

impl fmt::Display for AnnotationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.annotation)
    }
}

/// The kind of index to build over one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Ascending ordered index
    Ascending,
    /// Descending ordered index
    Descending,
    /// Hashed index
    Hashed,
    /// Text index
    Text,
}

impl IndexKind {
    /// Parse a client-supplied kind name (case-insensitive)
    pub fn parse(s: &str) -> Option<IndexKind> {
        match s.to_ascii_lowercase().as_str() {
            "ascending" => Some(IndexKind::Ascending),
            "descending" => Some(IndexKind::Descending),
            "hashed" => Some(IndexKind::Hashed),
            "text" => Some(IndexKind::Text),
            _ => None,
        }
    }

    /// The lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Ascending => "ascending",
            IndexKind::Descending => "descending",
            IndexKind::Hashed => "hashed",
            IndexKind::Text => "text",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (field path, kind) pair of a multi-field index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    /// Dotted field path, relative to the annotation content root
    pub path: String,
    /// The index kind for this field
    pub kind: IndexKind,
}

/// Definition of a (possibly multi-field) index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexConfig {
    /// Ordered (field path, kind) pairs
    pub fields: Vec<IndexField>,
    /// Optional "field exists" partial filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_filter_field: Option<String>,
}

impl IndexConfig {
    /// Single-field index with an "exists" partial filter on the same field
    pub fn single(path: impl Into<String>, kind: IndexKind) -> Self {
        let path = path.into();
        IndexConfig {
            partial_filter_field: Some(path.clone()),
            fields: vec![IndexField { path, kind }],
        }
    }

    /// Canonical index name derived from its fields, e.g. `body.type_ascending`
    pub fn index_name(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("{}_{}", f.path, f.kind))
            .collect::<Vec<_>>()
            .join("_")
    }
}
