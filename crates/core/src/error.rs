//! Error types for the annotation repository
//!
//! One taxonomy is shared by every layer. The split that matters for callers:
//! - `InvalidQuery` and `PreconditionFailed` are synchronous and client-caused,
//!   raised before any state change;
//! - `NotFound` covers unknown container/annotation/search/chore/index ids;
//! - chore execution failures are never surfaced through this type to the
//!   caller that registered the chore — they are captured in the chore's
//!   status and inspectable until the TTL purge.
//!
//! We use `thiserror` for the `Display` and `Error` trait implementations.

use std::fmt;
use thiserror::Error;

/// Result type alias for repository operations
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of resource an id failed to resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// An annotation container
    Container,
    /// An annotation inside a container
    Annotation,
    /// A per-container search session
    Search,
    /// A background chore (global search or index build)
    Chore,
    /// An index definition
    Index,
    /// A named custom query
    CustomQuery,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Container => "container",
            ResourceKind::Annotation => "annotation",
            ResourceKind::Search => "search",
            ResourceKind::Chore => "chore",
            ResourceKind::Index => "index",
            ResourceKind::CustomQuery => "custom query",
        };
        f.write_str(label)
    }
}

/// Error taxonomy for the annotation repository
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A structured query failed compilation (client-caused, synchronous)
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A mutation carried a version tag that no longer matches the resource
    #[error("precondition failed on {resource}: version tag does not match")]
    PreconditionFailed {
        /// The resource whose tag was checked
        resource: String,
    },

    /// An identifier did not resolve (unknown, or already purged)
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// What kind of resource was looked up
        kind: ResourceKind,
        /// The identifier that failed to resolve
        id: String,
    },

    /// Deleting a non-empty container without the force flag
    #[error("container '{0}' is not empty; delete its annotations first, or force")]
    ContainerNotEmpty(String),

    /// Creating a custom query under a name that is already taken
    #[error("a custom query named '{0}' already exists")]
    QueryNameTaken(String),

    /// A container or custom-query name with characters outside [A-Za-z0-9_-]
    #[error("invalid name '{0}': only alphanumerics, '-' and '_' are allowed")]
    InvalidName(String),

    /// The principal may not perform the attempted operation
    #[error("user '{user}' is not authorized to {action}")]
    Unauthorized {
        /// The principal that was rejected
        user: String,
        /// What they tried to do
        action: String,
    },

    /// Backing document store failure
    #[error("storage error: {0}")]
    Storage(String),

    /// The background worker queue is at capacity
    #[error("background worker queue is full")]
    Backpressure,
}

impl Error {
    /// Shorthand for a `NotFound` with an owned id
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for a `PreconditionFailed` on the given resource
    pub fn precondition_failed(resource: impl Into<String>) -> Self {
        Error::PreconditionFailed {
            resource: resource.into(),
        }
    }

    /// Shorthand for an `InvalidQuery` with a formatted message
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Error::InvalidQuery(message.into())
    }

    /// A short stable label for the error variant, used in chore error lists
    pub fn kind_label(&self) -> &'static str {
        match self {
            Error::InvalidQuery(_) => "InvalidQuery",
            Error::PreconditionFailed { .. } => "PreconditionFailed",
            Error::NotFound { .. } => "NotFound",
            Error::ContainerNotEmpty(_) => "ContainerNotEmpty",
            Error::QueryNameTaken(_) => "QueryNameTaken",
            Error::InvalidName(_) => "InvalidName",
            Error::Unauthorized { .. } => "Unauthorized",
            Error::Storage(_) => "Storage",
            Error::Backpressure => "Backpressure",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_query() {
        let err = Error::invalid_query("unknown query function: ':frobnicate'");
        assert!(err.to_string().contains("invalid query"));
        assert!(err.to_string().contains(":frobnicate"));
    }

    #[test]
    fn test_error_display_precondition_failed() {
        let err = Error::precondition_failed("volume-1/page-3");
        let msg = err.to_string();
        assert!(msg.contains("precondition failed"));
        assert!(msg.contains("volume-1/page-3"));
    }

    #[test]
    fn test_error_display_not_found() {
        let err = Error::not_found(ResourceKind::Chore, "abc-123");
        let msg = err.to_string();
        assert!(msg.contains("chore"));
        assert!(msg.contains("abc-123"));
    }

    #[test]
    fn test_kind_label() {
        assert_eq!(
            Error::invalid_query("x").kind_label(),
            "InvalidQuery"
        );
        assert_eq!(
            Error::Storage("disk on fire".to_string()).kind_label(),
            "Storage"
        );
    }

    #[test]
    fn test_error_pattern_matching() {
        let err = Error::not_found(ResourceKind::Search, "s1");
        match err {
            Error::NotFound { kind, id } => {
                assert_eq!(kind, ResourceKind::Search);
                assert_eq!(id, "s1");
            }
            _ => panic!("wrong error variant"),
        }
    }
}
