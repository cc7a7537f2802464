//! Pipeline stage descriptors
//!
//! The compiler emits an ordered list of these; the document store consumes
//! them. `Filter` is a small closed algebra: the compiler only produces what
//! the store can evaluate, and the store exhaustively matches on it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Keep only documents matching the filter
    Match(Filter),
    /// Skip the first n documents
    Skip(u64),
    /// Pass through at most n documents
    Limit(u64),
}

/// A document filter, evaluated against dotted field paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    /// Field equals value
    Eq {
        /// Dotted field path
        path: String,
        /// Value to compare against
        value: Value,
    },
    /// Field differs from value
    Ne {
        /// Dotted field path
        path: String,
        /// Value to compare against
        value: Value,
    },
    /// Field is strictly less than value
    Lt {
        /// Dotted field path
        path: String,
        /// Value to compare against
        value: Value,
    },
    /// Field is less than or equal to value
    Lte {
        /// Dotted field path
        path: String,
        /// Value to compare against
        value: Value,
    },
    /// Field is strictly greater than value
    Gt {
        /// Dotted field path
        path: String,
        /// Value to compare against
        value: Value,
    },
    /// Field is greater than or equal to value
    Gte {
        /// Dotted field path
        path: String,
        /// Value to compare against
        value: Value,
    },
    /// Field value is one of the listed values
    In {
        /// Dotted field path
        path: String,
        /// Accepted values
        values: Vec<Value>,
    },
    /// Field value is none of the listed values
    NotIn {
        /// Dotted field path
        path: String,
        /// Rejected values
        values: Vec<Value>,
    },
    /// All sub-filters hold
    And(Vec<Filter>),
    /// At least one sub-filter holds
    Or(Vec<Filter>),
    /// The field is an array with at least one element satisfying every
    /// sub-filter (sub-filter paths are relative to the element)
    ElemMatch {
        /// Dotted field path of the array
        path: String,
        /// Filters every matching element must satisfy
        filters: Vec<Filter>,
    },
    /// The field is present (with any value)
    Exists {
        /// Dotted field path
        path: String,
    },
}

impl Filter {
    /// Equality filter
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Inequality filter
    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::Ne {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Strictly-less-than filter
    pub fn lt(path: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::Lt {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Less-than-or-equal filter
    pub fn lte(path: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::Lte {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Strictly-greater-than filter
    pub fn gt(path: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::Gt {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Greater-than-or-equal filter
    pub fn gte(path: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::Gte {
            path: path.into(),
            value: value.into(),
        }
    }
}
