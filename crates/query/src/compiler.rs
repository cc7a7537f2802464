//! Structured query → pipeline stage compilation
//!
//! One stage is produced per top-level query key, in key order. The compiler
//! is pure: given the same query and the same configured selector type it
//! always yields a structurally identical stage list, and it never touches
//! the store. All validation happens here, before any state change.

use annostore_core::{Error, Result};
use serde_json::{Map, Value};

use crate::stage::{Filter, Stage};

/// Prefix under which all annotation content lives in stored documents
pub const CONTENT_ROOT_PREFIX: &str = "annotation.";

const OR: &str = ":or";
const WITHIN_RANGE: &str = ":isWithinTextAnchorRange";
const OVERLAPPING_WITH_RANGE: &str = ":overlapsWithTextAnchorRange";

const IS_EQUAL_TO: &str = ":=";
const IS_NOT: &str = ":!=";
const IS_LESS: &str = ":<";
const IS_LESS_OR_EQUAL: &str = ":<=";
const IS_GREATER: &str = ":>";
const IS_GREATER_OR_EQUAL: &str = ":>=";
const IS_IN: &str = ":isIn";
const IS_NOT_IN: &str = ":isNotIn";

/// Parameters of a text-anchor range function call
#[derive(Debug, Clone, PartialEq)]
pub struct RangeParameters {
    /// The target source the range applies to
    pub source: String,
    /// Range start position
    pub start: f64,
    /// Range end position
    pub end: f64,
}

/// Compiles structured queries into ordered pipeline stage lists
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    range_selector_type: String,
}

impl QueryCompiler {
    /// Create a compiler for the configured range selector type
    pub fn new(range_selector_type: impl Into<String>) -> Self {
        QueryCompiler {
            range_selector_type: range_selector_type.into(),
        }
    }

    /// Compile a query into its stage list
    ///
    /// The query root must be a JSON object; each key yields exactly one
    /// stage, in key order.
    pub fn compile(&self, query: &Value) -> Result<Vec<Stage>> {
        let map = query.as_object().ok_or_else(|| {
            Error::invalid_query("query root fields should be strings mapping to values")
        })?;
        map.iter().map(|(key, value)| self.stage(key, value)).collect()
    }

    fn stage(&self, key: &str, value: &Value) -> Result<Stage> {
        match key {
            OR => self.either(value),
            WITHIN_RANGE => self.within_range_stage(value),
            OVERLAPPING_WITH_RANGE => self.overlapping_range_stage(value),
            _ if key.starts_with(':') => Err(Error::invalid_query(format!(
                "unknown query function: '{key}'"
            ))),
            _ => {
                tracing::debug!(field = key, "compiling field match");
                Ok(Stage::Match(self.field_match(key, value)?))
            }
        }
    }

    fn either(&self, value: &Value) -> Result<Stage> {
        let sub_queries = value
            .as_array()
            .ok_or_else(|| Error::invalid_query(format!("the value for {OR} must be a list")))?;
        let mut branches = Vec::new();
        for sub_query in sub_queries {
            let fields = sub_query.as_object().ok_or_else(|| {
                Error::invalid_query(format!(
                    "expected {sub_query} to be a field: value sub-query"
                ))
            })?;
            for (field, field_value) in fields {
                branches.push(self.field_match(field, field_value)?);
            }
        }
        Ok(Stage::Match(Filter::Or(branches)))
    }

    fn field_match(&self, field: &str, value: &Value) -> Result<Filter> {
        match value {
            Value::Object(operators) => self.operator_match(field, operators),
            _ => Ok(Filter::eq(prefixed(field), value.clone())),
        }
    }

    fn operator_match(&self, field: &str, operators: &Map<String, Value>) -> Result<Filter> {
        let mut clauses = Vec::new();
        for (operator, value) in operators {
            let path = prefixed(field);
            let clause = match operator.as_str() {
                IS_EQUAL_TO => Filter::eq(path, value.clone()),
                IS_NOT => Filter::ne(path, value.clone()),
                IS_LESS => Filter::lt(path, value.clone()),
                IS_LESS_OR_EQUAL => Filter::lte(path, value.clone()),
                IS_GREATER => Filter::gt(path, value.clone()),
                IS_GREATER_OR_EQUAL => Filter::gte(path, value.clone()),
                IS_IN => Filter::In {
                    path,
                    values: list_parameter(value, IS_IN)?,
                },
                IS_NOT_IN => Filter::NotIn {
                    path,
                    values: list_parameter(value, IS_NOT_IN)?,
                },
                _ => {
                    return Err(Error::invalid_query(format!(
                        "unknown operator '{operator}'"
                    )))
                }
            };
            clauses.push(clause);
        }
        if clauses.len() == 1 {
            Ok(clauses.remove(0))
        } else {
            Ok(Filter::And(clauses))
        }
    }

    /// Within: the target range lies entirely inside the queried range,
    /// boundaries inclusive on both ends.
    fn within_range_stage(&self, parameters: &Value) -> Result<Stage> {
        let range = self.range_parameters(parameters)?;
        Ok(Stage::Match(Filter::ElemMatch {
            path: format!("{CONTENT_ROOT_PREFIX}target"),
            filters: vec![
                Filter::eq("type", "Text"),
                Filter::eq("source", range.source),
                Filter::eq("selector.type", self.range_selector_type.clone()),
                Filter::gte("selector.start", range.start),
                Filter::lte("selector.end", range.end),
            ],
        }))
    }

    /// Overlap: the target range and the queried range share at least one
    /// position, half-open — a target that merely touches a boundary does
    /// not overlap.
    fn overlapping_range_stage(&self, parameters: &Value) -> Result<Stage> {
        let range = self.range_parameters(parameters)?;
        Ok(Stage::Match(Filter::ElemMatch {
            path: format!("{CONTENT_ROOT_PREFIX}target"),
            filters: vec![
                Filter::eq("type", "Text"),
                Filter::eq("source", range.source),
                Filter::eq("selector.type", self.range_selector_type.clone()),
                Filter::lt("selector.start", range.end),
                Filter::gt("selector.end", range.start),
            ],
        }))
    }

    fn range_parameters(&self, parameters: &Value) -> Result<RangeParameters> {
        let map = parameters.as_object().ok_or_else(|| {
            Error::invalid_query(format!("invalid parameter: {parameters}"))
        })?;
        Ok(RangeParameters {
            source: string_parameter(map, "source")?,
            start: number_parameter(map, "start")?,
            end: number_parameter(map, "end")?,
        })
    }
}

fn prefixed(field: &str) -> String {
    format!("{CONTENT_ROOT_PREFIX}{field}")
}

fn list_parameter(value: &Value, operator: &str) -> Result<Vec<Value>> {
    value
        .as_array()
        .map(|items| items.to_vec())
        .ok_or_else(|| Error::invalid_query(format!("{operator} parameter must be a list")))
}

fn string_parameter(map: &Map<String, Value>, key: &str) -> Result<String> {
    match map.get(key) {
        None => Err(Error::invalid_query(format!(
            "missing string parameter '{key}'"
        ))),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Error::invalid_query(format!(
            "parameter '{key}' should be a string, but is {other}"
        ))),
    }
}

fn number_parameter(map: &Map<String, Value>, key: &str) -> Result<f64> {
    match map.get(key) {
        None => Err(Error::invalid_query(format!(
            "missing number parameter '{key}'"
        ))),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
            Error::invalid_query(format!("parameter '{key}' is out of range"))
        }),
        Some(other) => Err(Error::invalid_query(format!(
            "parameter '{key}' should be a number, but is {other}"
        ))),
    }
}
