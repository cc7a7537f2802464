//! Filter evaluation against stored documents
//!
//! Dotted paths descend through objects by key; arrays are traversed
//! transparently (no index segment), so a path can resolve to several
//! candidate values. Comparison filters match when any candidate matches,
//! mirroring how the backing store treats array-valued fields. Numbers
//! compare numerically regardless of integer/float representation.

use annostore_query::Filter;
use serde_json::Value;
use std::cmp::Ordering;

/// Resolve a dotted path to all candidate values it reaches
pub fn resolve<'a>(root: &'a Value, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    lookup(root, &segments)
}

fn lookup<'a>(value: &'a Value, segments: &[&str]) -> Vec<&'a Value> {
    if segments.is_empty() {
        return vec![value];
    }
    match value {
        Value::Object(map) => map
            .get(segments[0])
            .map(|child| lookup(child, &segments[1..]))
            .unwrap_or_default(),
        Value::Array(items) => items
            .iter()
            .flat_map(|item| lookup(item, segments))
            .collect(),
        _ => Vec::new(),
    }
}

/// Evaluate a filter against a document root
pub fn filter_matches(filter: &Filter, root: &Value) -> bool {
    match filter {
        Filter::Eq { path, value } => resolve(root, path)
            .iter()
            .any(|candidate| candidate_eq(candidate, value)),
        Filter::Ne { path, value } => !resolve(root, path)
            .iter()
            .any(|candidate| candidate_eq(candidate, value)),
        Filter::Lt { path, value } => compares(root, path, value, |o| o == Ordering::Less),
        Filter::Lte { path, value } => compares(root, path, value, |o| o != Ordering::Greater),
        Filter::Gt { path, value } => compares(root, path, value, |o| o == Ordering::Greater),
        Filter::Gte { path, value } => compares(root, path, value, |o| o != Ordering::Less),
        Filter::In { path, values } => resolve(root, path)
            .iter()
            .any(|candidate| values.iter().any(|value| candidate_eq(candidate, value))),
        Filter::NotIn { path, values } => !resolve(root, path)
            .iter()
            .any(|candidate| values.iter().any(|value| candidate_eq(candidate, value))),
        Filter::And(filters) => filters.iter().all(|f| filter_matches(f, root)),
        Filter::Or(filters) => filters.iter().any(|f| filter_matches(f, root)),
        Filter::ElemMatch { path, filters } => resolve(root, path).iter().any(|candidate| {
            candidate.as_array().is_some_and(|items| {
                items
                    .iter()
                    .any(|element| filters.iter().all(|f| filter_matches(f, element)))
            })
        }),
        Filter::Exists { path } => !resolve(root, path).is_empty(),
    }
}

fn compares(root: &Value, path: &str, value: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    resolve(root, path)
        .iter()
        .flat_map(|candidate| scalar_candidates(candidate))
        .any(|candidate| compare_values(candidate, value).map_or(false, &accept))
}

/// An array-valued candidate contributes its elements to ordered comparisons
fn scalar_candidates<'a>(candidate: &'a Value) -> Vec<&'a Value> {
    match candidate {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn candidate_eq(candidate: &Value, value: &Value) -> bool {
    value_eq(candidate, value)
        || candidate
            .as_array()
            .is_some_and(|items| items.iter().any(|element| value_eq(element, value)))
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annostore_query::Filter;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "annotation": {
                "body": {"type": "Page", "seq": 12},
                "target": [
                    {"type": "Text", "source": "urn:vol1",
                     "selector": {"type": "urn:sel", "start": 100, "end": 300}},
                    {"type": "Image", "source": "urn:img1"}
                ],
                "keywords": ["ship", "harbor"]
            }
        })
    }

    #[test]
    fn test_resolve_through_objects() {
        let d = doc();
        let values = resolve(&d, "annotation.body.type");
        assert_eq!(values, vec![&json!("Page")]);
    }

    #[test]
    fn test_resolve_through_arrays_without_index_segment() {
        let d = doc();
        let values = resolve(&d, "annotation.target.source");
        assert_eq!(values, vec![&json!("urn:vol1"), &json!("urn:img1")]);
    }

    #[test]
    fn test_eq_on_scalar() {
        let d = doc();
        assert!(filter_matches(
            &Filter::eq("annotation.body.type", "Page"),
            &d
        ));
        assert!(!filter_matches(
            &Filter::eq("annotation.body.type", "Line"),
            &d
        ));
    }

    #[test]
    fn test_eq_matches_array_element() {
        let d = doc();
        assert!(filter_matches(
            &Filter::eq("annotation.keywords", "ship"),
            &d
        ));
    }

    #[test]
    fn test_numeric_eq_across_representations() {
        let d = doc();
        assert!(filter_matches(&Filter::eq("annotation.body.seq", 12.0), &d));
    }

    #[test]
    fn test_ne_on_missing_field_matches() {
        let d = doc();
        assert!(filter_matches(
            &Filter::ne("annotation.body.absent", "x"),
            &d
        ));
    }

    #[test]
    fn test_ordered_comparisons() {
        let d = doc();
        assert!(filter_matches(&Filter::gt("annotation.body.seq", 10), &d));
        assert!(!filter_matches(&Filter::gt("annotation.body.seq", 12), &d));
        assert!(filter_matches(&Filter::gte("annotation.body.seq", 12), &d));
        assert!(filter_matches(&Filter::lt("annotation.body.seq", 13), &d));
    }

    #[test]
    fn test_in_and_not_in() {
        let d = doc();
        assert!(filter_matches(
            &Filter::In {
                path: "annotation.body.type".to_string(),
                values: vec![json!("Page"), json!("Line")],
            },
            &d
        ));
        assert!(!filter_matches(
            &Filter::NotIn {
                path: "annotation.body.type".to_string(),
                values: vec![json!("Page")],
            },
            &d
        ));
    }

    #[test]
    fn test_elem_match_requires_one_element_satisfying_all() {
        let d = doc();
        // The Text target satisfies both; the Image target neither
        let filter = Filter::ElemMatch {
            path: "annotation.target".to_string(),
            filters: vec![
                Filter::eq("type", "Text"),
                Filter::eq("source", "urn:vol1"),
            ],
        };
        assert!(filter_matches(&filter, &d));

        // No single element is both Text and urn:img1
        let crossed = Filter::ElemMatch {
            path: "annotation.target".to_string(),
            filters: vec![
                Filter::eq("type", "Text"),
                Filter::eq("source", "urn:img1"),
            ],
        };
        assert!(!filter_matches(&crossed, &d));
    }

    #[test]
    fn test_within_range_boundaries_inclusive() {
        let d = doc();
        // target [100,300] is within [100,300]
        let exact = Filter::ElemMatch {
            path: "annotation.target".to_string(),
            filters: vec![
                Filter::gte("selector.start", 100.0),
                Filter::lte("selector.end", 300.0),
            ],
        };
        assert!(filter_matches(&exact, &d));

        // target.start=100 < 150 fails the >= test
        let narrower = Filter::ElemMatch {
            path: "annotation.target".to_string(),
            filters: vec![
                Filter::gte("selector.start", 150.0),
                Filter::lte("selector.end", 200.0),
            ],
        };
        assert!(!filter_matches(&narrower, &d));
    }

    #[test]
    fn test_overlap_range_boundaries_strict() {
        let d = doc();
        // query [250,400] overlaps target [100,300]
        let overlapping = Filter::ElemMatch {
            path: "annotation.target".to_string(),
            filters: vec![
                Filter::lt("selector.start", 400.0),
                Filter::gt("selector.end", 250.0),
            ],
        };
        assert!(filter_matches(&overlapping, &d));

        // query [300,400] only touches target [100,300]: end > 300 is false
        let touching = Filter::ElemMatch {
            path: "annotation.target".to_string(),
            filters: vec![
                Filter::lt("selector.start", 400.0),
                Filter::gt("selector.end", 300.0),
            ],
        };
        assert!(!filter_matches(&touching, &d));
    }

    #[test]
    fn test_exists() {
        let d = doc();
        assert!(filter_matches(
            &Filter::Exists {
                path: "annotation.body.seq".to_string()
            },
            &d
        ));
        assert!(!filter_matches(
            &Filter::Exists {
                path: "annotation.body.absent".to_string()
            },
            &d
        ));
    }
}
