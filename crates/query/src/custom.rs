//! Custom queries: named, parameterized query templates
//!
//! A template is an ordinary query object whose leaf values may contain
//! `<parameter>` placeholders. A query call is a compact string
//! `name:par1=base64(value1),par2=base64(value2)`; values are base64-encoded
//! so they can carry arbitrary text. Decoding, placeholder extraction, and
//! interpolation all happen before the interpolated query goes through the
//! regular compiler.

use annostore_core::{is_valid_name, Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static PARAMETER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("<([A-Za-z0-9_-]+)>").expect("parameter pattern compiles"));

/// A stored custom query definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomQuery {
    /// Unique name (alphanumerics, '-' and '_')
    pub name: String,
    /// Optional display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The serialized query template, placeholders included
    pub query_template: String,
    /// Parameter names extracted from the template, in first-use order
    pub parameters: Vec<String>,
    /// Whether non-admin users may call this query
    pub public: bool,
    /// The user that created the query
    pub created_by: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl CustomQuery {
    /// Build a definition from a template value, extracting its parameters
    pub fn new(
        name: impl Into<String>,
        template: &serde_json::Value,
        public: bool,
        created_by: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(Error::InvalidName(name));
        }
        let query_template = serde_json::to_string(template)?;
        let parameters = extract_parameter_names(&query_template);
        Ok(CustomQuery {
            name,
            label: None,
            description: None,
            query_template,
            parameters,
            public,
            created_by: created_by.into(),
            created_at: Utc::now(),
        })
    }

    /// Interpolate a call's parameters into this template and parse the result
    ///
    /// Fails with InvalidQuery when the call leaves template parameters
    /// without a value.
    pub fn expand(&self, call: &CustomQueryCall) -> Result<serde_json::Value> {
        let missing: Vec<&String> = self
            .parameters
            .iter()
            .filter(|p| !call.parameters.contains_key(*p))
            .collect();
        if !missing.is_empty() {
            let names = missing
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::invalid_query(format!(
                "no values given for parameter(s): {names}"
            )));
        }
        let expanded = interpolate(&self.query_template, &call.parameters);
        serde_json::from_str(&expanded)
            .map_err(|e| Error::invalid_query(format!("interpolated query is not valid JSON: {e}")))
    }
}

/// A decoded custom query call: name plus parameter values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomQueryCall {
    /// The custom query name
    pub name: String,
    /// Parameter name → decoded value
    pub parameters: BTreeMap<String, String>,
}

impl CustomQueryCall {
    /// Decode a call string `name:par1=b64,par2=b64`
    ///
    /// A bare `name` decodes to an empty parameter map. A parameter pair
    /// without '=' or with invalid base64 fails with InvalidQuery naming the
    /// parameter.
    pub fn decode(call: &str) -> Result<CustomQueryCall> {
        let (name, encoded) = match call.split_once(':') {
            None => (call, None),
            Some((name, rest)) => (name, Some(rest)),
        };
        let mut parameters = BTreeMap::new();
        let mut errors = Vec::new();
        if let Some(encoded) = encoded {
            for pair in encoded.split(',') {
                match pair.split_once('=') {
                    None => errors.push(format!("malformed parameter '{pair}'")),
                    Some((par_name, encoded_value)) => {
                        match BASE64.decode(encoded_value.as_bytes()) {
                            Ok(bytes) => {
                                let value = String::from_utf8_lossy(&bytes).into_owned();
                                parameters.insert(par_name.to_string(), value);
                            }
                            Err(_) => errors.push(format!(
                                "bad base64 value '{encoded_value}' for parameter {par_name}"
                            )),
                        }
                    }
                }
            }
        }
        if !errors.is_empty() {
            return Err(Error::invalid_query(errors.join(", ")));
        }
        Ok(CustomQueryCall {
            name: name.to_string(),
            parameters,
        })
    }

    /// Encode this call back to its compact string form
    pub fn encode(&self) -> String {
        if self.parameters.is_empty() {
            self.name.clone()
        } else {
            let encoded = self
                .parameters
                .iter()
                .map(|(k, v)| format!("{k}={}", BASE64.encode(v.as_bytes())))
                .collect::<Vec<_>>()
                .join(",");
            format!("{}:{encoded}", self.name)
        }
    }
}

/// Extract `<parameter>` names from a serialized template, in first-use order
pub fn extract_parameter_names(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for capture in PARAMETER_PATTERN.captures_iter(template) {
        let name = capture[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Replace each `<name>` placeholder with its JSON-escaped value
pub fn interpolate(template: &str, parameters: &BTreeMap<String, String>) -> String {
    parameters.iter().fold(template.to_string(), |expanded, (k, v)| {
        expanded.replace(&format!("<{k}>"), &escape_json(v))
    })
}

/// Escape a substitution value so it stays inside its JSON string literal
fn escape_json(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_bare_name() {
        let call = CustomQueryCall::decode("pages-in-volume").unwrap();
        assert_eq!(call.name, "pages-in-volume");
        assert!(call.parameters.is_empty());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut parameters = BTreeMap::new();
        parameters.insert("volume".to_string(), "1674".to_string());
        parameters.insert("kind".to_string(), "Page".to_string());
        let call = CustomQueryCall {
            name: "pages".to_string(),
            parameters,
        };
        let decoded = CustomQueryCall::decode(&call.encode()).unwrap();
        assert_eq!(call, decoded);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = CustomQueryCall::decode("pages:volume=!!!not-base64!!!").unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn test_decode_rejects_malformed_pair() {
        let err = CustomQueryCall::decode("pages:justaname").unwrap_err();
        assert!(err.to_string().contains("justaname"));
    }

    #[test]
    fn test_extract_parameter_names_in_order() {
        let template = r#"{"body.type":"<kind>","target.source":"<volume>","x":"<kind>"}"#;
        assert_eq!(extract_parameter_names(template), vec!["kind", "volume"]);
    }

    #[test]
    fn test_expand_detects_missing_parameters() {
        let query = CustomQuery::new(
            "pages",
            &json!({"body.type": "<kind>", "target.source": "<volume>"}),
            true,
            "root",
        )
        .unwrap();
        let call = CustomQueryCall::decode("pages").unwrap();
        let err = query.expand(&call).unwrap_err();
        assert!(err.to_string().contains("kind"));
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn test_expand_interpolates_values() {
        let query = CustomQuery::new(
            "pages",
            &json!({"body.type": "<kind>", "target.source": "<volume>"}),
            true,
            "root",
        )
        .unwrap();
        let call = CustomQueryCall::decode(
            &CustomQueryCall {
                name: "pages".to_string(),
                parameters: BTreeMap::from([
                    ("kind".to_string(), "Page".to_string()),
                    ("volume".to_string(), "urn:vol:1674".to_string()),
                ]),
            }
            .encode(),
        )
        .unwrap();
        let expanded = query.expand(&call).unwrap();
        assert_eq!(
            expanded,
            json!({"body.type": "Page", "target.source": "urn:vol:1674"})
        );
    }

    #[test]
    fn test_interpolation_escapes_json() {
        let query = CustomQuery::new("q", &json!({"body.value": "<text>"}), true, "root").unwrap();
        let call = CustomQueryCall {
            name: "q".to_string(),
            parameters: BTreeMap::from([("text".to_string(), "say \"hi\"".to_string())]),
        };
        let expanded = query.expand(&call).unwrap();
        assert_eq!(expanded, json!({"body.value": "say \"hi\""}));
    }

    #[test]
    fn test_invalid_query_name_rejected() {
        let err = CustomQuery::new("bad name!", &json!({}), true, "root").unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
    }
}
