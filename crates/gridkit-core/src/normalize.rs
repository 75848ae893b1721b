//! Normalization of incoming data into a canonical row sequence
//!
//! Accepted shapes, in priority order:
//! - an array of objects
//! - an object whose `data` field is an array
//! - an object whose `results` field is an array
//! - a single object, wrapped into a one-row sequence

use crate::error::NormalizationError;
use crate::row::{json_type_name, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Maximum number of characters of raw input shown in a diagnostic
const SAMPLE_CHARS: usize = 200;

/// Normalize a value of unknown shape into rows
pub fn normalize(input: &Value) -> Result<Vec<Row>, NormalizationError> {
    let elements = unwrap_sequence(input)?;

    if elements.is_empty() {
        return Err(NormalizationError::EmptyDataset);
    }

    let invalid = elements.iter().filter(|v| !v.is_object()).count();
    if invalid > 0 {
        return Err(NormalizationError::InvalidRowType {
            invalid,
            rows: elements.to_vec(),
        });
    }

    Ok(elements
        .iter()
        .filter_map(|v| v.as_object().cloned())
        .collect())
}

fn unwrap_sequence(input: &Value) -> Result<&[Value], NormalizationError> {
    match input {
        Value::Array(items) => Ok(items),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("data") {
                debug!(rows = items.len(), "unwrapping `data` field");
                return Ok(items);
            }
            if let Some(Value::Array(items)) = map.get("results") {
                debug!(rows = items.len(), "unwrapping `results` field");
                return Ok(items);
            }
            debug!("wrapping single object into a one-row sequence");
            Ok(std::slice::from_ref(input))
        }
        other => Err(NormalizationError::UnsupportedShape {
            shape: json_type_name(other).to_string(),
        }),
    }
}

/// Choose between the primary and the alternative input
///
/// The alternative is only consulted when the primary is absent or an empty
/// array, and only used when it carries something itself.
pub fn select_source<'a>(row_data: &'a Value, alternative_data: &'a Value) -> &'a Value {
    if is_blank(row_data) && !is_blank(alternative_data) {
        debug!("primary input is empty, using alternative data");
        return alternative_data;
    }
    row_data
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Content of the inline diagnostic panel shown when data cannot be loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDiagnostic {
    /// Human-readable error
    pub message: String,
    /// JSON type of the primary input
    pub raw_type: String,
    /// Number of elements found after unwrapping, when known
    pub row_count: Option<usize>,
    /// Keys of the first element, when it is an object
    pub first_row_keys: Vec<String>,
    /// Beginning of the pretty-printed primary input
    pub raw_sample: String,
    /// Beginning of the pretty-printed alternative input
    pub alternative_sample: String,
}

impl DataDiagnostic {
    /// Describe a normalization failure for display
    pub fn describe(error: &NormalizationError, raw: &Value, alternative: &Value) -> Self {
        let (row_count, first_row_keys) = match error {
            NormalizationError::InvalidRowType { rows, .. } => {
                let keys = rows
                    .first()
                    .and_then(Value::as_object)
                    .map(|first| first.keys().cloned().collect())
                    .unwrap_or_default();
                (Some(rows.len()), keys)
            }
            NormalizationError::EmptyDataset => (Some(0), Vec::new()),
            NormalizationError::UnsupportedShape { .. } => (None, Vec::new()),
        };

        Self {
            message: error.to_string(),
            raw_type: json_type_name(raw).to_string(),
            row_count,
            first_row_keys,
            raw_sample: sample(raw),
            alternative_sample: sample(alternative),
        }
    }
}

fn sample(value: &Value) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
    if pretty.chars().count() <= SAMPLE_CHARS {
        return pretty;
    }
    let mut truncated: String = pretty.chars().take(SAMPLE_CHARS).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows_a_b() -> Value {
        json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}])
    }

    #[test]
    fn test_bare_array() {
        let rows = normalize(&rows_a_b()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["name"], json!("b"));
    }

    #[test]
    fn test_wrapped_shapes_match_bare_array() {
        let bare = normalize(&rows_a_b()).unwrap();
        let data = normalize(&json!({"data": rows_a_b(), "count": 2})).unwrap();
        let results = normalize(&json!({"results": rows_a_b()})).unwrap();

        assert_eq!(bare, data);
        assert_eq!(bare, results);
    }

    #[test]
    fn test_data_takes_priority_over_results() {
        let input = json!({"results": [{"from": "results"}], "data": [{"from": "data"}]});
        let rows = normalize(&input).unwrap();
        assert_eq!(rows[0]["from"], json!("data"));
    }

    #[test]
    fn test_single_object_is_wrapped() {
        let rows = normalize(&json!({"id": 1, "name": "a"})).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(1));
    }

    #[test]
    fn test_non_array_data_field_wraps_whole_object() {
        let rows = normalize(&json!({"data": "not rows"})).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["data"], json!("not rows"));
    }

    #[test]
    fn test_empty_dataset() {
        assert_eq!(normalize(&json!([])), Err(NormalizationError::EmptyDataset));
        assert_eq!(
            normalize(&json!({"data": []})),
            Err(NormalizationError::EmptyDataset)
        );
    }

    #[test]
    fn test_unsupported_shapes() {
        for input in [Value::Null, json!(42), json!("rows"), json!(true)] {
            assert!(matches!(
                normalize(&input),
                Err(NormalizationError::UnsupportedShape { .. })
            ));
        }
    }

    #[test]
    fn test_invalid_rows_keep_sequence() {
        let err = normalize(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(
            err,
            NormalizationError::InvalidRowType {
                invalid: 3,
                rows: vec![json!(1), json!(2), json!(3)],
            }
        );
    }

    #[test]
    fn test_null_and_array_elements_are_invalid() {
        let err = normalize(&json!([{"a": 1}, null, [1]])).unwrap_err();
        assert!(matches!(err, NormalizationError::InvalidRowType { invalid: 2, .. }));
    }

    #[test]
    fn test_select_source_prefers_primary() {
        let primary = rows_a_b();
        let alternative = json!({"data": [{"x": 1}]});
        assert_eq!(select_source(&primary, &alternative), &primary);
    }

    #[test]
    fn test_select_source_falls_back_when_primary_empty() {
        let alternative = json!({"data": [{"x": 1}]});
        assert_eq!(select_source(&json!([]), &alternative), &alternative);
        assert_eq!(select_source(&Value::Null, &alternative), &alternative);
    }

    #[test]
    fn test_select_source_keeps_primary_when_both_empty() {
        let primary = json!([]);
        assert_eq!(select_source(&primary, &Value::Null), &primary);
    }

    #[test]
    fn test_diagnostic_for_invalid_rows() {
        let raw = json!([{"a": 1, "b": 2}, 5]);
        let err = normalize(&raw).unwrap_err();
        let diag = DataDiagnostic::describe(&err, &raw, &Value::Null);

        assert_eq!(diag.message, "found 1 invalid rows that are not objects");
        assert_eq!(diag.raw_type, "array");
        assert_eq!(diag.row_count, Some(2));
        assert_eq!(diag.first_row_keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(diag.alternative_sample, "null");
    }

    #[test]
    fn test_diagnostic_sample_is_truncated() {
        let raw: Value = (0..100).map(|i| json!({"value": i})).collect();
        let diag = DataDiagnostic::describe(&NormalizationError::EmptyDataset, &raw, &Value::Null);
        assert!(diag.raw_sample.ends_with("..."));
        assert_eq!(diag.raw_sample.chars().count(), SAMPLE_CHARS + 3);
    }
}
