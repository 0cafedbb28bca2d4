//! Value extraction and coercion over telemetry payloads.
//!
//! Telemetry payloads are arbitrary JSON. Conditions address them with a
//! dotted path and compare the result through the operator table, which
//! needs three loose conversions: to a number, to a string, and a strict
//! equality that still treats `30` and `30.0` as the same number.
//!
//! An absent value is represented as `None` ("undefined") throughout, never
//! as an error.

use serde_json::Value;

/// Walk `path` (e.g. `"value.temperature"`) segment by segment from `root`.
///
/// Objects are indexed by key and arrays by decimal index. Returns `None` as
/// soon as a segment is missing or the current value cannot be indexed.
#[must_use]
pub fn extract<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Coerce to a number the way loosely typed telemetry expects.
///
/// | input | result |
/// |---|---|
/// | number | itself |
/// | bool | `1` / `0` |
/// | null, `""`, `[]` | `0` |
/// | numeric string (trimmed) | parsed value |
/// | single-element array | its element, coerced |
/// | anything else, undefined | `NaN` |
#[must_use]
pub fn coerce_number(value: Option<&Value>) -> f64 {
    let Some(value) = value else {
        return f64::NAN;
    };
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => coerce_number(Some(single)),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

/// Coerce to a string for containment checks.
#[must_use]
pub fn coerce_string(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return "undefined".to_string();
    };
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Equality without type coercion.
///
/// Numbers compare by value so integer and float encodings of the same
/// reading are equal. Undefined only equals undefined.
#[must_use]
pub fn strict_eq(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(Value::Number(a)), Some(Value::Number(b))) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_extract_nested_property() {
        let root = json!({"value": {"temperature": 35}});
        assert_eq!(extract(&root, "value.temperature"), Some(&json!(35)));
    }

    #[test]
    fn should_extract_top_level_property() {
        let root = json!({"online": true});
        assert_eq!(extract(&root, "online"), Some(&json!(true)));
    }

    #[test]
    fn should_index_into_arrays_by_position() {
        let root = json!({"value": {"readings": [10, 20, 30]}});
        assert_eq!(extract(&root, "value.readings.1"), Some(&json!(20)));
        assert_eq!(extract(&root, "value.readings.9"), None);
        assert_eq!(extract(&root, "value.readings.first"), None);
    }

    #[test]
    fn should_return_undefined_when_key_is_missing() {
        let root = json!({"value": {"temperature": 35}});
        assert_eq!(extract(&root, "value.humidity"), None);
    }

    #[test]
    fn should_return_undefined_when_walking_through_a_scalar() {
        let root = json!({"value": 12});
        assert_eq!(extract(&root, "value.temperature"), None);
    }

    #[test]
    fn should_coerce_numbers_loosely() {
        assert!((coerce_number(Some(&json!(21.5))) - 21.5).abs() < f64::EPSILON);
        assert!((coerce_number(Some(&json!(" 42 "))) - 42.0).abs() < f64::EPSILON);
        assert!((coerce_number(Some(&json!(true))) - 1.0).abs() < f64::EPSILON);
        assert!(coerce_number(Some(&json!(null))).abs() < f64::EPSILON);
        assert!(coerce_number(Some(&json!(""))).abs() < f64::EPSILON);
        assert!((coerce_number(Some(&json!(["7"]))) - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn should_coerce_non_numeric_values_to_nan() {
        assert!(coerce_number(None).is_nan());
        assert!(coerce_number(Some(&json!("warm"))).is_nan());
        assert!(coerce_number(Some(&json!({"a": 1}))).is_nan());
        assert!(coerce_number(Some(&json!([1, 2]))).is_nan());
    }

    #[test]
    fn should_coerce_values_to_strings() {
        assert_eq!(coerce_string(Some(&json!("open"))), "open");
        assert_eq!(coerce_string(Some(&json!(12))), "12");
        assert_eq!(coerce_string(Some(&json!(false))), "false");
        assert_eq!(coerce_string(Some(&json!(null))), "null");
        assert_eq!(coerce_string(Some(&json!(["a", 1, null]))), "a,1,");
        assert_eq!(coerce_string(Some(&json!({}))), "[object Object]");
        assert_eq!(coerce_string(None), "undefined");
    }

    #[test]
    fn should_treat_integer_and_float_encodings_as_equal() {
        assert!(strict_eq(Some(&json!(30)), Some(&json!(30.0))));
    }

    #[test]
    fn should_not_coerce_types_in_strict_equality() {
        assert!(!strict_eq(Some(&json!("30")), Some(&json!(30))));
        assert!(!strict_eq(Some(&json!(1)), Some(&json!(true))));
        assert!(!strict_eq(None, Some(&json!(null))));
        assert!(strict_eq(None, None));
    }
}
