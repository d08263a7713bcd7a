//! Wire encoding. spec.md §7 requires RFC 8259 compliant JSON: `serde_json`
//! already refuses to serialize `NaN`/`Infinity` as numbers, so a payload
//! containing one would fail to encode entirely. We sanitize first,
//! replacing non-finite floats with `null`, so a single bad sensor sample
//! degrades one field instead of dropping the whole message.

use serde_json::Value;

/// Serialize `payload` to JSON text, replacing non-finite floats with
/// `null` so the result is always valid RFC 8259 JSON.
pub fn encode<T: serde::Serialize>(payload: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(payload)?;
    let sanitized = sanitize(value);
    serde_json::to_string(&sanitized)
}

fn sanitize(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if !f.is_finite() => Value::Null,
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, sanitize(v))).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finite_values_pass_through() {
        let v = sanitize(json!({"a": 1.5, "b": [1, 2, 3]}));
        assert_eq!(v, json!({"a": 1.5, "b": [1, 2, 3]}));
    }

    #[test]
    fn non_finite_field_encodes_as_null() {
        #[derive(serde::Serialize)]
        struct Sample {
            x: f64,
        }
        let text = encode(&Sample { x: f64::NAN }).unwrap();
        assert_eq!(text, r#"{"x":null}"#);
        let text = encode(&Sample { x: f64::INFINITY }).unwrap();
        assert_eq!(text, r#"{"x":null}"#);
    }

    #[test]
    fn encode_produces_valid_json() {
        #[derive(serde::Serialize)]
        struct Sample {
            x: f64,
        }
        let text = encode(&Sample { x: 3.5 }).unwrap();
        assert_eq!(text, r#"{"x":3.5}"#);
    }
}
