use serde_json::Value;

pub enum NullableValue {
    Omitted,
    Null,
    String(String),
}

pub fn classify_nullable(optional_value: Option<&Value>) -> Result<NullableValue, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(Value::String(s)) => Ok(NullableValue::String(s.to_owned())),
        Some(other) => Err(format!("expected string or null, got {other}")),
    }
}

/// Reads an optional boolean; omitted and `null` both yield `None`.
pub fn optional_bool(optional_value: Option<&Value>) -> Result<Option<bool>, String> {
    match optional_value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(other) => Err(format!("expected boolean, got {other}")),
    }
}

/// Reads an optional string; omitted and `null` both yield `None`.
pub fn optional_string(optional_value: Option<&Value>) -> Result<Option<String>, String> {
    match classify_nullable(optional_value)? {
        NullableValue::Omitted | NullableValue::Null => Ok(None),
        NullableValue::String(value) => Ok(Some(value)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn classifies_nullable_strings() {
        let body = json!({ "a": null, "b": "x", "c": 3 });
        assert!(matches!(
            classify_nullable(body.get("missing")),
            Ok(NullableValue::Omitted)
        ));
        assert!(matches!(
            classify_nullable(body.get("a")),
            Ok(NullableValue::Null)
        ));
        assert!(matches!(
            classify_nullable(body.get("b")),
            Ok(NullableValue::String(ref s)) if s == "x"
        ));
        assert!(classify_nullable(body.get("c")).is_err());
    }

    #[test]
    fn reads_optional_bools() {
        let body = json!({ "yes": true, "nil": null, "bad": "true" });
        assert_eq!(optional_bool(body.get("yes")), Ok(Some(true)));
        assert_eq!(optional_bool(body.get("nil")), Ok(None));
        assert_eq!(optional_bool(body.get("missing")), Ok(None));
        assert!(optional_bool(body.get("bad")).is_err());
    }
}
