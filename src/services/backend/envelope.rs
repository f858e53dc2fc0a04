use serde_json::Value;

/// The backend sometimes wraps payloads as `{"data": ...}` and sometimes
/// returns them bare. Strips one level of envelope when present.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("data").is_some_and(|d| !d.is_null()) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Human-readable reason from an error body, whichever key the backend used.
pub fn message_of(value: &Value) -> Option<String> {
    ["message", "error", "reason", "msg"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Reads a boolean flag from the envelope or its payload.
pub fn flag(value: &Value, key: &str) -> Option<bool> {
    value
        .get(key)
        .and_then(Value::as_bool)
        .or_else(|| value.get("data").and_then(|d| d.get(key)).and_then(Value::as_bool))
}
