pub mod adzuna;
pub mod github_ausjobs;
pub mod gradconnection;
pub mod linkedin;
pub mod remoteok;
pub mod remotive;
pub mod seek;
pub mod weworkremotely;

use serde_json::Value as JsonValue;

/// Trimmed, whitespace-collapsed string at `key`, or empty when absent or not a string.
pub(crate) fn json_str(item: &JsonValue, key: &str) -> String {
    item.get(key)
        .and_then(JsonValue::as_str)
        .map(jobfeed_core::clean_text)
        .unwrap_or_default()
}

/// Presence test for loosely typed API fields: null, false, zero and empty
/// strings, arrays or objects count as absent.
pub(crate) fn json_truthy(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(JsonValue::String(s)) => !s.is_empty(),
        Some(JsonValue::Array(a)) => !a.is_empty(),
        Some(JsonValue::Object(o)) => !o.is_empty(),
    }
}
