//! Utility functions for the orchestration service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new message correlation identifier
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Look up a value inside a JSON document by dotted key path.
///
/// `lookup(&doc, "properties.rosters")` walks `doc["properties"]["rosters"]`.
/// Returns `None` as soon as a segment is missing or the current value is not
/// an object.
pub fn json_path_lookup<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
