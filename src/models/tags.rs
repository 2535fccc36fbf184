//! Encoding of the tag-array columns (`knowledge_points`, `teaching_points`,
//! `tags`). The database only ever sees opaque text; this module owns the
//! conversion in both directions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// A tag field as supplied by a client: either a real list or a single
/// string, which may itself be pre-serialized JSON or legacy free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum TagInput {
    List(Vec<String>),
    Text(String),
}

const EMPTY_LIST: &str = "[]";

/// Normalizes a tag field for storage. Lists are serialized to JSON, strings
/// pass through untouched, and a missing or empty value becomes `[]`.
pub fn encode_tags(input: Option<&TagInput>) -> String {
    match input {
        Some(TagInput::List(items)) => {
            serde_json::to_string(items).unwrap_or_else(|_| EMPTY_LIST.to_string())
        }
        Some(TagInput::Text(text)) if !text.trim().is_empty() => text.clone(),
        _ => EMPTY_LIST.to_string(),
    }
}

/// Reads a stored tag column back as a list. Never fails: `NULL` and blank
/// values give an empty list, JSON arrays are decoded, and anything that is
/// not JSON is treated as a comma separated legacy value.
pub fn decode_tags(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            })
            .collect(),
        Ok(Value::String(inner)) => split_legacy(&inner),
        Ok(Value::Null) => Vec::new(),
        Ok(other) => vec![other.to_string()],
        Err(_) => split_legacy(raw),
    }
}

fn split_legacy(raw: &str) -> Vec<String> {
    raw.split([',', '，', ';', '；', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
