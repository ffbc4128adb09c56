//! Wire shapes shared by every list endpoint.

use serde::Deserialize;
use serde_json::Value;

/// A list response: either a bare JSON array or a paginated
/// `{ "count": …, "results": [...] }` object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Bare(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(items) => items,
            ListEnvelope::Paged { results } => results,
        }
    }
}

/// String form of a record's `id`, whether the backend sent a UUID string
/// or an integer key.
pub fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
