use serde_json::{Map, Value};

/// In-progress form state: a flat map of field name to JSON value.
///
/// A draft starts from its page's seeded defaults and changes one key at a
/// time. Submission borrows it, so a failed submit leaves every entered
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormDraft {
    values: Map<String, Value>,
}

impl FormDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draft pre-filled with `(key, value)` defaults.
    pub fn seeded<I, K>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            values: defaults.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Replace exactly one key, leaving all others untouched.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value of `key`, or `""` when absent or not a string.
    pub fn text(&self, key: &str) -> &str {
        self.values.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// Truthiness in the form sense: `true`, or a non-empty string.
    pub fn flag(&self, key: &str) -> bool {
        match self.values.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            _ => false,
        }
    }

    /// Absent, null, or an empty string.
    pub fn is_blank(&self, key: &str) -> bool {
        match self.values.get(key) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            _ => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of the current values as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone())
    }

    pub(crate) fn to_map(&self) -> Map<String, Value> {
        self.values.clone()
    }
}
