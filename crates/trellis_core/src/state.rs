//! Widget state maps
//!
//! Every session keeps a flat JSON object mapping widget ids to their
//! current values. Widgets never own their values; they read them from
//! a [`StateMap`] at render time. A [`StateProvider`] redirects those reads
//! to a different map, optionally stripping an id prefix first, so one
//! widget subtree can be rendered against many data records.
//!
//! # Example
//!
//! ```ignore
//! use trellis_core::{StateMap, StateProvider};
//!
//! let mut record = StateMap::new();
//! record.put("name", "Rex");
//!
//! let provider = StateProvider::new("card:", record);
//! assert_eq!(provider.string_value("card:name"), "Rex");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// Suffix appended to a widget id to form the key of its problem text
pub const PROBLEM_SUFFIX: &str = ".problem";

/// Key under which a widget's problem text (validation message) is stored
pub fn problem_key(widget_id: &str) -> String {
    assert!(!widget_id.is_empty(), "problem key requested for empty widget id");
    format!("{widget_id}{PROBLEM_SUFFIX}")
}

/// A JSON object keyed by widget id
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMap {
    values: Map<String, Value>,
}

impl StateMap {
    /// Create an empty state map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a state map from JSON text; the text must hold an object
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(CoreError::NotAnObject(other.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Store a value, replacing any previous one
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Remove a key, returning its previous value
    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Remove every key starting with `prefix`
    pub fn delete_with_prefix(&mut self, prefix: &str) {
        self.values.retain(|key, _| !key.starts_with(prefix));
    }

    /// String value, or `default` if missing or not a string
    pub fn opt_string(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => default.to_string(),
        }
    }

    /// Integer value, or `default` if missing or not an integer
    pub fn opt_int(&self, key: &str, default: i64) -> i64 {
        self.values
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    pub fn opt_float(&self, key: &str, default: f64) -> f64 {
        self.values
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    /// Boolean value, or `default` if missing or not a boolean
    pub fn opt_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// Integer value; a missing key or a non-integer is an error
    pub fn int(&self, key: &str) -> Result<i64> {
        self.values
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| CoreError::WrongType {
                key: key.to_string(),
                expected: "integer",
            })
    }

    /// Render-friendly text for a key: strings verbatim, null or missing as
    /// empty, anything else in its JSON form
    pub fn display_string(&self, key: &str) -> String {
        match self.values.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Compact single-line JSON
    pub fn to_compact_string(&self) -> String {
        Value::Object(self.values.clone()).to_string()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

impl From<Map<String, Value>> for StateMap {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

/// Indirection from widget ids to a backing state map
///
/// Ids are looked up in `state` after `prefix` has been removed. Ids that
/// don't carry the prefix are looked up unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateProvider {
    pub prefix: String,
    pub state: StateMap,
}

impl StateProvider {
    pub fn new(prefix: impl Into<String>, state: StateMap) -> Self {
        Self {
            prefix: prefix.into(),
            state,
        }
    }

    /// The key under which `id` is stored in the backing map
    pub fn key_for<'a>(&self, id: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            return id;
        }
        id.strip_prefix(self.prefix.as_str()).unwrap_or(id)
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.state.get(self.key_for(id))
    }

    pub fn string_value(&self, id: &str) -> String {
        self.state.display_string(self.key_for(id))
    }

    pub fn put(&mut self, id: &str, value: impl Into<Value>) {
        let key = self.key_for(id).to_string();
        self.state.put(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_reads_with_defaults() {
        let mut state = StateMap::new();
        state.put("name", "zebra").put("age", 7).put("alive", true);

        assert_eq!(state.opt_string("name", ""), "zebra");
        assert_eq!(state.opt_string("age", "?"), "?");
        assert_eq!(state.opt_int("age", 0), 7);
        assert_eq!(state.opt_int("missing", -1), -1);
        assert!(state.opt_bool("alive", false));
        assert_eq!(state.int("age").unwrap(), 7);
        assert!(state.int("name").is_err());
    }

    #[test]
    fn test_display_string() {
        let mut state = StateMap::new();
        state.put("n", 42).put("s", "text").put("z", Value::Null);

        assert_eq!(state.display_string("n"), "42");
        assert_eq!(state.display_string("s"), "text");
        assert_eq!(state.display_string("z"), "");
        assert_eq!(state.display_string("absent"), "");
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(StateMap::parse("[1,2]").is_err());
        assert!(StateMap::parse("{not json").is_err());

        let state = StateMap::parse(r#"{"bird":""}"#).unwrap();
        assert_eq!(state.opt_string("bird", "x"), "");
    }

    #[test]
    fn test_delete_with_prefix() {
        let mut state = StateMap::new();
        state.put("a.problem", "x").put("a", 1).put("b", 2);
        state.delete_with_prefix("a");
        assert_eq!(state.len(), 1);
        assert!(state.contains("b"));
    }

    #[test]
    fn test_provider_strips_prefix() {
        let record = StateMap::from_value(json!({ "name": "Rex", "age": 3 })).unwrap();
        let mut provider = StateProvider::new("card:", record);

        assert_eq!(provider.key_for("card:name"), "name");
        assert_eq!(provider.key_for("other"), "other");
        assert_eq!(provider.string_value("card:name"), "Rex");
        assert_eq!(provider.get("card:age"), Some(&json!(3)));

        provider.put("card:age", 4);
        assert_eq!(provider.state.opt_int("age", 0), 4);
    }

    #[test]
    fn test_problem_key() {
        assert_eq!(problem_key("bird"), "bird.problem");
    }
}
