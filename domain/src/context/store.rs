//! The shared, mutable key/value state of one conversation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key/value pairs produced by a tool and merged into the store.
pub type ContextDelta = BTreeMap<String, Value>;

/// Mapping shared by every agent and the dispatcher within one session.
///
/// Callers that need isolation (for example while evaluating a hand-off
/// condition) take a [`snapshot`](Self::snapshot) instead of borrowing the
/// live store. Tool deltas are applied in place with [`merge`](Self::merge).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextStore {
    values: BTreeMap<String, Value>,
}

/// Immutable copy of a [`ContextStore`] taken at some point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextSnapshot(BTreeMap<String, Value>);

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from existing pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value for `key`, ignoring non-string values.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Numeric value for `key`. Numeric strings are accepted too.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.values.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Insert or replace one value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Apply a tool delta in place. Later keys overwrite earlier ones.
    pub fn merge(&mut self, delta: &ContextDelta) {
        for (key, value) in delta {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot(self.values.clone())
    }

    /// Replace the whole store with a previously taken snapshot.
    pub fn restore(&mut self, snapshot: &ContextSnapshot) {
        self.values = snapshot.0.clone();
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

    /// Render a value the way it is shown inside prompts.
    ///
    /// Strings are inserted verbatim, missing keys and nulls become `None`,
    /// everything else is rendered as JSON.
    pub fn display_value(&self, key: &str) -> String {
        match self.values.get(key) {
            None | Some(Value::Null) => "None".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Substitute `{key}` placeholders in `template` with store values.
    ///
    /// Braces that do not enclose an identifier are copied unchanged.
    pub fn render_template(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) if is_placeholder(&after[..end]) => {
                    out.push_str(&self.display_value(&after[..end]));
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// The store as a JSON object, for persistence and adapters.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl ContextSnapshot {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Turn the snapshot into an independent, writable store.
    pub fn into_store(self) -> ContextStore {
        ContextStore { values: self.0 }
    }
}

fn is_placeholder(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_overwrites_and_adds() {
        let mut store = ContextStore::from_pairs([("bottom_price", json!(1000)), ("buyer_emotion", Value::Null)]);
        let mut delta = ContextDelta::new();
        delta.insert("buyer_emotion".to_string(), json!("positive"));
        delta.insert("nft_id".to_string(), json!("7"));

        store.merge(&delta);

        assert_eq!(store.get_f64("bottom_price"), Some(1000.0));
        assert_eq!(store.get_str("buyer_emotion"), Some("positive"));
        assert_eq!(store.get_str("nft_id"), Some("7"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let mut store = ContextStore::from_pairs([("bottom_price", json!(1000))]);
        let snapshot = store.snapshot();

        store.set("bottom_price", json!(1500));
        assert_eq!(snapshot.get("bottom_price"), Some(&json!(1000)));

        store.restore(&snapshot);
        assert_eq!(store.get_f64("bottom_price"), Some(1000.0));
    }

    #[test]
    fn test_snapshot_into_store_is_independent() {
        let store = ContextStore::from_pairs([("k", json!(1))]);
        let mut copy = store.snapshot().into_store();
        copy.set("k", json!(2));
        assert_eq!(store.get("k"), Some(&json!(1)));
    }

    #[test]
    fn test_render_template() {
        let store = ContextStore::from_pairs([
            ("bottom_price", json!(1200.5)),
            ("artwork_name", json!("Dawn")),
            ("buyer_emotion", Value::Null),
        ]);

        let rendered = store.render_template(
            "Sell {artwork_name} above {bottom_price}. Mood: {buyer_emotion}. Unknown: {missing}. Raw: {not a key} {",
        );
        assert_eq!(
            rendered,
            "Sell Dawn above 1200.5. Mood: None. Unknown: None. Raw: {not a key} {"
        );
    }

    #[test]
    fn test_numeric_strings_are_read_as_numbers() {
        let store = ContextStore::from_pairs([("bottom_price", json!("950.25"))]);
        assert_eq!(store.get_f64("bottom_price"), Some(950.25));
        assert_eq!(store.get_f64("absent"), None);
    }

    #[test]
    fn test_to_json_object() {
        let store = ContextStore::from_pairs([("a", json!(1))]);
        assert_eq!(store.to_json(), json!({"a": 1}));
    }
}
