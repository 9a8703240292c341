use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::metricalp::constants::GLOBAL_PROPS_KEY;

/// Property bag attached to one event type.
pub type PropertyBag = Map<String, Value>;

/// Shared custom properties keyed by event type, plus the reserved `_global` bucket that the
/// script merges into every event. Entries are usually property bags but any JSON value is kept
/// as supplied.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedCustomProps(BTreeMap<String, Value>);

impl SharedCustomProps {
    /// A store holding only an empty `_global` bucket.
    pub fn with_global() -> Self {
        let mut props = Self::default();
        props.ensure_global();
        props
    }

    /// Wraps caller supplied entries and guarantees `_global`. A supplied `_global` is kept.
    pub fn from_buckets(buckets: BTreeMap<String, Value>) -> Self {
        let mut props = Self(buckets);
        props.ensure_global();
        props
    }

    /// Reads every entry of a JSON object, whatever its value.
    pub fn from_json_object(object: Map<String, Value>) -> Self {
        Self::from_buckets(object.into_iter().collect())
    }

    pub fn ensure_global(&mut self) {
        self.0
            .entry(GLOBAL_PROPS_KEY.to_string())
            .or_insert_with(|| Value::Object(PropertyBag::new()));
    }

    /// Replaces the entry for `event_type`, leaving other keys untouched.
    pub fn set_for_type(&mut self, event_type: impl Into<String>, props: PropertyBag) {
        self.0.insert(event_type.into(), Value::Object(props));
    }

    pub fn get(&self, event_type: &str) -> Option<&Value> {
        self.0.get(event_type)
    }

    pub fn global(&self) -> Option<&Value> {
        self.0.get(GLOBAL_PROPS_KEY)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}

impl<K, V> FromIterator<(K, V)> for SharedCustomProps
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_buckets(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Builds a property bag from a `json!` object literal; anything else yields an empty bag.
pub fn props(value: Value) -> PropertyBag {
    match value {
        Value::Object(map) => map,
        _ => PropertyBag::new(),
    }
}
