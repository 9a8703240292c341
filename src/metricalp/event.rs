use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::metricalp::error::{invalid_argument, MetricalpResult};

const TYPE_KEY: &str = "type";

/// Scalar carried by an event field.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventValue {
    Text(String),
    Number(Number),
    Bool(bool),
}

impl EventValue {
    /// Returns `None` for NaN and infinities, which have no JSON representation.
    pub fn from_f64(value: f64) -> Option<Self> {
        Number::from_f64(value).map(EventValue::Number)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EventValue::Text(text) => Some(text),
            _ => None,
        }
    }

    fn from_json(key: &str, value: Value) -> MetricalpResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(EventValue::Text(text))),
            Value::Number(number) => Ok(Some(EventValue::Number(number))),
            Value::Bool(flag) => Ok(Some(EventValue::Bool(flag))),
            Value::Array(_) | Value::Object(_) => Err(invalid_argument(format!(
                "event field \"{key}\" must be a string, number or boolean"
            ))),
        }
    }
}

impl From<&str> for EventValue {
    fn from(value: &str) -> Self {
        EventValue::Text(value.to_owned())
    }
}

impl From<String> for EventValue {
    fn from(value: String) -> Self {
        EventValue::Text(value)
    }
}

impl From<bool> for EventValue {
    fn from(value: bool) -> Self {
        EventValue::Bool(value)
    }
}

macro_rules! impl_integer_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for EventValue {
                fn from(value: $ty) -> Self {
                    EventValue::Number(Number::from(value))
                }
            }
        )*
    };
}

impl_integer_value!(i32, i64, u32, u64, usize);

/// A tagged telemetry event: a `type` plus flat scalar fields.
///
/// Serializes to a single JSON object, `{"type": "...", "field": ...}`, which is the shape the
/// Metricalp script reads from its queue.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricalpEvent {
    event_type: String,
    fields: BTreeMap<String, EventValue>,
}

impl MetricalpEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field. The `type` key is reserved and ignored here.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<EventValue>) -> Self {
        let key = key.into();
        if key != TYPE_KEY {
            self.fields.insert(key, value.into());
        }
        self
    }

    /// Adds a floating point field; non-finite values are left out.
    pub fn with_number(self, key: impl Into<String>, value: f64) -> Self {
        match EventValue::from_f64(value) {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn get(&self, key: &str) -> Option<&EventValue> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, EventValue> {
        &self.fields
    }

    /// Builds an event from a JSON object with a string `type`. `null` fields are treated as
    /// absent.
    pub fn from_json(value: Value) -> MetricalpResult<Self> {
        let Value::Object(mut map) = value else {
            return Err(invalid_argument("event must be a JSON object"));
        };
        let event_type = match map.remove(TYPE_KEY) {
            Some(Value::String(event_type)) => event_type,
            Some(_) => return Err(invalid_argument("event \"type\" must be a string")),
            None => return Err(invalid_argument("event is missing \"type\"")),
        };

        let mut fields = BTreeMap::new();
        for (key, value) in map {
            if let Some(value) = EventValue::from_json(&key, value)? {
                fields.insert(key, value);
            }
        }
        Ok(Self { event_type, fields })
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(TYPE_KEY.to_string(), Value::String(self.event_type.clone()));
        for (key, value) in &self.fields {
            let value = match value {
                EventValue::Text(text) => Value::String(text.clone()),
                EventValue::Number(number) => Value::Number(number.clone()),
                EventValue::Bool(flag) => Value::Bool(*flag),
            };
            map.insert(key.clone(), value);
        }
        Value::Object(map)
    }
}

impl TryFrom<Value> for MetricalpEvent {
    type Error = crate::metricalp::error::MetricalpError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        MetricalpEvent::from_json(value)
    }
}

impl Serialize for MetricalpEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(TYPE_KEY, &self.event_type)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
