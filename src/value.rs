use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ContextError;

/// A formatter function made addressable as a data field.
///
/// Formatters receive the value a template hands them and return the
/// formatted replacement. They are reference-counted so the same
/// formatter can live in the registry and in the composed data set at
/// once; identity is `Arc` pointer equality.
pub type Formatter = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// A single top-level field of a [`DataSet`].
///
/// The data set is heterogeneous by design: compositions merge the
/// formatter registry into the data, so a field is either a JSON value
/// (possibly a nested object) or a formatter function. A later merge
/// source with the same key shadows either kind.
#[derive(Clone)]
pub enum Field {
    /// A plain JSON value, including nested objects.
    Value(Value),
    /// A registered formatter, shared with the registry.
    Formatter(Formatter),
}

impl Field {
    /// The JSON value stored here, if this field is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            Field::Formatter(_) => None,
        }
    }

    /// Mutable access to the JSON value stored here, if this field is one.
    pub fn as_value_mut(&mut self) -> Option<&mut Value> {
        match self {
            Field::Value(value) => Some(value),
            Field::Formatter(_) => None,
        }
    }

    /// The formatter stored here, if this field is one.
    pub fn as_formatter(&self) -> Option<&Formatter> {
        match self {
            Field::Value(_) => None,
            Field::Formatter(formatter) => Some(formatter),
        }
    }

    /// Check if this field holds a formatter.
    pub fn is_formatter(&self) -> bool {
        matches!(self, Field::Formatter(_))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Value(value) => value.fmt(f),
            Field::Formatter(_) => f.write_str("<formatter>"),
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Value(a), Field::Value(b)) => a == b,
            // Formatters compare by identity, not behavior.
            (Field::Formatter(a), Field::Formatter(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Field::Value(value)
    }
}

impl From<Formatter> for Field {
    fn from(formatter: Formatter) -> Self {
        Field::Formatter(formatter)
    }
}

/// An ordered mapping of field names to [`Field`]s — the shape of the
/// context's `data`, `defaults`, `source` and every state partial.
///
/// Nested structure lives inside `Field::Value` as JSON objects; only
/// the top level can hold formatters, which mirrors how the formatter
/// registry merges in (formatter ids are top-level keys).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSet {
    fields: BTreeMap<String, Field>,
}

impl DataSet {
    /// Create an empty data set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the field stored under `key`.
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    /// Mutable access to the field stored under `key`.
    pub fn field_mut(&mut self, key: &str) -> Option<&mut Field> {
        self.fields.get_mut(key)
    }

    /// Insert a field, returning the previous one if present.
    pub fn insert(&mut self, key: impl Into<String>, field: impl Into<Field>) -> Option<Field> {
        self.fields.insert(key.into(), field.into())
    }

    /// Remove the field stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Field> {
        self.fields.remove(key)
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the data set has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over field names in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Render the value fields as a JSON object.
    ///
    /// Formatter fields are skipped — they are code, not data, and have
    /// no JSON representation.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (key, field) in &self.fields {
            if let Field::Value(value) = field {
                map.insert(key.clone(), value.clone());
            }
        }
        Value::Object(map)
    }
}

impl From<Map<String, Value>> for DataSet {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, Field::Value(v)))
                .collect(),
        }
    }
}

impl TryFrom<Value> for DataSet {
    type Error = ContextError;

    /// Build a data set from a JSON object. Any other JSON kind is an
    /// error — the data set is a mapping, not a bare value.
    fn try_from(value: Value) -> Result<Self, ContextError> {
        match value {
            Value::Object(map) => Ok(map.into()),
            other => Err(ContextError::NotAnObject(json_kind(&other))),
        }
    }
}

/// Human-readable kind of a JSON value, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
