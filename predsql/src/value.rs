//! Literal values carried by query expressions and bound to statements.
use chrono::{DateTime, SecondsFormat, Utc};
use json::JsonValue;
use std::fmt;

/// Reference to another record by type and key.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    record_type: String,
    key: String,
}

impl Reference {
    pub fn new(record_type: &str, key: &str) -> Self {
        Reference {
            record_type: record_type.to_string(),
            key: key.to_string(),
        }
    }

    /// Parse the "type/key" form.
    pub fn parse(id: &str) -> Option<Self> {
        let (record_type, key) = id.split_once('/')?;
        if record_type.is_empty() || key.is_empty() {
            return None;
        }
        Some(Reference::new(record_type, key))
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.record_type, self.key)
    }
}

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    lng: f64,
    lat: f64,
}

impl Location {
    pub fn new(lng: f64, lat: f64) -> Self {
        Location { lng, lat }
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Location(Location),
    Reference(Reference),
    Json(JsonValue),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// The value as it is handed to the database.
    ///
    /// References are stored by key only.
    pub fn to_bind_value(&self) -> Value {
        match self {
            Value::Reference(r) => Value::String(r.key().to_string()),
            _ => self.clone(),
        }
    }

    pub fn to_json_value(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => json::from(*b),
            Value::Integer(i) => json::from(*i),
            Value::Number(n) => json::from(*n),
            Value::String(s) => json::from(s.as_str()),
            Value::DateTime(d) => json::from(d.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Value::Location(l) => json::object! {"lng": l.lng(), "lat": l.lat()},
            Value::Reference(r) => json::from(r.to_string()),
            Value::Json(j) => j.clone(),
            Value::Array(list) => {
                JsonValue::Array(list.iter().map(|v| v.to_json_value()).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json_value().dump())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Reference(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(list: Vec<Value>) -> Self {
        Value::Array(list)
    }
}
