use serde::{Deserialize, Serialize};
use serde_json::{Map, Value}; // Records are open-ended JSON objects
use std::fmt;
use thiserror::Error;

/// Name of the field every record must carry.
pub const ID_FIELD: &str = "id";

// --- Domain Errors ---
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Record must be a JSON object")]
    NotAnObject,
    #[error("Missing required field 'id'")]
    MissingId,
    #[error("Field 'id' must be an integer, got {0}")]
    InvalidId(String),
}

// --- Record ID ---

/// The public, caller-supplied identity of a record.
///
/// This is always a plain integer and is unrelated to whatever primary key the
/// backing store generates for its own bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- Record ---

/// A flat, schema-less record with a required integer `id`.
///
/// Fields keep the order in which they were supplied. Values are plain JSON;
/// store-native types (dates, generated ids) only ever reach this type in their
/// tagged extended-JSON form, e.g. `{"$date": ...}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "Value", into = "Value")]
pub struct Record {
    id: RecordId,
    fields: Map<String, Value>,
}

impl Record {
    /// Builds a record from a JSON object, validating the `id` field.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, DomainError> {
        let id = match fields.get(ID_FIELD) {
            None | Some(Value::Null) => return Err(DomainError::MissingId),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| DomainError::InvalidId(value.to_string()))?,
        };
        Ok(Self {
            id: RecordId::new(id),
            fields,
        })
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// All fields, `id` included, in their original order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get_field_value(&self, field_name: &str) -> Option<&Value> {
        self.fields.get(field_name)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl TryFrom<Value> for Record {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Self::from_fields(fields),
            _ => Err(DomainError::NotAnObject),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}
