//! A generic field-bag participant.
//!
//! `Record` stores its state directly as a field mapping, which makes it
//! the natural participant for ad-hoc objects, tests and scripting glue:
//!
//! ```
//! use memento::state::Record;
//! use serde_json::json;
//!
//! let user = Record::from_json("user", json!({"name": "Alice", "age": 30})).unwrap();
//! assert_eq!(user.get_str("name"), Some("Alice"));
//! ```

use serde_json::Value;

use crate::state::error::{RestoreError, StateError, StateResult};
use crate::state::participant::Participant;
use crate::state::value::{FieldValue, Fields};

/// a named object whose state is exactly its field mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// name used as the participant label
    name: String,
    /// field values
    fields: Fields,
}

impl Record {
    /// creates an empty record
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Fields::new(),
        }
    }

    /// create a record from a JSON object, one field per key
    pub fn from_json(name: impl Into<String>, value: Value) -> StateResult<Self> {
        let fields = match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (k, FieldValue::Data(v)))
                .collect(),
            other => return Err(StateError::NotAnObject(FieldValue::Data(other).type_name())),
        };
        Ok(Self {
            name: name.into(),
            fields,
        })
    }

    /// builder-style field assignment
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// sets a field, returning the previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(FieldValue::as_i64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Participant for Record {
    fn fields(&self) -> Fields {
        self.fields.clone()
    }

    fn replace_fields(&mut self, fields: Fields) -> Result<(), RestoreError> {
        self.fields = fields;
        Ok(())
    }

    fn label(&self) -> String {
        format!("Record({})", self.name)
    }
}
