//! Strict access to schema description mappings
//!
//! Every entity of the schema is parsed from a generic key/value mapping.
//! `Mapping` enumerates the recognised keys of one entity and turns every
//! deviation (missing key, unknown key, wrong value type) into a
//! [`SchemaError`] naming the element that triggered it.

use serde_json::{Map, Value};

use crate::error::SchemaError;

/// A description mapping together with the label of the element it describes
#[derive(Debug, Clone)]
pub(crate) struct Mapping<'a> {
    element: String,
    map: &'a Map<String, Value>,
}

impl<'a> Mapping<'a> {
    /// Wrap `value`, failing if it is not a mapping
    pub fn new(value: &'a Value, element: impl Into<String>) -> Result<Self, SchemaError> {
        let element = element.into();
        match value {
            Value::Object(map) => Ok(Self { element, map }),
            other => Err(SchemaError::InvalidValue {
                element,
                key: "<self>".to_string(),
                reason: format!("expected a mapping, found {}", kind_of(other)),
            }),
        }
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    /// Relabel the element, typically once its name is known
    pub fn relabel(&mut self, element: impl Into<String>) {
        self.element = element.into();
    }

    /// Reject every key not listed in `allowed`
    pub fn deny_unknown_keys(&self, allowed: &[&str]) -> Result<(), SchemaError> {
        match self.map.keys().find(|key| !allowed.contains(&key.as_str())) {
            Some(key) => Err(SchemaError::UnexpectedKey {
                element: self.element.clone(),
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }

    // Null values count as absent so that `doc: ~` behaves like no doc at all.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|value| !value.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn missing(&self, key: &str) -> SchemaError {
        SchemaError::MissingKey {
            element: self.element.clone(),
            key: key.to_string(),
        }
    }

    fn invalid(&self, key: &str, expected: &str, found: &Value) -> SchemaError {
        SchemaError::InvalidValue {
            element: self.element.clone(),
            key: key.to_string(),
            reason: format!("expected {expected}, found {}", kind_of(found)),
        }
    }

    pub fn required_str(&self, key: &str) -> Result<&'a str, SchemaError> {
        self.optional_str(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<&'a str>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.invalid(key, "a string", other)),
        }
    }

    /// Absent booleans default to `false`
    pub fn flag(&self, key: &str) -> Result<bool, SchemaError> {
        match self.get(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(self.invalid(key, "a boolean", other)),
        }
    }

    pub fn required_seq(&self, key: &str) -> Result<&'a [Value], SchemaError> {
        self.optional_seq(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn optional_seq(&self, key: &str) -> Result<Option<&'a [Value]>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items.as_slice())),
            Some(other) => Err(self.invalid(key, "a sequence", other)),
        }
    }

    /// A sequence of plain strings, such as a struct's `key`
    pub fn optional_str_list(&self, key: &str) -> Result<Vec<&'a str>, SchemaError> {
        let Some(items) = self.optional_seq(key)? else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.as_str()),
                other => Err(self.invalid(key, "a sequence of strings", other)),
            })
            .collect()
    }

    pub fn optional_mapping(
        &self,
        key: &str,
        element: impl Into<String>,
    ) -> Result<Option<Mapping<'a>>, SchemaError> {
        self.get(key).map(|value| Mapping::new(value, element)).transpose()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
