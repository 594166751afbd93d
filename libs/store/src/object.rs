//! Generic object representation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::resource::ApiResource;

/// A schema-flexible object as stored remotely.
///
/// Only `apiVersion`, `kind` and `metadata` are interpreted; everything else
/// is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicObject(Map<String, Value>);

impl DynamicObject {
    /// Create an object skeleton with type and identity fields set.
    pub fn new(resource: &ApiResource, namespace: Option<&str>, name: &str) -> Self {
        let mut object = Self::default();
        object
            .0
            .insert("apiVersion".to_string(), Value::String(resource.api_version()));
        object
            .0
            .insert("kind".to_string(), Value::String(resource.kind.clone()));
        object.set_metadata("name", Value::String(name.to_string()));
        if let Some(ns) = namespace {
            object.set_metadata("namespace", Value::String(ns.to_string()));
        }
        object
    }

    /// Wrap an arbitrary JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StoreError::Decode(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Unwrap into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// `apiVersion`, if present.
    pub fn api_version(&self) -> Option<&str> {
        self.0.get("apiVersion").and_then(Value::as_str)
    }

    /// `kind`, if present.
    pub fn kind(&self) -> Option<&str> {
        self.0.get("kind").and_then(Value::as_str)
    }

    /// `metadata.name`, if present.
    pub fn name(&self) -> Option<&str> {
        self.metadata_str("name")
    }

    /// `metadata.namespace`, if present.
    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace")
    }

    /// `metadata.uid`, if assigned.
    pub fn uid(&self) -> Option<&str> {
        self.metadata_str("uid")
    }

    /// Look up a nested field by path.
    pub fn pointer(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.0.get(*first)?, |value, key| value.get(key))
    }

    /// Set a `metadata` field, creating `metadata` if needed.
    pub fn set_metadata(&mut self, key: &str, value: Value) {
        let metadata = self
            .0
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if !metadata.is_object() {
            *metadata = Value::Object(Map::new());
        }
        if let Value::Object(map) = metadata {
            map.insert(key.to_string(), value);
        }
    }

    /// Set a top-level field.
    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.0.get("metadata")?.get(key)?.as_str()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
