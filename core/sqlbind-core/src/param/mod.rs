//! Parameter objects and collection wrapping.
//!
//! Callers hand a single parameter to every statement. Raw sequences are
//! wrapped into a strict name→value map so SQL templates can reference
//! `collection`, `list`, or `array` placeholders uniformly regardless of
//! what the caller passed:
//!
//! - ordered indexable sequence → `collection` and `list`
//! - unordered collection       → `collection` only
//! - fixed-size array           → `array` only
//!
//! Lookups of a key absent from a wrapped map fail with
//! [`SqlBindError::ParameterNotFound`] naming the available keys, never
//! silently returning nothing.

use crate::error::{SqlBindError, SqlBindResult};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// The single parameter object a statement executes with.
///
/// The shape tags exist so the collection-wrapping rule can tell an ordered
/// sequence from an unordered one and from a fixed-size array; after
/// wrapping, all three collapse into a [`StrictMap`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Parameter {
    /// No parameter.
    Null,
    /// A scalar or an already-shaped object.
    Value(Value),
    /// Ordered indexable sequence (wrapped under `collection` and `list`).
    List(Vec<Value>),
    /// Unordered collection (wrapped under `collection` only).
    Set(Vec<Value>),
    /// Fixed-size array (wrapped under `array` only).
    Array(Box<[Value]>),
    /// Named fields, looked up strictly.
    Strict(StrictMap),
}

impl Parameter {
    /// Apply the collection-wrapping rule. Non-collection parameters pass
    /// through unchanged.
    pub fn wrap_collections(self) -> Parameter {
        match self {
            Parameter::List(items) => {
                let mut map = StrictMap::new();
                map.insert("collection", Value::Array(items.clone()));
                map.insert("list", Value::Array(items));
                Parameter::Strict(map)
            }
            Parameter::Set(items) => {
                let mut map = StrictMap::new();
                map.insert("collection", Value::Array(items));
                Parameter::Strict(map)
            }
            Parameter::Array(items) => {
                let mut map = StrictMap::new();
                map.insert("array", Value::Array(items.into_vec()));
                Parameter::Strict(map)
            }
            other => other,
        }
    }

    /// Flatten into a plain JSON value, e.g. for assembling a multi-argument
    /// parameter map or a cache fingerprint.
    pub fn into_value(self) -> Value {
        match self {
            Parameter::Null => Value::Null,
            Parameter::Value(v) => v,
            Parameter::List(items) | Parameter::Set(items) => Value::Array(items),
            Parameter::Array(items) => Value::Array(items.into_vec()),
            Parameter::Strict(map) => {
                Value::Object(map.entries.into_iter().collect())
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Parameter::Null)
    }

    /// Strict lookup on a wrapped or named-field parameter.
    pub fn get(&self, key: &str) -> SqlBindResult<&Value> {
        match self {
            Parameter::Strict(map) => map.get(key),
            Parameter::Value(Value::Object(fields)) => fields.get(key).ok_or_else(|| {
                SqlBindError::ParameterNotFound {
                    key: key.to_string(),
                    available: fields.keys().cloned().collect(),
                }
            }),
            _ => Err(SqlBindError::ParameterNotFound {
                key: key.to_string(),
                available: Vec::new(),
            }),
        }
    }
}

impl From<Value> for Parameter {
    fn from(value: Value) -> Self {
        Parameter::Value(value)
    }
}

impl From<i64> for Parameter {
    fn from(value: i64) -> Self {
        Parameter::Value(Value::from(value))
    }
}

impl From<&str> for Parameter {
    fn from(value: &str) -> Self {
        Parameter::Value(Value::from(value))
    }
}

impl From<String> for Parameter {
    fn from(value: String) -> Self {
        Parameter::Value(Value::from(value))
    }
}

impl From<bool> for Parameter {
    fn from(value: bool) -> Self {
        Parameter::Value(Value::from(value))
    }
}

impl From<Vec<Value>> for Parameter {
    fn from(items: Vec<Value>) -> Self {
        Parameter::List(items)
    }
}

/// Name→value map whose lookups fail loudly.
///
/// `get` on an absent key returns [`SqlBindError::ParameterNotFound`]
/// carrying the requested key and the set of keys that do exist, so a SQL
/// template referencing a misspelled placeholder produces a diagnosable
/// error instead of a silent null. Backed by an ordered map so cache
/// fingerprints are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StrictMap {
    entries: BTreeMap<String, Value>,
}

impl StrictMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> SqlBindResult<&Value> {
        self.entries
            .get(key)
            .ok_or_else(|| SqlBindError::ParameterNotFound {
                key: key.to_string(),
                available: self.entries.keys().cloned().collect(),
            })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for StrictMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
