//! Bound statement parameters.
//!
//! Positional keys are 1-based (`?` placeholders in order of appearance);
//! named keys carry their `:` prefix (`:name`). Key `0` is rejected; the
//! addressing convention is uniformly 1-based.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::error::{DbError, DbResult};
use crate::value::Value;

/// A parameter key: 1-based position or `:name`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParamKey {
    /// 1-based positional slot
    Position(usize),
    /// Named slot, including the leading `:`
    Name(String),
}

impl From<usize> for ParamKey {
    fn from(v: usize) -> Self {
        ParamKey::Position(v)
    }
}

impl From<&str> for ParamKey {
    fn from(v: &str) -> Self {
        ParamKey::Name(v.to_string())
    }
}

impl From<String> for ParamKey {
    fn from(v: String) -> Self {
        ParamKey::Name(v)
    }
}

/// The bound parameters of one statement.
#[derive(Clone, Debug, Default)]
pub struct Params {
    positional: BTreeMap<usize, Value>,
    named: BTreeMap<String, Value>,
}

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind one parameter. A position of `0` is stored but rejected by
    /// [`Params::validate`] before any execution.
    pub fn set(&mut self, key: impl Into<ParamKey>, value: impl Into<Value>) {
        match key.into() {
            ParamKey::Position(idx) => {
                self.positional.insert(idx, value.into());
            }
            ParamKey::Name(name) => {
                self.named.insert(name, value.into());
            }
        }
    }

    /// Merge another parameter set into this one (other wins on conflict).
    pub fn extend(&mut self, other: &Params) {
        for (idx, value) in &other.positional {
            self.positional.insert(*idx, value.clone());
        }
        for (name, value) in &other.named {
            self.named.insert(name.clone(), value.clone());
        }
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Total number of bound parameters.
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    /// Whether `name` (with its `:` prefix) is a bound named parameter.
    /// The condition compiler uses this to pass declared keys through
    /// unquoted.
    pub fn has_name(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Positional bindings in key order.
    pub fn positional(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.positional.iter().map(|(idx, value)| (*idx, value))
    }

    /// Named bindings in key order.
    pub fn named(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.named.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Look up a positional binding.
    pub fn get_position(&self, idx: usize) -> Option<&Value> {
        self.positional.get(&idx)
    }

    /// Look up a named binding (key includes the `:`).
    pub fn get_name(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    /// Remove every binding.
    pub fn clear(&mut self) {
        self.positional.clear();
        self.named.clear();
    }

    /// Reject invalid keys before execution: positional slots are 1-based,
    /// so key `0` is an error.
    pub fn validate(&self) -> DbResult<()> {
        if self.positional.contains_key(&0) {
            return Err(DbError::parameter(
                "positional parameters are 1-based; key 0 is not a valid slot",
            ));
        }
        Ok(())
    }

    /// Stable serialized form, used as the parameter component of query
    /// cache keys.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // BTreeMap iteration is sorted, so the rendering is stable.
        let mut map: BTreeMap<String, &Value> = BTreeMap::new();
        for (idx, value) in &self.positional {
            map.insert(idx.to_string(), value);
        }
        for (name, value) in &self.named {
            map.insert(name.clone(), value);
        }
        map.serialize(serializer)
    }
}
