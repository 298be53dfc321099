//! Row records and typed row mapping.

use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{DbError, DbResult};
use crate::value::Value;

/// One result row: an ordered column-name → [`Value`] record.
///
/// The column header is shared (`Arc`) across every row of a result set.
#[derive(Clone, Debug)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row over a shared column header.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Column names, in select order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Read a field by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }

    /// Read a field by position.
    pub fn value(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Read a field by name, or fail with a decode error naming the column.
    pub fn require(&self, column: &str) -> DbResult<&Value> {
        self.get(column)
            .ok_or_else(|| DbError::decode(column, "column missing from row"))
    }

    /// Iterate `(name, value)` pairs in select order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Maps a [`Row`] into a typed value.
///
/// This replaces per-row dynamic class hydration: callers supply the mapping
/// as code instead of a class name and constructor arguments.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> DbResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        let columns: Arc<[String]> = vec!["id".to_string(), "name".to_string()].into();
        Row::new(columns, vec![Value::Int(1), Value::Str("alice".into())])
    }

    #[test]
    fn get_by_name_and_index() {
        let row = sample();
        assert_eq!(row.get("id").and_then(Value::as_int), Some(1));
        assert_eq!(row.value(1).and_then(Value::as_str), Some("alice"));
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn require_reports_column() {
        let row = sample();
        match row.require("missing") {
            Err(DbError::Decode { column, .. }) => assert_eq!(column, "missing"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn serializes_as_map() {
        let row = sample();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":1,"name":"alice"}"#);
    }
}
