//! Materialized result sets.
//!
//! Drivers materialize rows before returning, so [`Rows`] is both the
//! "cached" result variant and the only one: native statement resources are
//! released inside the driver, deterministically, before the result is
//! handed out. The set is read-only by construction (there is no mutating
//! accessor) and randomly seekable through an interior cursor.

use std::cell::Cell;
use std::collections::HashMap;
use std::ops::Index;

use serde::Serialize;

use crate::row::{FromRow, Row};
use crate::value::Value;

/// A read-only, countable, seekable sequence of rows.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Rows {
    rows: Vec<Row>,
    #[serde(skip)]
    pos: Cell<usize>,
}

impl Rows {
    /// Wrap an already materialized row list.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            pos: Cell::new(0),
        }
    }

    /// Total number of rows.
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Bounds-checked positional access.
    pub fn get_row(&self, idx: usize) -> Option<&Row> {
        self.rows.get(idx)
    }

    // ==================== Cursor ====================

    /// Move the cursor to `idx`; returns whether the position is valid.
    pub fn seek(&self, idx: usize) -> bool {
        if idx < self.rows.len() {
            self.pos.set(idx);
            true
        } else {
            false
        }
    }

    /// Reset the cursor to the first row.
    pub fn rewind(&self) {
        self.pos.set(0);
    }

    /// Advance the cursor; returns whether it still points at a row.
    pub fn next_row(&self) -> bool {
        self.seek(self.pos.get() + 1)
    }

    /// Step the cursor back; returns whether that was possible.
    pub fn prev_row(&self) -> bool {
        let pos = self.pos.get();
        pos > 0 && self.seek(pos - 1)
    }

    /// The row under the cursor, if any.
    pub fn current(&self) -> Option<&Row> {
        self.rows.get(self.pos.get())
    }

    /// Read a field off the current row without advancing.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.current()?.get(column)
    }

    /// Read a field off the current row, falling back to `default`.
    pub fn get_or(&self, column: &str, default: impl Into<Value>) -> Value {
        match self.get(column) {
            Some(value) => value.clone(),
            None => default.into(),
        }
    }

    // ==================== Export ====================

    /// All rows as a vector. Rewinds the cursor.
    pub fn to_vec(&self) -> Vec<Row> {
        self.rewind();
        self.rows.clone()
    }

    /// One column from every row. Rewinds the cursor.
    pub fn column(&self, column: &str) -> Vec<Value> {
        self.rewind();
        self.rows
            .iter()
            .map(|row| row.get(column).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Full rows keyed by a column. Rewinds the cursor.
    pub fn keyed_by(&self, key: &str) -> HashMap<String, Row> {
        self.rewind();
        self.rows
            .iter()
            .map(|row| {
                let k = row.get(key).map(Value::key_string).unwrap_or_default();
                (k, row.clone())
            })
            .collect()
    }

    /// One column keyed by another column. Rewinds the cursor.
    pub fn pairs(&self, key: &str, value: &str) -> HashMap<String, Value> {
        self.rewind();
        self.rows
            .iter()
            .map(|row| {
                let k = row.get(key).map(Value::key_string).unwrap_or_default();
                let v = row.get(value).cloned().unwrap_or(Value::Null);
                (k, v)
            })
            .collect()
    }

    /// Snapshot into an independent, fully in-memory copy with a fresh
    /// cursor, suitable for storage or re-iteration.
    pub fn cached(&self) -> Rows {
        Rows::from_rows(self.rows.clone())
    }

    /// Map every row through [`FromRow`].
    pub fn hydrate<T: FromRow>(&self) -> crate::error::DbResult<Vec<T>> {
        self.rows.iter().map(T::from_row).collect()
    }
}

impl Index<usize> for Rows {
    type Output = Row;

    fn index(&self, idx: usize) -> &Row {
        &self.rows[idx]
    }
}

impl<'a> IntoIterator for &'a Rows {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
