//! SQLite driver over `rusqlite`.
//!
//! The PDO-style binding model: named parameters are bound directly through
//! the statement's parameter index, positional ones by their 1-based slot.
//! Rows are fetched through the native cursor and materialized before the
//! statement is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use rusqlite::types::ValueRef;

use crate::cache::QueryCache;
use crate::config::{Config, ConnectionConfig, DriverKind};
use crate::error::{DbError, DbResult};
use crate::params::Params;
use crate::result::Rows;
use crate::row::Row;
use crate::value::Value;

use super::{Driver, Outcome, QueryType, exec_error, profile_category, with_profile};

/// PDO-style driver over the embedded SQLite engine.
pub struct SqliteDriver {
    name: String,
    config: Config,
    conn: Mutex<Option<Connection>>,
    last_query: Mutex<Option<String>>,
}

impl SqliteDriver {
    /// Create an unconnected driver. Fails when the connection sub-mapping
    /// does not describe a SQLite database.
    pub fn new(name: impl Into<String>, config: Config) -> DbResult<Self> {
        if !matches!(config.connection, ConnectionConfig::Sqlite(_)) {
            return Err(DbError::configuration(
                "sqlite driver requires a sqlite connection configuration",
            ));
        }
        Ok(Self {
            name: name.into(),
            config,
            conn: Mutex::new(None),
            last_query: Mutex::new(None),
        })
    }

    fn batch(&self, sql: &str) -> DbResult<()> {
        self.connect()?;
        let guard = self.conn.lock().unwrap();
        let conn = guard
            .as_ref()
            .ok_or_else(|| DbError::connection("connection handle was released"))?;
        conn.execute_batch(sql).map_err(|e| exec_error(e, sql))
    }
}

impl Driver for SqliteDriver {
    fn instance_name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DriverKind {
        DriverKind::Sqlite
    }

    fn quote_char(&self) -> &'static str {
        "\""
    }

    fn table_prefix(&self) -> &str {
        &self.config.table_prefix
    }

    fn cache(&self) -> Option<Arc<dyn QueryCache>> {
        self.config.cache.clone()
    }

    fn connect(&self) -> DbResult<()> {
        let mut guard = self.conn.lock().unwrap();
        if guard.is_some() {
            return Ok(());
        }

        let ConnectionConfig::Sqlite(ref settings) = self.config.connection else {
            return Err(DbError::configuration(
                "sqlite driver requires a sqlite connection configuration",
            ));
        };

        let conn =
            Connection::open(&settings.path).map_err(|e| DbError::connection(e.to_string()))?;
        tracing::debug!(instance = %self.name, path = %settings.path, "sqlite connected");

        if let Some(charset) = &self.config.charset {
            apply_encoding(&conn, charset)?;
        }

        *guard = Some(conn);
        Ok(())
    }

    fn connected(&self) -> bool {
        self.conn.lock().unwrap().is_some()
    }

    fn disconnect(&self) -> bool {
        *self.conn.lock().unwrap() = None;
        true
    }

    fn set_charset(&self, charset: &str) -> DbResult<()> {
        self.connect()?;
        let guard = self.conn.lock().unwrap();
        let conn = guard
            .as_ref()
            .ok_or_else(|| DbError::connection("connection handle was released"))?;
        apply_encoding(conn, charset)
    }

    fn escape(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for ch in value.chars() {
            if ch == '\'' {
                out.push_str("''");
            } else {
                out.push(ch);
            }
        }
        out.push('\'');
        out
    }

    fn begin(&self, mode: Option<&str>) -> DbResult<()> {
        match mode {
            Some(mode) => self.batch(&format!("BEGIN {mode}")),
            None => self.batch("BEGIN"),
        }
    }

    fn commit(&self) -> DbResult<()> {
        self.batch("COMMIT")
    }

    fn rollback(&self) -> DbResult<()> {
        self.batch("ROLLBACK")
    }

    fn exec(&self, kind: QueryType, sql: &str, params: &Params) -> DbResult<Outcome> {
        self.connect()?;
        *self.last_query.lock().unwrap() = Some(sql.to_string());
        tracing::debug!(instance = %self.name, sql = %sql, params = params.len(), "sqlite exec");

        let guard = self.conn.lock().unwrap();
        let conn = guard
            .as_ref()
            .ok_or_else(|| DbError::connection("connection handle was released"))?;
        let category = profile_category(&self.name);

        with_profile(self.config.profiler.as_ref(), &category, sql, || {
            let mut stmt = conn.prepare(sql).map_err(|e| exec_error(e, sql))?;

            let slots = positional_slots(sql);
            for (position, value) in params.positional() {
                let slot = *position
                    .checked_sub(1)
                    .and_then(|idx| slots.get(idx))
                    .ok_or_else(|| {
                        DbError::parameter(format!(
                            "statement has no positional placeholder {position}"
                        ))
                    })?;
                stmt.raw_bind_parameter(slot, to_native(value)?)
                    .map_err(|e| exec_error(e, sql))?;
            }
            for (name, value) in params.named() {
                let slot = stmt
                    .parameter_index(name)
                    .map_err(|e| exec_error(e, sql))?
                    .ok_or_else(|| {
                        DbError::parameter(format!("statement has no parameter {name}"))
                    })?;
                stmt.raw_bind_parameter(slot, to_native(value)?)
                    .map_err(|e| exec_error(e, sql))?;
            }

            match kind {
                QueryType::Select => {
                    let columns: Arc<[String]> = stmt
                        .column_names()
                        .iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                        .into();
                    let width = columns.len();

                    let mut out = Vec::new();
                    let mut rows = stmt.raw_query();
                    while let Some(native) = rows.next().map_err(|e| exec_error(e, sql))? {
                        let mut values = Vec::with_capacity(width);
                        for idx in 0..width {
                            let cell = native.get_ref(idx).map_err(|e| exec_error(e, sql))?;
                            values.push(from_native(cell));
                        }
                        out.push(Row::new(columns.clone(), values));
                    }
                    Ok(Outcome::Rows(Rows::from_rows(out)))
                }
                QueryType::Insert => {
                    let affected = stmt.raw_execute().map_err(|e| exec_error(e, sql))? as u64;
                    Ok(Outcome::Inserted {
                        last_insert_id: conn.last_insert_rowid(),
                        affected,
                    })
                }
                _ => {
                    let affected = stmt.raw_execute().map_err(|e| exec_error(e, sql))? as u64;
                    Ok(Outcome::Affected(affected))
                }
            }
        })
    }

    fn last_query(&self) -> Option<String> {
        self.last_query.lock().unwrap().clone()
    }
}

fn apply_encoding(conn: &Connection, charset: &str) -> DbResult<()> {
    let safe: String = charset
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let sql = format!("PRAGMA encoding = '{safe}'");
    conn.execute_batch(&sql).map_err(|e| exec_error(e, &sql))
}

fn from_native(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Int(n),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Str(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

fn to_native(value: &Value) -> DbResult<rusqlite::types::Value> {
    use rusqlite::types::Value as Native;
    match value {
        Value::Null => Ok(Native::Null),
        Value::Bool(b) => Ok(Native::Integer(i64::from(*b))),
        Value::Int(n) => Ok(Native::Integer(*n)),
        Value::Float(f) => Ok(Native::Real(*f)),
        Value::Str(s) => Ok(Native::Text(s.clone())),
        Value::Bytes(b) => Ok(Native::Blob(b.clone())),
        other => Err(DbError::parameter(format!(
            "value cannot be bound as a statement parameter: {other:?}"
        ))),
    }
}

/// SQLite assigns one ordinal index to every distinct parameter token in
/// order of appearance. Returns, for the n-th `?`, its assigned index, so
/// 1-based positional keys land on the right slot even when named
/// parameters are mixed in.
pub(crate) fn positional_slots(sql: &str) -> Vec<usize> {
    let mut slots = Vec::new();
    let mut next_index = 0usize;
    let mut named: HashMap<String, usize> = HashMap::new();
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' | '`' => skip_quoted(&mut chars, ch),
            '[' => skip_quoted(&mut chars, ']'),
            '?' => {
                let mut digits = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if digits.is_empty() {
                    next_index += 1;
                    slots.push(next_index);
                } else if let Ok(explicit) = digits.parse::<usize>() {
                    // Explicit ?NNN reserves indices up to NNN.
                    next_index = next_index.max(explicit);
                }
            }
            ':' | '@' | '$'
                if chars
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_') =>
            {
                let mut name = String::from(ch);
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if !named.contains_key(&name) {
                    next_index += 1;
                    named.insert(name, next_index);
                }
            }
            _ => {}
        }
    }

    slots
}

/// Skip a quoted span; SQLite escapes a quote by doubling it.
fn skip_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, close: char) {
    while let Some(ch) = chars.next() {
        if ch == close {
            if chars.peek() == Some(&close) {
                chars.next();
            } else {
                break;
            }
        }
    }
}
