//! MySQL driver over the `mysql` client.
//!
//! Named placeholders are rewritten textually, every `:name` becoming `?`,
//! and a positional, type-tagged bind list is assembled in placeholder
//! order. Rows are materialized eagerly, column by column, from the
//! captured column metadata.

use std::sync::{Arc, Mutex};

use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder};

use crate::cache::QueryCache;
use crate::config::{Config, ConnectionConfig, DriverKind};
use crate::error::{DbError, DbResult};
use crate::params::Params;
use crate::result::Rows;
use crate::row::Row;
use crate::value::Value;

use super::{Driver, Outcome, QueryType, exec_error, profile_category, with_profile};

/// MySQLi-style driver: one lazily opened `mysql::Conn` per instance.
pub struct MysqlDriver {
    name: String,
    config: Config,
    conn: Mutex<Option<Conn>>,
    last_query: Mutex<Option<String>>,
}

impl MysqlDriver {
    /// Create an unconnected driver. Fails when the connection sub-mapping
    /// does not describe a MySQL endpoint.
    pub fn new(name: impl Into<String>, config: Config) -> DbResult<Self> {
        if !matches!(config.connection, ConnectionConfig::Mysql(_)) {
            return Err(DbError::configuration(
                "mysql driver requires a mysql connection configuration",
            ));
        }
        Ok(Self {
            name: name.into(),
            config,
            conn: Mutex::new(None),
            last_query: Mutex::new(None),
        })
    }
}

impl Driver for MysqlDriver {
    fn instance_name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DriverKind {
        DriverKind::Mysql
    }

    fn quote_char(&self) -> &'static str {
        "`"
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

        let ConnectionConfig::Mysql(ref settings) = self.config.connection else {
            return Err(DbError::configuration(
                "mysql driver requires a mysql connection configuration",
            ));
        };

        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(settings.hostname.clone()))
            .tcp_port(settings.port)
            .user(Some(settings.username.clone()))
            .pass(settings.password.clone())
            .db_name(Some(settings.database.clone()));

        let mut conn = Conn::new(opts).map_err(|e| DbError::connection(e.to_string()))?;
        tracing::debug!(instance = %self.name, host = %settings.hostname, "mysql connected");

        if let Some(charset) = &self.config.charset {
            set_names(&mut conn, charset)?;
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
        let mut guard = self.conn.lock().unwrap();
        let conn = guard
            .as_mut()
            .ok_or_else(|| DbError::connection("connection handle was released"))?;
        set_names(conn, charset)
    }

    fn escape(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for ch in value.chars() {
            match ch {
                '\0' => out.push_str("\\0"),
                '\'' => out.push_str("\\'"),
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\u{1a}' => out.push_str("\\Z"),
                _ => out.push(ch),
            }
        }
        out.push('\'');
        out
    }

    fn begin(&self, mode: Option<&str>) -> DbResult<()> {
        self.connect()?;
        let mut guard = self.conn.lock().unwrap();
        let conn = guard
            .as_mut()
            .ok_or_else(|| DbError::connection("connection handle was released"))?;
        if let Some(mode) = mode {
            let sql = format!("SET TRANSACTION ISOLATION LEVEL {mode}");
            conn.query_drop(&sql).map_err(|e| exec_error(e, &sql))?;
        }
        conn.query_drop("START TRANSACTION")
            .map_err(|e| exec_error(e, "START TRANSACTION"))
    }

    fn commit(&self) -> DbResult<()> {
        self.connect()?;
        let mut guard = self.conn.lock().unwrap();
        let conn = guard
            .as_mut()
            .ok_or_else(|| DbError::connection("connection handle was released"))?;
        conn.query_drop("COMMIT").map_err(|e| exec_error(e, "COMMIT"))
    }

    fn rollback(&self) -> DbResult<()> {
        self.connect()?;
        let mut guard = self.conn.lock().unwrap();
        let conn = guard
            .as_mut()
            .ok_or_else(|| DbError::connection("connection handle was released"))?;
        conn.query_drop("ROLLBACK")
            .map_err(|e| exec_error(e, "ROLLBACK"))
    }

    fn exec(&self, kind: QueryType, sql: &str, params: &Params) -> DbResult<Outcome> {
        self.connect()?;
        *self.last_query.lock().unwrap() = Some(sql.to_string());

        let (exec_sql, bound) = rewrite_placeholders(sql, params)?;
        tracing::debug!(instance = %self.name, sql = %exec_sql, params = bound.len(), "mysql exec");

        let mut guard = self.conn.lock().unwrap();
        let conn = guard
            .as_mut()
            .ok_or_else(|| DbError::connection("connection handle was released"))?;
        let category = profile_category(&self.name);

        with_profile(self.config.profiler.as_ref(), &category, sql, || {
            match kind {
                QueryType::Select => {
                    let native: Vec<mysql::Row> = if bound.is_empty() {
                        conn.query(&exec_sql).map_err(|e| exec_error(e, sql))?
                    } else {
                        conn.exec(exec_sql.as_str(), mysql::Params::Positional(bound.clone()))
                            .map_err(|e| exec_error(e, sql))?
                    };
                    Ok(Outcome::Rows(materialize(native)))
                }
                QueryType::Insert => {
                    run_drop(conn, &exec_sql, &bound, sql)?;
                    Ok(Outcome::Inserted {
                        last_insert_id: conn.last_insert_id() as i64,
                        affected: conn.affected_rows(),
                    })
                }
                _ => {
                    run_drop(conn, &exec_sql, &bound, sql)?;
                    Ok(Outcome::Affected(conn.affected_rows()))
                }
            }
        })
    }

    fn last_query(&self) -> Option<String> {
        self.last_query.lock().unwrap().clone()
    }
}

fn set_names(conn: &mut Conn, charset: &str) -> DbResult<()> {
    let safe: String = charset
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let sql = format!("SET NAMES {safe}");
    conn.query_drop(&sql).map_err(|e| exec_error(e, &sql))
}

fn run_drop(conn: &mut Conn, exec_sql: &str, bound: &[mysql::Value], sql: &str) -> DbResult<()> {
    if bound.is_empty() {
        conn.query_drop(exec_sql).map_err(|e| exec_error(e, sql))
    } else {
        conn.exec_drop(exec_sql, mysql::Params::Positional(bound.to_vec()))
            .map_err(|e| exec_error(e, sql))
    }
}

/// Materialize native rows eagerly, sharing one column header.
fn materialize(native: Vec<mysql::Row>) -> Rows {
    let Some(first) = native.first() else {
        return Rows::default();
    };
    let columns: Arc<[String]> = first
        .columns_ref()
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect::<Vec<_>>()
        .into();

    let rows = native
        .into_iter()
        .map(|row| {
            let values = row.unwrap().into_iter().map(from_native).collect();
            Row::new(columns.clone(), values)
        })
        .collect();
    Rows::from_rows(rows)
}

fn from_native(value: mysql::Value) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Str(text),
            Err(err) => Value::Bytes(err.into_bytes()),
        },
        mysql::Value::Int(n) => Value::Int(n),
        mysql::Value::UInt(n) => Value::Int(n as i64),
        mysql::Value::Float(f) => Value::Float(f as f64),
        mysql::Value::Double(f) => Value::Float(f),
        mysql::Value::Date(y, mo, d, 0, 0, 0, 0) => Value::Str(format!("{y:04}-{mo:02}-{d:02}")),
        mysql::Value::Date(y, mo, d, h, mi, s, _) => {
            Value::Str(format!("{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02}"))
        }
        mysql::Value::Time(neg, days, h, mi, s, _) => {
            let hours = u32::from(h) + days * 24;
            let sign = if neg { "-" } else { "" };
            Value::Str(format!("{sign}{hours:02}:{mi:02}:{s:02}"))
        }
    }
}

fn to_native(value: &Value) -> DbResult<mysql::Value> {
    match value {
        Value::Null => Ok(mysql::Value::NULL),
        Value::Bool(b) => Ok(mysql::Value::Int(i64::from(*b))),
        Value::Int(n) => Ok(mysql::Value::Int(*n)),
        Value::Float(f) => Ok(mysql::Value::Double(*f)),
        Value::Str(s) => Ok(mysql::Value::Bytes(s.clone().into_bytes())),
        Value::Bytes(b) => Ok(mysql::Value::Bytes(b.clone())),
        other => Err(DbError::parameter(format!(
            "value cannot be bound as a statement parameter: {other:?}"
        ))),
    }
}

/// Rewrite `:name` placeholders to `?` and build the positional bind list
/// in placeholder order. Quoted literals and quoted identifiers are left
/// untouched.
pub(crate) fn rewrite_placeholders(
    sql: &str,
    params: &Params,
) -> DbResult<(String, Vec<mysql::Value>)> {
    let mut out = String::with_capacity(sql.len());
    let mut bound = Vec::new();
    let mut position = 0usize;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' | '`' => {
                out.push(ch);
                copy_quoted(&mut chars, &mut out, ch);
            }
            '?' => {
                position += 1;
                let value = params.get_position(position).ok_or_else(|| {
                    DbError::parameter(format!("no value bound for positional parameter {position}"))
                })?;
                bound.push(to_native(value)?);
                out.push('?');
            }
            ':' if chars
                .peek()
                .is_some_and(|c| c.is_ascii_alphabetic() || *c == '_') =>
            {
                let mut name = String::from(":");
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = params
                    .get_name(&name)
                    .ok_or_else(|| DbError::parameter(format!("no value bound for {name}")))?;
                bound.push(to_native(value)?);
                out.push('?');
            }
            _ => out.push(ch),
        }
    }

    Ok((out, bound))
}

/// Copy a quoted span verbatim, honoring backslash escapes and doubled
/// quote characters.
fn copy_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String, quote: char) {
    while let Some(ch) = chars.next() {
        out.push(ch);
        if ch == '\\' && quote != '`' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else if ch == quote {
            if chars.peek() == Some(&quote) {
                out.push(quote);
                chars.next();
            } else {
                break;
            }
        }
    }
}
