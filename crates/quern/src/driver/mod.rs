//! Driver abstraction: engine-specific connection lifecycle, execution,
//! and escaping.
//!
//! A [`Driver`] owns at most one live native handle, created lazily and
//! guarded by a mutex so a shared instance serializes access. Every native
//! error is normalized at this boundary: connect failures become
//! [`DbError::Connection`], execution failures [`DbError::Query`] carrying
//! the offending SQL. Drivers materialize result rows before returning, so
//! native statement resources never outlive [`Driver::exec`].

mod mysql;
mod sqlite;

pub use mysql::MysqlDriver;
pub use sqlite::SqliteDriver;

use std::sync::Arc;

use crate::cache::QueryCache;
use crate::config::DriverKind;
use crate::error::{DbError, DbResult};
use crate::params::Params;
use crate::profile::Profiler;
use crate::result::Rows;

#[cfg(test)]
mod tests;

/// The type of SQL statement being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// Other SQL (e.g., DDL)
    Other,
}

impl QueryType {
    /// Detect the statement type from SQL text. `WITH ...` defaults to
    /// SELECT; anything unrecognized is `Other`.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start();
        if starts_with_keyword(trimmed, "SELECT") || starts_with_keyword(trimmed, "WITH") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Other
        }
    }
}

fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    sql.len() >= keyword.len()
        && sql[..keyword.len()].eq_ignore_ascii_case(keyword)
        && sql[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '_')
}

/// Tagged result of one execution: the shape depends on the statement type.
#[derive(Debug)]
pub enum Outcome {
    /// SELECT: a materialized result set
    Rows(Rows),
    /// INSERT: last insert id and affected row count
    Inserted { last_insert_id: i64, affected: u64 },
    /// Everything else: affected row count
    Affected(u64),
}

impl Outcome {
    /// The result set, for SELECT outcomes.
    pub fn into_rows(self) -> Option<Rows> {
        match self {
            Outcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Borrow the result set, for SELECT outcomes.
    pub fn rows(&self) -> Option<&Rows> {
        match self {
            Outcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// `(last_insert_id, affected)`, for INSERT outcomes.
    pub fn inserted(&self) -> Option<(i64, u64)> {
        match self {
            Outcome::Inserted {
                last_insert_id,
                affected,
            } => Some((*last_insert_id, *affected)),
            _ => None,
        }
    }

    /// Affected row count; a SELECT reports its row count.
    pub fn affected(&self) -> u64 {
        match self {
            Outcome::Rows(rows) => rows.count() as u64,
            Outcome::Inserted { affected, .. } => *affected,
            Outcome::Affected(n) => *n,
        }
    }
}

/// Engine-specific driver primitives.
///
/// The public quoting helpers live on [`crate::Database`]; a driver only
/// supplies its quote character, prefix, escaping, and execution.
pub trait Driver: Send + Sync {
    /// Registry name of this instance.
    fn instance_name(&self) -> &str;

    /// Engine selector.
    fn kind(&self) -> DriverKind;

    /// Identifier quote character; empty for engines without quoting.
    fn quote_char(&self) -> &'static str;

    /// Configured table prefix.
    fn table_prefix(&self) -> &str;

    /// Result cache collaborator, if configured.
    fn cache(&self) -> Option<Arc<dyn QueryCache>>;

    /// Establish the native connection. Idempotent; called internally
    /// before any execution, transaction, or charset operation.
    fn connect(&self) -> DbResult<()>;

    /// Whether a native handle is currently held.
    fn connected(&self) -> bool;

    /// Release the native handle. Idempotent; always returns `true`.
    fn disconnect(&self) -> bool;

    /// Set the connection-level character set.
    fn set_charset(&self, charset: &str) -> DbResult<()>;

    /// Escape text into a fully quoted SQL string literal.
    fn escape(&self, value: &str) -> String;

    /// Begin a transaction, optionally with an engine-specific mode.
    fn begin(&self, mode: Option<&str>) -> DbResult<()>;

    /// Commit the current transaction.
    fn commit(&self) -> DbResult<()>;

    /// Roll back the current transaction.
    fn rollback(&self) -> DbResult<()>;

    /// Execute one statement and shape the outcome by `kind`.
    fn exec(&self, kind: QueryType, sql: &str, params: &Params) -> DbResult<Outcome>;

    /// The most recently executed SQL text.
    fn last_query(&self) -> Option<String>;
}

/// Bracket `f` in a profiling span. On failure the open token is discarded,
/// never recorded as a completed measurement.
pub(crate) fn with_profile<T>(
    profiler: Option<&Arc<dyn Profiler>>,
    category: &str,
    sql: &str,
    f: impl FnOnce() -> DbResult<T>,
) -> DbResult<T> {
    let Some(profiler) = profiler else {
        return f();
    };
    let token = profiler.start(category, sql);
    match f() {
        Ok(value) => {
            profiler.stop(token);
            Ok(value)
        }
        Err(err) => {
            profiler.discard(token);
            Err(err)
        }
    }
}

/// Profiling category for a driver instance, e.g. `database (default)`.
pub(crate) fn profile_category(instance_name: &str) -> String {
    format!("database ({instance_name})")
}

/// Normalize a native execution error.
pub(crate) fn exec_error(err: impl std::fmt::Display, sql: &str) -> DbError {
    DbError::query(err.to_string(), sql)
}
