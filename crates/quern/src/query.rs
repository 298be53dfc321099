//! The executable statement wrapper and its result cache.

use std::time::Duration;

use crate::database::Database;
use crate::driver::{Outcome, QueryType};
use crate::error::DbResult;
use crate::params::{ParamKey, Params};
use crate::result::Rows;
use crate::value::Value;

/// One executable SQL statement: type, text, bound parameters, and an
/// optional result-cache lifetime.
///
/// Only SELECT statements are ever cached; every other type bypasses the
/// cache regardless of the configured lifetime.
#[derive(Clone, Debug)]
pub struct Query {
    kind: QueryType,
    sql: String,
    params: Params,
    lifetime: Option<Duration>,
    force_execute: bool,
}

impl Query {
    /// Create a query from a statement type and raw SQL text.
    pub fn new(kind: QueryType, sql: impl Into<String>) -> Self {
        Self {
            kind,
            sql: sql.into(),
            params: Params::new(),
            lifetime: None,
            force_execute: false,
        }
    }

    /// Assemble a query from compiled builder output.
    pub(crate) fn assemble(
        kind: QueryType,
        sql: String,
        params: Params,
        lifetime: Option<Duration>,
        force_execute: bool,
    ) -> Self {
        Self {
            kind,
            sql,
            params,
            lifetime,
            force_execute,
        }
    }

    /// Statement type.
    pub fn kind(&self) -> QueryType {
        self.kind
    }

    /// SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bind one parameter: a 1-based position or a `:name` key.
    pub fn param(mut self, key: impl Into<ParamKey>, value: impl Into<Value>) -> Self {
        self.params.set(key, value);
        self
    }

    /// Bind several parameters at once.
    pub fn parameters<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<ParamKey>,
        V: Into<Value>,
    {
        for (key, value) in params {
            self.params.set(key, value);
        }
        self
    }

    /// Bound parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Enable result caching for `lifetime`. Only effective for SELECT.
    pub fn cached(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Disable result caching.
    pub fn uncached(mut self) -> Self {
        self.lifetime = None;
        self
    }

    /// Execute even when a cached result exists (the fresh result still
    /// refreshes the cache).
    pub fn force_execute(mut self) -> Self {
        self.force_execute = true;
        self
    }

    /// Execute against `db`.
    ///
    /// For a cacheable SELECT the cache collaborator is consulted first: a
    /// hit returns the materialized rows without touching the driver, and a
    /// missed execution is stored for the configured lifetime.
    pub fn execute(&self, db: &Database) -> DbResult<Outcome> {
        self.params.validate()?;

        if self.kind == QueryType::Select
            && let Some(lifetime) = self.lifetime
            && let Some(cache) = db.cache()
        {
            let key = cache_key(db.name(), &self.sql, &self.params);

            if let Some(rows) = cache.get(&key)
                && !self.force_execute
            {
                return Ok(Outcome::Rows(Rows::from_rows(rows)));
            }

            let outcome = db.query(self.kind, &self.sql, &self.params)?;
            if lifetime > Duration::ZERO
                && let Outcome::Rows(rows) = &outcome
            {
                cache.set(&key, rows.to_vec(), lifetime);
            }
            return Ok(outcome);
        }

        db.query(self.kind, &self.sql, &self.params)
    }
}

/// Create a [`Query`] from raw SQL, detecting the statement type from the
/// leading keyword.
pub fn query(sql: impl Into<String>) -> Query {
    let sql = sql.into();
    Query::new(QueryType::from_sql(&sql), sql)
}

/// Cache key over the driver instance name, the compiled SQL, and the
/// serialized parameters.
fn cache_key(instance: &str, sql: &str, params: &Params) -> String {
    format!("{instance}\u{1}{sql}\u{1}{}", params.fingerprint())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_statement_type() {
        assert_eq!(query("SELECT 1").kind(), QueryType::Select);
        assert_eq!(query("  insert into t values (1)").kind(), QueryType::Insert);
        assert_eq!(query("UPDATE t SET a = 1").kind(), QueryType::Update);
        assert_eq!(query("DELETE FROM t").kind(), QueryType::Delete);
        assert_eq!(query("CREATE TABLE t (id INTEGER)").kind(), QueryType::Other);
        assert_eq!(query("WITH x AS (SELECT 1) SELECT * FROM x").kind(), QueryType::Select);
    }

    #[test]
    fn cache_key_separates_params() {
        let a = Query::new(QueryType::Select, "SELECT * FROM t WHERE id = ?").param(1usize, 1i64);
        let b = Query::new(QueryType::Select, "SELECT * FROM t WHERE id = ?").param(1usize, 2i64);
        assert_ne!(
            cache_key("default", a.sql(), a.params()),
            cache_key("default", b.sql(), b.params())
        );
    }

    #[test]
    fn invalid_parameter_key_fails_before_execution() {
        let db = crate::test_util::mysql_db("query_param_zero", "");
        let q = Query::new(QueryType::Select, "SELECT 1").param(0usize, 1i64);
        assert!(matches!(
            q.execute(&db),
            Err(crate::error::DbError::Parameter(_))
        ));
    }
}
