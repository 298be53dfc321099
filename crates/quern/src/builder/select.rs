//! SELECT query builder.

use std::collections::HashSet;
use std::time::Duration;

use crate::builder::conditions::{Cond, Logic, compile_conditions};
use crate::builder::join::{Join, JoinType};
use crate::builder::compile_order_by;
use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::params::{ParamKey, Params};
use crate::query::Query;
use crate::result::Rows;
use crate::row::FromRow;
use crate::driver::QueryType;
use crate::value::{Field, Value};

/// Fluent SELECT builder.
///
/// Clause order at compile time is fixed: `SELECT [DISTINCT] columns
/// [FROM ..] [joins] [WHERE ..] [GROUP BY ..] [HAVING ..] [ORDER BY ..]
/// [LIMIT n] [OFFSET n] [UNION ..]`.
#[derive(Clone, Debug, Default)]
pub struct Select {
    columns: Vec<Field>,
    distinct: bool,
    from: Vec<Field>,
    joins: Vec<Join>,
    wheres: Vec<Cond>,
    group_by: Vec<Field>,
    havings: Vec<Cond>,
    order_by: Vec<(Field, Option<String>)>,
    limit: Option<u64>,
    offset: Option<u64>,
    unions: Vec<(Select, bool)>,
    params: Params,
    lifetime: Option<Duration>,
    force_execute: bool,
    error: Option<String>,
}

impl Select {
    /// Create an empty builder (`SELECT *` until columns are added).
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Columns & FROM ====================

    /// Append one select column.
    pub fn column(mut self, column: impl Into<Field>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Append several select columns.
    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<Field>>) -> Self {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Toggle `DISTINCT`.
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Append a FROM table.
    pub fn from(mut self, table: impl Into<Field>) -> Self {
        self.from.push(table.into());
        self
    }

    // ==================== JOIN ====================

    /// Append a plain `JOIN`.
    pub fn join(mut self, table: impl Into<Field>) -> Self {
        self.joins.push(Join::new(table, None));
        self
    }

    /// Append an `INNER JOIN`.
    pub fn inner_join(mut self, table: impl Into<Field>) -> Self {
        self.joins.push(Join::new(table, Some(JoinType::Inner)));
        self
    }

    /// Append a `LEFT JOIN`.
    pub fn left_join(mut self, table: impl Into<Field>) -> Self {
        self.joins.push(Join::new(table, Some(JoinType::Left)));
        self
    }

    /// Append a `RIGHT JOIN`.
    pub fn right_join(mut self, table: impl Into<Field>) -> Self {
        self.joins.push(Join::new(table, Some(JoinType::Right)));
        self
    }

    /// Append a `FULL OUTER JOIN`.
    pub fn full_join(mut self, table: impl Into<Field>) -> Self {
        self.joins.push(Join::new(table, Some(JoinType::Full)));
        self
    }

    /// Add an `ON` pair to the most recent join.
    pub fn on(
        mut self,
        left: impl Into<Field>,
        op: impl Into<String>,
        right: impl Into<Field>,
    ) -> Self {
        match self.joins.last_mut() {
            Some(join) => join.on(left, op, right),
            None => self.error = Some("on() requires a preceding join".to_string()),
        }
        self
    }

    /// Add `USING` columns to the most recent join.
    pub fn using(mut self, columns: impl IntoIterator<Item = impl Into<Field>>) -> Self {
        match self.joins.last_mut() {
            Some(join) => join.using(columns),
            None => self.error = Some("using() requires a preceding join".to_string()),
        }
        self
    }

    // ==================== WHERE ====================

    /// Append an AND-joined predicate.
    pub fn and_where(
        mut self,
        column: impl Into<Field>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.wheres.push(Cond::Predicate {
            logic: Logic::And,
            column: column.into(),
            op: op.into(),
            value: value.into(),
        });
        self
    }

    /// Append an OR-joined predicate.
    pub fn or_where(
        mut self,
        column: impl Into<Field>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.wheres.push(Cond::Predicate {
            logic: Logic::Or,
            column: column.into(),
            op: op.into(),
            value: value.into(),
        });
        self
    }

    /// Open an AND-joined group.
    pub fn and_where_open(mut self) -> Self {
        self.wheres.push(Cond::Open(Logic::And));
        self
    }

    /// Close an AND-joined group.
    pub fn and_where_close(mut self) -> Self {
        self.wheres.push(Cond::Close(Logic::And));
        self
    }

    /// Open an OR-joined group.
    pub fn or_where_open(mut self) -> Self {
        self.wheres.push(Cond::Open(Logic::Or));
        self
    }

    /// Close an OR-joined group.
    pub fn or_where_close(mut self) -> Self {
        self.wheres.push(Cond::Close(Logic::Or));
        self
    }

    // ==================== GROUP BY / HAVING ====================

    /// Append GROUP BY columns.
    pub fn group_by(mut self, columns: impl IntoIterator<Item = impl Into<Field>>) -> Self {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Append an AND-joined HAVING predicate.
    pub fn and_having(
        mut self,
        column: impl Into<Field>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.havings.push(Cond::Predicate {
            logic: Logic::And,
            column: column.into(),
            op: op.into(),
            value: value.into(),
        });
        self
    }

    /// Append an OR-joined HAVING predicate.
    pub fn or_having(
        mut self,
        column: impl Into<Field>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.havings.push(Cond::Predicate {
            logic: Logic::Or,
            column: column.into(),
            op: op.into(),
            value: value.into(),
        });
        self
    }

    /// Open an AND-joined HAVING group.
    pub fn and_having_open(mut self) -> Self {
        self.havings.push(Cond::Open(Logic::And));
        self
    }

    /// Close an AND-joined HAVING group.
    pub fn and_having_close(mut self) -> Self {
        self.havings.push(Cond::Close(Logic::And));
        self
    }

    /// Open an OR-joined HAVING group.
    pub fn or_having_open(mut self) -> Self {
        self.havings.push(Cond::Open(Logic::Or));
        self
    }

    /// Close an OR-joined HAVING group.
    pub fn or_having_close(mut self) -> Self {
        self.havings.push(Cond::Close(Logic::Or));
        self
    }

    // ==================== Ordering & slicing ====================

    /// Append an ORDER BY column without a direction.
    pub fn order_by(mut self, column: impl Into<Field>) -> Self {
        self.order_by.push((column.into(), None));
        self
    }

    /// Append `ORDER BY column ASC`.
    pub fn order_by_asc(mut self, column: impl Into<Field>) -> Self {
        self.order_by.push((column.into(), Some("ASC".to_string())));
        self
    }

    /// Append `ORDER BY column DESC`.
    pub fn order_by_desc(mut self, column: impl Into<Field>) -> Self {
        self.order_by.push((column.into(), Some("DESC".to_string())));
        self
    }

    /// Set LIMIT.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set OFFSET.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    // ==================== UNION ====================

    /// Append `UNION <select>`.
    pub fn union(mut self, select: Select) -> Self {
        self.unions.push((select, false));
        self
    }

    /// Append `UNION ALL <select>`.
    pub fn union_all(mut self, select: Select) -> Self {
        self.unions.push((select, true));
        self
    }

    // ==================== Parameters & caching ====================

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

    /// Enable result caching for `lifetime`.
    pub fn cached(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Execute even when a cached result exists.
    pub fn force_execute(mut self) -> Self {
        self.force_execute = true;
        self
    }

    // ==================== Compile & execute ====================

    /// Compile into SQL text. Pure read of the accumulated clause state.
    pub fn compile(&self, db: &Database) -> DbResult<String> {
        if let Some(error) = &self.error {
            return Err(DbError::builder(error.clone()));
        }

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            // De-duplicate before quoting; expressions are never dropped.
            let mut seen = HashSet::new();
            let mut parts = Vec::with_capacity(self.columns.len());
            for column in &self.columns {
                if let Some(key) = column.dedup_key()
                    && !seen.insert(key)
                {
                    continue;
                }
                parts.push(db.quote_column(column)?);
            }
            sql.push_str(&parts.join(", "));
        }

        if !self.from.is_empty() {
            let mut tables = Vec::with_capacity(self.from.len());
            for table in &self.from {
                tables.push(db.quote_table(table)?);
            }
            sql.push_str(" FROM ");
            sql.push_str(&tables.join(", "));
        }

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.compile(db)?);
        }

        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&compile_conditions(db, &self.params, &self.wheres)?);
        }

        if !self.group_by.is_empty() {
            let mut cols = Vec::with_capacity(self.group_by.len());
            for col in &self.group_by {
                cols.push(db.quote_column(col)?);
            }
            sql.push_str(" GROUP BY ");
            sql.push_str(&cols.join(", "));
        }

        if !self.havings.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&compile_conditions(db, &self.params, &self.havings)?);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&compile_order_by(db, &self.order_by)?);
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ");
            sql.push_str(&limit.to_string());
        }

        if let Some(offset) = self.offset {
            sql.push_str(" OFFSET ");
            sql.push_str(&offset.to_string());
        }

        for (select, all) in &self.unions {
            sql.push_str(" UNION ");
            if *all {
                sql.push_str("ALL ");
            }
            sql.push_str(&select.compile(db)?);
        }

        Ok(sql)
    }

    /// Compile and execute, returning the materialized result set.
    pub fn execute(&self, db: &Database) -> DbResult<Rows> {
        let sql = self.compile(db)?;
        let query = Query::assemble(
            QueryType::Select,
            sql.clone(),
            self.params.clone(),
            self.lifetime,
            self.force_execute,
        );
        query
            .execute(db)?
            .into_rows()
            .ok_or_else(|| DbError::query("statement did not produce a result set", sql))
    }

    /// Execute and map every row through [`FromRow`].
    pub fn fetch_all<T: FromRow>(&self, db: &Database) -> DbResult<Vec<T>> {
        self.execute(db)?.hydrate()
    }

    /// Execute and map the first row, if any.
    pub fn fetch_opt<T: FromRow>(&self, db: &Database) -> DbResult<Option<T>> {
        let rows = self.execute(db)?;
        rows.get_row(0).map(T::from_row).transpose()
    }

    /// Execute and map exactly the first row.
    pub fn fetch_one<T: FromRow>(&self, db: &Database) -> DbResult<T> {
        self.fetch_opt(db)?
            .ok_or_else(|| DbError::not_found("query returned no rows"))
    }

    /// Restore construction defaults, clearing every clause and the bound
    /// parameter map, so the instance can be reused.
    pub fn reset(&mut self) {
        *self = Select::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::expr;
    use crate::test_util::mysql_db;

    #[test]
    fn bare_select() {
        let db = mysql_db("sel_bare", "");
        assert_eq!(Select::new().compile(&db).unwrap(), "SELECT *");
    }

    #[test]
    fn full_clause_order() {
        let db = mysql_db("sel_order", "");
        let sql = Select::new()
            .column("id")
            .column("name")
            .from("users")
            .left_join("orders")
            .on("users.id", "=", "orders.user_id")
            .and_where("status", "=", "active")
            .group_by(["name"])
            .and_having(expr("COUNT(id)"), ">", 1i64)
            .order_by_desc("name")
            .limit(10)
            .offset(5)
            .compile(&db)
            .unwrap();
        assert_eq!(
            sql,
            "SELECT `id`, `name` FROM `users` \
             LEFT JOIN `orders` ON (`users`.`id` = `orders`.`user_id`) \
             WHERE `status` = 'active' GROUP BY `name` \
             HAVING COUNT(id) > 1 ORDER BY `name` DESC LIMIT 10 OFFSET 5"
        );
    }

    #[test]
    fn distinct_only_when_enabled() {
        let db = mysql_db("sel_distinct", "");
        let sql = Select::new().distinct(true).column("a").from("t").compile(&db).unwrap();
        assert_eq!(sql, "SELECT DISTINCT `a` FROM `t`");
        let sql = Select::new().column("a").from("t").compile(&db).unwrap();
        assert_eq!(sql, "SELECT `a` FROM `t`");
    }

    #[test]
    fn duplicate_columns_collapse() {
        let db = mysql_db("sel_dedup", "");
        let sql = Select::new()
            .columns(["a", "b", "a"])
            .from("t")
            .compile(&db)
            .unwrap();
        assert_eq!(sql, "SELECT `a`, `b` FROM `t`");
    }

    #[test]
    fn union_and_union_all() {
        let db = mysql_db("sel_union", "");
        let sql = Select::new()
            .from("a")
            .union(Select::new().from("b"))
            .union_all(Select::new().from("c"))
            .compile(&db)
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `a` UNION SELECT * FROM `b` UNION ALL SELECT * FROM `c`"
        );
    }

    #[test]
    fn subquery_in_from() {
        let db = mysql_db("sel_sub", "");
        let inner = Select::new().from("users");
        let sql = Select::new().column("id").from(inner).compile(&db).unwrap();
        assert_eq!(sql, "SELECT `id` FROM (SELECT * FROM `users`)");
    }

    #[test]
    fn on_without_join_is_builder_error() {
        let db = mysql_db("sel_on_err", "");
        let result = Select::new().from("t").on("a", "=", "b").compile(&db);
        assert!(matches!(result, Err(DbError::Builder(_))));
    }

    #[test]
    fn reset_restores_defaults() {
        let db = mysql_db("sel_reset", "");

        let build = |mut q: Select| {
            q = q
                .column("id")
                .from("users")
                .and_where("id", "=", Value::Str("?".into()))
                .param(1usize, 5i64)
                .limit(1);
            q
        };

        let mut q = build(Select::new());
        let first = q.compile(&db).unwrap();

        q.reset();
        assert_eq!(q.compile(&db).unwrap(), "SELECT *");
        assert!(q.params.is_empty());

        let q = build(q);
        let second = q.compile(&db).unwrap();
        assert_eq!(first, second);
    }
}
