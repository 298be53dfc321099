//! UPDATE query builder.

use crate::builder::conditions::{Cond, Logic, compile_conditions};
use crate::builder::compile_order_by;
use crate::database::Database;
use crate::driver::QueryType;
use crate::error::{DbError, DbResult};
use crate::params::{ParamKey, Params};
use crate::query::Query;
use crate::value::{Field, Value};

/// Fluent UPDATE builder: `UPDATE table SET .. [WHERE ..] [ORDER BY ..]
/// [LIMIT n]`.
#[derive(Clone, Debug)]
pub struct Update {
    table: Field,
    sets: Vec<(Field, Value)>,
    wheres: Vec<Cond>,
    order_by: Vec<(Field, Option<String>)>,
    limit: Option<u64>,
    params: Params,
}

impl Update {
    /// Create a builder targeting `table`.
    pub fn new(table: impl Into<Field>) -> Self {
        Self {
            table: table.into(),
            sets: Vec::new(),
            wheres: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            params: Params::new(),
        }
    }

    /// Append one `SET column = value` pair.
    pub fn set(mut self, column: impl Into<Field>, value: impl Into<Value>) -> Self {
        self.sets.push((column.into(), value.into()));
        self
    }

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

    /// Append an ORDER BY column without a direction.
    pub fn order_by(mut self, column: impl Into<Field>) -> Self {
        self.order_by.push((column.into(), None));
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

    /// Bind one parameter: a 1-based position or a `:name` key.
    pub fn param(mut self, key: impl Into<ParamKey>, value: impl Into<Value>) -> Self {
        self.params.set(key, value);
        self
    }

    /// Compile into SQL text.
    pub fn compile(&self, db: &Database) -> DbResult<String> {
        if self.sets.is_empty() {
            return Err(DbError::builder("UPDATE requires at least one set() pair"));
        }

        let mut sql = String::from("UPDATE ");
        sql.push_str(&db.quote_table(&self.table)?);

        let mut pairs = Vec::with_capacity(self.sets.len());
        for (column, value) in &self.sets {
            let value_sql = if let Value::Str(s) = value
                && self.params.has_name(s)
            {
                s.clone()
            } else {
                db.quote(value)?
            };
            pairs.push(format!("{} = {}", db.quote_column(column)?, value_sql));
        }
        sql.push_str(" SET ");
        sql.push_str(&pairs.join(", "));

        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&compile_conditions(db, &self.params, &self.wheres)?);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&compile_order_by(db, &self.order_by)?);
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ");
            sql.push_str(&limit.to_string());
        }

        Ok(sql)
    }

    /// Compile and execute, returning the affected row count.
    pub fn execute(&self, db: &Database) -> DbResult<u64> {
        let sql = self.compile(db)?;
        let query = Query::assemble(QueryType::Update, sql, self.params.clone(), None, false);
        Ok(query.execute(db)?.affected())
    }

    /// Restore construction defaults for reuse; the target table stays.
    pub fn reset(&mut self) {
        self.sets.clear();
        self.wheres.clear();
        self.order_by.clear();
        self.limit = None;
        self.params.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::mysql_db;

    #[test]
    fn set_where_limit() {
        let db = mysql_db("upd_basic", "");
        let sql = Update::new("users")
            .set("status", "inactive")
            .and_where("last_login", "<", Value::Null)
            .limit(100)
            .compile(&db)
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE `users` SET `status` = 'inactive' WHERE `last_login` < NULL LIMIT 100"
        );
    }

    #[test]
    fn null_equality_rewrites() {
        let db = mysql_db("upd_null", "");
        let sql = Update::new("users")
            .set("flag", Value::Null)
            .and_where("flag", "=", Value::Null)
            .compile(&db)
            .unwrap();
        assert_eq!(sql, "UPDATE `users` SET `flag` = NULL WHERE `flag` IS NULL");
    }

    #[test]
    fn empty_set_is_builder_error() {
        let db = mysql_db("upd_empty", "");
        assert!(matches!(
            Update::new("users").compile(&db),
            Err(DbError::Builder(_))
        ));
    }

    #[test]
    fn named_parameter_in_set_stays_raw() {
        let db = mysql_db("upd_param", "");
        let sql = Update::new("users")
            .set("name", Value::Str(":name".into()))
            .param(":name", "bob")
            .and_where("id", "=", 1i64)
            .compile(&db)
            .unwrap();
        assert_eq!(sql, "UPDATE `users` SET `name` = :name WHERE `id` = 1");
    }
}
