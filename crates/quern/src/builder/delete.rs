//! DELETE query builder.

use crate::builder::conditions::{Cond, Logic, compile_conditions};
use crate::builder::compile_order_by;
use crate::database::Database;
use crate::driver::QueryType;
use crate::error::DbResult;
use crate::params::{ParamKey, Params};
use crate::query::Query;
use crate::value::{Field, Value};

/// Fluent DELETE builder: `DELETE FROM table [WHERE ..] [ORDER BY ..]
/// [LIMIT n]`.
#[derive(Clone, Debug)]
pub struct Delete {
    table: Field,
    wheres: Vec<Cond>,
    order_by: Vec<(Field, Option<String>)>,
    limit: Option<u64>,
    params: Params,
}

impl Delete {
    /// Create a builder targeting `table`.
    pub fn new(table: impl Into<Field>) -> Self {
        Self {
            table: table.into(),
            wheres: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            params: Params::new(),
        }
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
        let mut sql = String::from("DELETE FROM ");
        sql.push_str(&db.quote_table(&self.table)?);

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
        let query = Query::assemble(QueryType::Delete, sql, self.params.clone(), None, false);
        Ok(query.execute(db)?.affected())
    }

    /// Restore construction defaults for reuse; the target table stays.
    pub fn reset(&mut self) {
        self.wheres.clear();
        self.order_by.clear();
        self.limit = None;
        self.params.clear();
    }
}
