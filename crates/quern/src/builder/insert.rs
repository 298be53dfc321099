//! INSERT query builder.

use crate::builder::select::Select;
use crate::database::Database;
use crate::driver::QueryType;
use crate::error::{DbError, DbResult};
use crate::params::{ParamKey, Params};
use crate::query::Query;
use crate::value::{Field, Value};

/// Row source: literal value tuples or a nested SELECT, never both.
#[derive(Clone, Debug, Default)]
enum Source {
    #[default]
    Empty,
    Values(Vec<Vec<Value>>),
    Select(Box<Select>),
}

/// Fluent INSERT builder.
#[derive(Clone, Debug)]
pub struct Insert {
    table: Field,
    columns: Vec<Field>,
    source: Source,
    params: Params,
    error: Option<String>,
}

impl Insert {
    /// Create a builder targeting `table`.
    pub fn new(table: impl Into<Field>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            source: Source::Empty,
            params: Params::new(),
            error: None,
        }
    }

    /// Set the column list.
    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<Field>>) -> Self {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Append one tuple of values. Mutually exclusive with
    /// [`Insert::select`].
    pub fn values(mut self, row: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        match &mut self.source {
            Source::Select(_) => {
                self.error = Some(
                    "INSERT INTO ... SELECT statements cannot be combined with \
                     INSERT INTO ... VALUES"
                        .to_string(),
                );
            }
            Source::Empty => {
                self.source = Source::Values(vec![row.into_iter().map(Into::into).collect()]);
            }
            Source::Values(rows) => {
                rows.push(row.into_iter().map(Into::into).collect());
            }
        }
        self
    }

    /// Use a nested SELECT as the row source. Mutually exclusive with
    /// [`Insert::values`].
    pub fn select(mut self, select: Select) -> Self {
        match self.source {
            Source::Values(_) => {
                self.error = Some(
                    "INSERT INTO ... VALUES statements cannot be combined with \
                     INSERT INTO ... SELECT"
                        .to_string(),
                );
            }
            _ => self.source = Source::Select(Box::new(select)),
        }
        self
    }

    /// Bind one parameter: a 1-based position or a `:name` key.
    pub fn param(mut self, key: impl Into<ParamKey>, value: impl Into<Value>) -> Self {
        self.params.set(key, value);
        self
    }

    /// Compile into SQL text.
    pub fn compile(&self, db: &Database) -> DbResult<String> {
        if let Some(error) = &self.error {
            return Err(DbError::builder(error.clone()));
        }

        let mut sql = String::from("INSERT INTO ");
        sql.push_str(&db.quote_table(&self.table)?);

        if !self.columns.is_empty() {
            let mut cols = Vec::with_capacity(self.columns.len());
            for col in &self.columns {
                cols.push(db.quote_column(col)?);
            }
            sql.push_str(" (");
            sql.push_str(&cols.join(", "));
            sql.push(')');
        }

        match &self.source {
            Source::Empty => {
                return Err(DbError::builder(
                    "INSERT requires values() or a select() source",
                ));
            }
            Source::Values(rows) => {
                let mut tuples = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut parts = Vec::with_capacity(row.len());
                    for value in row {
                        // Declared parameter keys stay raw; everything else
                        // is quoted inline.
                        if let Value::Str(s) = value
                            && self.params.has_name(s)
                        {
                            parts.push(s.clone());
                        } else {
                            parts.push(db.quote(value)?);
                        }
                    }
                    tuples.push(format!("({})", parts.join(", ")));
                }
                sql.push_str(" VALUES ");
                sql.push_str(&tuples.join(", "));
            }
            Source::Select(select) => {
                sql.push(' ');
                sql.push_str(&select.compile(db)?);
            }
        }

        Ok(sql)
    }

    /// Compile and execute, returning `(last_insert_id, affected_rows)`.
    pub fn execute(&self, db: &Database) -> DbResult<(i64, u64)> {
        let sql = self.compile(db)?;
        let query = Query::assemble(QueryType::Insert, sql.clone(), self.params.clone(), None, false);
        query
            .execute(db)?
            .inserted()
            .ok_or_else(|| DbError::query("statement did not report an insert id", sql))
    }

    /// Restore construction defaults for reuse; the target table stays.
    pub fn reset(&mut self) {
        self.columns.clear();
        self.source = Source::Empty;
        self.params.clear();
        self.error = None;
    }
}
