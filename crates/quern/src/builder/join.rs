//! JOIN clauses.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::value::Field;

/// Join flavor. A plain `JOIN` is represented by `None` at the call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    fn as_str(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL OUTER",
        }
    }
}

/// One JOIN: a target table plus either `ON` column pairs or a `USING`
/// column list, never both.
#[derive(Clone, Debug)]
pub struct Join {
    kind: Option<JoinType>,
    table: Field,
    on: Vec<(Field, String, Field)>,
    using: Vec<Field>,
    error: Option<String>,
}

impl Join {
    /// Create a join against `table`.
    pub fn new(table: impl Into<Field>, kind: Option<JoinType>) -> Self {
        Self {
            kind,
            table: table.into(),
            on: Vec::new(),
            using: Vec::new(),
            error: None,
        }
    }

    /// Add an `ON left op right` pair. Mutually exclusive with `USING`.
    pub fn on(&mut self, left: impl Into<Field>, op: impl Into<String>, right: impl Into<Field>) {
        if !self.using.is_empty() {
            self.error = Some("JOIN ... ON cannot be combined with JOIN ... USING".to_string());
            return;
        }
        self.on.push((left.into(), op.into(), right.into()));
    }

    /// Add `USING` columns. Mutually exclusive with `ON`.
    pub fn using(&mut self, columns: impl IntoIterator<Item = impl Into<Field>>) {
        if !self.on.is_empty() {
            self.error = Some("JOIN ... USING cannot be combined with JOIN ... ON".to_string());
            return;
        }
        self.using.extend(columns.into_iter().map(Into::into));
    }

    /// Compile into SQL text.
    pub fn compile(&self, db: &Database) -> DbResult<String> {
        if let Some(error) = &self.error {
            return Err(DbError::builder(error.clone()));
        }

        let mut sql = String::new();
        if let Some(kind) = self.kind {
            sql.push_str(kind.as_str());
            sql.push(' ');
        }
        sql.push_str("JOIN ");
        sql.push_str(&db.quote_table(&self.table)?);

        if !self.using.is_empty() {
            let mut cols = Vec::with_capacity(self.using.len());
            for col in &self.using {
                cols.push(db.quote_column(col)?);
            }
            sql.push_str(" USING (");
            sql.push_str(&cols.join(", "));
            sql.push(')');
        } else {
            let mut pairs = Vec::with_capacity(self.on.len());
            for (left, op, right) in &self.on {
                pairs.push(format!(
                    "{} {} {}",
                    db.quote_column(left)?,
                    op.trim().to_uppercase(),
                    db.quote_column(right)?
                ));
            }
            sql.push_str(" ON (");
            sql.push_str(&pairs.join(" AND "));
            sql.push(')');
        }

        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::mysql_db;

    #[test]
    fn on_join() {
        let db = mysql_db("join_on", "p_");
        let mut join = Join::new("orders", Some(JoinType::Left));
        join.on("users.id", "=", "orders.user_id");
        assert_eq!(
            join.compile(&db).unwrap(),
            "LEFT JOIN `p_orders` ON (`p_users`.`id` = `p_orders`.`user_id`)"
        );
    }

    #[test]
    fn using_join() {
        let db = mysql_db("join_using", "");
        let mut join = Join::new("orders", None);
        join.using(["user_id", "tenant_id"]);
        assert_eq!(
            join.compile(&db).unwrap(),
            "JOIN `orders` USING (`user_id`, `tenant_id`)"
        );
    }

    #[test]
    fn on_and_using_conflict() {
        let db = mysql_db("join_conflict", "");
        let mut join = Join::new("orders", None);
        join.on("a", "=", "b");
        join.using(["c"]);
        assert!(matches!(join.compile(&db), Err(DbError::Builder(_))));
    }
}
