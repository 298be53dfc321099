//! Raw SQL expressions with named bind values.

use std::collections::BTreeMap;

use crate::database::Database;
use crate::error::DbResult;
use crate::value::Value;

/// An opaque, unescaped SQL fragment.
///
/// The raw text is emitted verbatim; only the declared `:name` parameters
/// are substituted, and each substituted value is quoted through the active
/// driver at compile time.
///
/// # Example
/// ```ignore
/// let total = quern::expr("COUNT(:col)").param(":col", "id");
/// ```
#[derive(Clone, Debug)]
pub struct Expression {
    sql: String,
    params: BTreeMap<String, Value>,
}

impl Expression {
    /// Create an expression from raw SQL text.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: BTreeMap::new(),
        }
    }

    /// Bind a named parameter, e.g. `":col"`.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Bind several named parameters at once.
    pub fn parameters<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in params {
            self.params.insert(name.into(), value.into());
        }
        self
    }

    /// The raw, unsubstituted SQL text.
    pub fn value(&self) -> &str {
        &self.sql
    }

    /// Compile the expression: substitute every declared parameter with its
    /// driver-quoted value.
    ///
    /// Longer names are substituted first so `:total` is never clobbered by
    /// a `:t` parameter.
    pub fn compile(&self, db: &Database) -> DbResult<String> {
        if self.params.is_empty() {
            return Ok(self.sql.clone());
        }

        let mut names: Vec<&String> = self.params.keys().collect();
        names.sort_by_key(|name| std::cmp::Reverse(name.len()));

        let mut sql = self.sql.clone();
        for name in names {
            let quoted = db.quote(&self.params[name])?;
            sql = sql.replace(name.as_str(), &quoted);
        }
        Ok(sql)
    }
}

/// Create a raw SQL [`Expression`].
pub fn expr(sql: impl Into<String>) -> Expression {
    Expression::new(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::mysql_db;

    #[test]
    fn compiles_without_params() {
        let db = mysql_db("expr_plain", "");
        let e = expr("COUNT(*)");
        assert_eq!(e.compile(&db).unwrap(), "COUNT(*)");
    }

    #[test]
    fn substitutes_quoted_params() {
        let db = mysql_db("expr_subst", "");
        let e = expr("username = :name").param(":name", "alice");
        assert_eq!(e.compile(&db).unwrap(), "username = 'alice'");
    }

    #[test]
    fn longest_name_wins() {
        let db = mysql_db("expr_longest", "");
        let e = expr(":idx + :id").param(":id", 1i64).param(":idx", 2i64);
        assert_eq!(e.compile(&db).unwrap(), "2 + 1");
    }
}
