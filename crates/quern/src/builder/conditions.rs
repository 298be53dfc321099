//! The shared condition model and its compiler (WHERE and HAVING).
//!
//! Conditions are an ordered list of tagged entries (group open, group
//! close, or a leaf predicate), each carrying the logic operator that joins
//! it to what came before. The list compiles in one linear pass; the
//! explicit open/close entries are what allow arbitrarily nested
//! parenthesized boolean expressions while preserving compile order.

use crate::database::Database;
use crate::error::DbResult;
use crate::params::Params;
use crate::value::{Field, Value};

/// Logic operator joining a condition entry to its predecessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Logic {
    And,
    Or,
}

impl Logic {
    fn as_str(self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

/// One entry of a condition list.
#[derive(Clone, Debug)]
pub(crate) enum Cond {
    /// Open a parenthesized group
    Open(Logic),
    /// Close a parenthesized group
    Close(Logic),
    /// Leaf predicate: `column op value`
    Predicate {
        logic: Logic,
        column: Field,
        op: String,
        value: Value,
    },
}

/// Compile a condition list.
///
/// Adjacency rules: the logic operator is suppressed for the very first
/// emitted token and immediately after an open-group (no `WHERE AND (`);
/// a close-group never takes a preceding operator.
pub(crate) fn compile_conditions(
    db: &Database,
    params: &Params,
    conds: &[Cond],
) -> DbResult<String> {
    let mut sql = String::new();
    let mut last_open = false;

    for entry in conds {
        match entry {
            Cond::Open(logic) => {
                if !sql.is_empty() && !last_open {
                    sql.push(' ');
                    sql.push_str(logic.as_str());
                    sql.push(' ');
                }
                sql.push('(');
                last_open = true;
            }
            Cond::Close(_) => {
                sql.push(')');
                last_open = false;
            }
            Cond::Predicate {
                logic,
                column,
                op,
                value,
            } => {
                if !sql.is_empty() && !last_open {
                    sql.push(' ');
                    sql.push_str(logic.as_str());
                    sql.push(' ');
                }
                last_open = false;
                sql.push_str(&compile_predicate(db, params, column, op, value)?);
            }
        }
    }

    Ok(sql)
}

fn compile_predicate(
    db: &Database,
    params: &Params,
    column: &Field,
    op: &str,
    value: &Value,
) -> DbResult<String> {
    let mut op = op.trim().to_uppercase();

    // NULL comparisons rewrite to IS / IS NOT.
    if value.is_null() {
        if op == "=" {
            op = "IS".to_string();
        } else if op == "!=" || op == "<>" {
            op = "IS NOT".to_string();
        }
    }

    let value_sql = if op.ends_with("BETWEEN") {
        if let Value::List(bounds) = value
            && bounds.len() == 2
        {
            let min = quote_operand(db, params, &bounds[0])?;
            let max = quote_operand(db, params, &bounds[1])?;
            format!("{min} AND {max}")
        } else {
            quote_operand(db, params, value)?
        }
    } else {
        quote_operand(db, params, value)?
    };

    // An alias pair in predicate position uses only the name, as a plain
    // identifier; everything else gets full column quoting.
    let column_sql = match column {
        Field::Alias(name, _) => db.quote_identifier(&Field::Name(name.clone()))?,
        other => db.quote_column(other)?,
    };

    Ok(format!("{column_sql} {op} {value_sql}")
        .trim()
        .to_string())
}

/// Quote a predicate operand, passing declared parameter keys through raw.
fn quote_operand(db: &Database, params: &Params, value: &Value) -> DbResult<String> {
    if let Value::Str(s) = value
        && params.has_name(s)
    {
        return Ok(s.clone());
    }
    db.quote(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::mysql_db;

    fn pred(logic: Logic, column: &str, op: &str, value: impl Into<Value>) -> Cond {
        Cond::Predicate {
            logic,
            column: column.into(),
            op: op.to_string(),
            value: value.into(),
        }
    }

    #[test]
    fn first_logic_operator_is_suppressed() {
        let db = mysql_db("cond_first", "");
        let sql = compile_conditions(
            &db,
            &Params::new(),
            &[
                pred(Logic::And, "a", "=", 1i64),
                pred(Logic::Or, "b", "=", 2i64),
            ],
        )
        .unwrap();
        assert_eq!(sql, "`a` = 1 OR `b` = 2");
    }

    #[test]
    fn no_operator_after_open_group() {
        let db = mysql_db("cond_group", "");
        let sql = compile_conditions(
            &db,
            &Params::new(),
            &[
                Cond::Open(Logic::And),
                pred(Logic::And, "a", "=", Value::Str("?".into())),
                Cond::Close(Logic::And),
            ],
        )
        .unwrap();
        assert_eq!(sql, "(`a` = ?)");
    }

    #[test]
    fn nested_groups() {
        let db = mysql_db("cond_nested", "");
        let sql = compile_conditions(
            &db,
            &Params::new(),
            &[
                pred(Logic::And, "x", "=", 1i64),
                Cond::Open(Logic::Or),
                pred(Logic::And, "y", "=", 2i64),
                pred(Logic::Or, "z", "=", 3i64),
                Cond::Close(Logic::Or),
            ],
        )
        .unwrap();
        assert_eq!(sql, "`x` = 1 OR (`y` = 2 OR `z` = 3)");
    }

    #[test]
    fn null_rewrites_operator() {
        let db = mysql_db("cond_null", "");
        let sql = compile_conditions(
            &db,
            &Params::new(),
            &[
                pred(Logic::And, "x", "=", Value::Null),
                pred(Logic::And, "y", "!=", Value::Null),
            ],
        )
        .unwrap();
        assert_eq!(sql, "`x` IS NULL AND `y` IS NOT NULL");
    }

    #[test]
    fn between_quotes_bounds_independently() {
        let db = mysql_db("cond_between", "");
        let sql = compile_conditions(
            &db,
            &Params::new(),
            &[pred(Logic::And, "x", "between", vec![1i64, 10])],
        )
        .unwrap();
        assert_eq!(sql, "`x` BETWEEN 1 AND 10");
    }

    #[test]
    fn operator_is_uppercased() {
        let db = mysql_db("cond_upper", "");
        let sql = compile_conditions(
            &db,
            &Params::new(),
            &[pred(Logic::And, "name", "like", "a%")],
        )
        .unwrap();
        assert_eq!(sql, "`name` LIKE 'a%'");
    }

    #[test]
    fn declared_parameter_key_stays_raw() {
        let db = mysql_db("cond_param", "");
        let mut params = Params::new();
        params.set(":min", 18i64);
        let sql = compile_conditions(
            &db,
            &params,
            &[pred(Logic::And, "age", ">=", Value::Str(":min".into()))],
        )
        .unwrap();
        assert_eq!(sql, "`age` >= :min");
    }

    #[test]
    fn alias_pair_column_uses_plain_name() {
        let db = mysql_db("cond_alias", "p_");
        let sql = compile_conditions(
            &db,
            &Params::new(),
            &[Cond::Predicate {
                logic: Logic::And,
                column: ("users.id", "uid").into(),
                op: "=".to_string(),
                value: Value::Int(1),
            }],
        )
        .unwrap();
        // No prefix or alias logic in predicate position.
        assert_eq!(sql, "`users`.`id` = 1");
    }
}
