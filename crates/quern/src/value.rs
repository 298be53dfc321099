//! SQL value and identifier-reference types.
//!
//! [`Value`] is the domain of everything the quoter understands: scalars,
//! lists (for `IN (...)`), raw [`Expression`] fragments, and embedded
//! sub-selects. [`Field`] is the corresponding domain for identifier
//! positions (column and table slots): a plain name, an aliased name, an
//! expression, or a sub-select.
//!
//! Neither type escapes anything by itself; quoting is driver-specific and
//! lives on [`crate::Database`].

use serde::{Serialize, Serializer};

use crate::builder::Select;
use crate::expression::Expression;

/// A quotable SQL value.
#[derive(Clone, Debug)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean, quoted as `'1'` / `'0'`
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Double-precision float, quoted in fixed notation
    Float(f64),
    /// Text, escaped through the active driver
    Str(String),
    /// Binary blob, quoted as a hex literal
    Bytes(Vec<u8>),
    /// Element-wise quoted list, wrapped in parens
    List(Vec<Value>),
    /// Raw SQL fragment that compiles itself
    Expr(Expression),
    /// Sub-select that compiles and parenthesizes itself
    Select(Box<Select>),
}

impl Value {
    /// Create a binary value.
    ///
    /// `Vec<u8>` converts to [`Value::List`] through the generic list
    /// conversion, so blobs are constructed explicitly.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(data.into())
    }

    /// Check for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Read as an integer. Numeric text parses, which matters for drivers
    /// whose text protocol returns every column as a string.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Read as a float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            Value::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Read as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Read as a boolean (`0`/`1` integers and `"0"`/`"1"` text included).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            Value::Str(s) => match s.as_str() {
                "0" => Some(false),
                "1" => Some(true),
                _ => None,
            },
            _ => None,
        }
    }

    /// Stable text form used for keying exported row maps.
    pub(crate) fn key_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
            other => format!("{other:?}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::List(items) => items.serialize(serializer),
            Value::Expr(e) => serializer.serialize_str(e.value()),
            Value::Select(_) => serializer.serialize_str("<select>"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        }
    )*};
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Expression> for Value {
    fn from(v: Expression) -> Self {
        Value::Expr(v)
    }
}

impl From<Select> for Value {
    fn from(v: Select) -> Self {
        Value::Select(Box::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

/// A reference appearing in an identifier position.
#[derive(Clone, Debug)]
pub enum Field {
    /// Plain, possibly dotted, name
    Name(String),
    /// `(name, alias)` pair, rendered with `AS`
    Alias(String, String),
    /// Raw SQL fragment
    Expr(Expression),
    /// Sub-select, rendered parenthesized
    Select(Box<Select>),
}

impl Field {
    /// Stable key used for column de-duplication; expressions and
    /// sub-selects are never considered duplicates of anything.
    pub(crate) fn dedup_key(&self) -> Option<String> {
        match self {
            Field::Name(name) => Some(format!("n:{name}")),
            Field::Alias(name, alias) => Some(format!("a:{name}/{alias}")),
            _ => None,
        }
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::Name(v.to_string())
    }
}

impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::Name(v)
    }
}

impl From<(&str, &str)> for Field {
    fn from((name, alias): (&str, &str)) -> Self {
        Field::Alias(name.to_string(), alias.to_string())
    }
}

impl From<(String, String)> for Field {
    fn from((name, alias): (String, String)) -> Self {
        Field::Alias(name, alias)
    }
}

impl From<Expression> for Field {
    fn from(v: Expression) -> Self {
        Field::Expr(v)
    }
}

impl From<Select> for Field {
    fn from(v: Select) -> Self {
        Field::Select(Box::new(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_conversions() {
        assert!(matches!(Value::from(7i32), Value::Int(7)));
        assert!(matches!(Value::from(7u16), Value::Int(7)));
    }

    #[test]
    fn option_conversion() {
        let none: Option<i64> = None;
        assert!(Value::from(none).is_null());
        assert!(matches!(Value::from(Some(3i64)), Value::Int(3)));
    }

    #[test]
    fn vec_becomes_list() {
        let v = Value::from(vec![1i64, 2]);
        match v {
            Value::List(items) => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::Int(5).as_int(), Some(5));
        assert_eq!(Value::Str("5".into()).as_int(), Some(5));
        assert_eq!(Value::Int(0).as_bool(), Some(false));
        assert_eq!(Value::Str("x".into()).as_int(), None);
    }

    #[test]
    fn alias_from_tuple() {
        assert!(matches!(Field::from(("users", "u")), Field::Alias(_, _)));
    }
}
