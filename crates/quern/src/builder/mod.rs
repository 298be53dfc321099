//! Fluent query builders for SELECT, INSERT, UPDATE, and DELETE.
//!
//! Builders are mutable clause accumulators with a linear life cycle:
//! construct, mutate fluently in any order, `compile(&db)` any number of
//! times (a pure read of the accumulated state), optionally `reset()` and
//! reuse. Values are quoted inline at compile time through the active
//! driver, except placeholder slots (`?` and declared `:name` keys), which
//! are left for the driver's parameter binding.
//!
//! # Usage
//!
//! ```ignore
//! use quern::{builder, Database};
//!
//! let db = Database::instance("default")?;
//!
//! // SELECT
//! let rows = builder::select()
//!     .from("users")
//!     .and_where("status", "=", "active")
//!     .order_by_desc("created_at")
//!     .limit(20)
//!     .execute(&db)?;
//!
//! // INSERT
//! let (id, _) = builder::insert("users")
//!     .columns(["username", "email"])
//!     .values(["alice", "alice@example.com"])
//!     .execute(&db)?;
//!
//! // UPDATE
//! builder::update("users")
//!     .set("status", "inactive")
//!     .and_where("id", "=", id)
//!     .execute(&db)?;
//!
//! // DELETE
//! builder::delete("users")
//!     .and_where("id", "=", id)
//!     .execute(&db)?;
//! ```

mod conditions;
mod delete;
mod insert;
mod join;
mod select;
mod update;

pub use delete::Delete;
pub use insert::Insert;
pub use join::{Join, JoinType};
pub use select::Select;
pub use update::Update;

use crate::database::Database;
use crate::error::DbResult;
use crate::value::Field;

/// Create a SELECT builder (`SELECT *` until columns are added).
pub fn select() -> Select {
    Select::new()
}

/// Create an INSERT builder for the given table.
pub fn insert(table: impl Into<Field>) -> Insert {
    Insert::new(table)
}

/// Create an UPDATE builder for the given table.
pub fn update(table: impl Into<Field>) -> Update {
    Update::new(table)
}

/// Create a DELETE builder for the given table.
pub fn delete(table: impl Into<Field>) -> Delete {
    Delete::new(table)
}

/// Compile an ORDER BY list: quoted columns with optional uppercased
/// directions.
pub(crate) fn compile_order_by(
    db: &Database,
    order: &[(Field, Option<String>)],
) -> DbResult<String> {
    let mut parts = Vec::with_capacity(order.len());
    for (column, direction) in order {
        let mut part = db.quote_column(column)?;
        if let Some(direction) = direction {
            part.push(' ');
            part.push_str(&direction.to_uppercase());
        }
        parts.push(part);
    }
    Ok(parts.join(", "))
}

#[cfg(test)]
mod tests;
