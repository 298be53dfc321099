//! # quern
//!
//! A fluent SQL query builder and synchronous driver abstraction for
//! MySQL-family and SQLite backends.
//!
//! ## Features
//!
//! - **Fluent builders**: SELECT/INSERT/UPDATE/DELETE accumulated clause by
//!   clause, compiled against the active driver's quoting rules
//! - **Driver abstraction**: one execution contract over `mysql` and
//!   `rusqlite`, with normalized errors, transactions, and table-prefix
//!   aware identifier quoting
//! - **Instance registry**: named, lazily connected singletons built from
//!   `serde`-deserializable configuration or DSN URLs
//! - **Result caching**: SELECTs opt into a TTL cache keyed by driver,
//!   SQL, and serialized parameters
//! - **Profiling hooks**: every native execution can be bracketed by a
//!   profiler collaborator; failures are discarded, not recorded
//! - **Typed mapping**: rows hydrate into structs via the `FromRow` trait
//!
//! ## Usage
//!
//! ```ignore
//! use quern::{builder, Config, Database};
//!
//! Database::configure("default", Config::sqlite("app.db").table_prefix("app_"));
//! let db = Database::instance("default")?;
//!
//! let rows = builder::select()
//!     .from("users")
//!     .and_where("status", "=", "active")
//!     .limit(10)
//!     .execute(&db)?;
//!
//! for row in &rows {
//!     println!("{:?}", row.get("name"));
//! }
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod database;
pub mod driver;
pub mod error;
pub mod expression;
pub mod params;
pub mod profile;
pub mod query;
pub mod result;
pub mod row;
pub mod value;

pub use builder::{Delete, Insert, Join, JoinType, Select, Update};
pub use cache::{MemoryCache, QueryCache};
pub use config::{Config, ConnectionConfig, DriverKind, MysqlConnection, SqliteConnection};
pub use database::{DEFAULT_INSTANCE, Database, Registry};
pub use driver::{Driver, MysqlDriver, Outcome, QueryType, SqliteDriver};
pub use error::{DbError, DbResult};
pub use expression::{Expression, expr};
pub use params::{ParamKey, Params};
pub use profile::{ProfileStats, ProfileToken, Profiler, StatsProfiler, TracingProfiler};
pub use query::{Query, query};
pub use result::Rows;
pub use row::{FromRow, Row};
pub use value::{Field, Value};

// Re-export the builder entry points for easy access
pub use builder::{delete, insert, select, update};

#[cfg(test)]
pub(crate) mod test_util {
    //! Shared fixtures: never-connected MySQL instances for SQL-text
    //! assertions, in-memory SQLite instances for execution.

    use crate::config::Config;
    use crate::database::Database;

    /// A registry-configured MySQL instance. Compiling against it never
    /// touches the network, so SQL-text tests are hermetic.
    pub(crate) fn mysql_db(stem: &str, prefix: &str) -> Database {
        let name = format!("test_mysql_{stem}");
        Database::configure(
            name.as_str(),
            Config::mysql("localhost", "app", "root").table_prefix(prefix),
        );
        Database::instance(&name).unwrap()
    }

    /// A registry-configured in-memory SQLite instance.
    pub(crate) fn sqlite_db(stem: &str) -> Database {
        let name = format!("test_sqlite_{stem}");
        Database::configure(name.as_str(), Config::sqlite(":memory:"));
        Database::instance(&name).unwrap()
    }
}
