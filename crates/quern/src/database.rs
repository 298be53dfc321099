//! The database handle and the instance registry.
//!
//! [`Database`] is a cloneable handle over one driver instance. It carries
//! everything that is engine-generic: polymorphic literal quoting,
//! identifier quoting with table-prefix injection, convenience queries, and
//! passthroughs to the driver primitives.
//!
//! [`Registry`] maps instance names to configurations and lazily built
//! handles. A process-wide default registry backs
//! [`Database::instance`] / [`Database::configure`]; independent registries
//! can be constructed for dependency injection. All registry state is
//! mutex-guarded, so concurrent first-call races construct exactly one
//! instance per name.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex, OnceLock};

use crate::cache::QueryCache;
use crate::config::{Config, DriverKind};
use crate::driver::{Driver, MysqlDriver, Outcome, QueryType, SqliteDriver};
use crate::error::{DbError, DbResult};
use crate::params::Params;
use crate::value::{Field, Value};

/// Name of the default database instance.
pub const DEFAULT_INSTANCE: &str = "default";

/// A cloneable handle over one driver instance.
#[derive(Clone)]
pub struct Database {
    driver: Arc<dyn Driver>,
}

impl Database {
    /// Fetch (or lazily construct) a named instance from the default
    /// registry.
    pub fn instance(name: &str) -> DbResult<Database> {
        Registry::global().instance(name)
    }

    /// Register a configuration under `name` in the default registry.
    pub fn configure(name: impl Into<String>, config: Config) {
        Registry::global().configure(name, config);
    }

    /// Build a handle directly from a configuration, without registering
    /// it anywhere.
    pub fn from_config(name: impl Into<String>, config: Config) -> DbResult<Database> {
        let driver: Arc<dyn Driver> = match config.kind {
            DriverKind::Mysql => Arc::new(MysqlDriver::new(name, config)?),
            DriverKind::Sqlite => Arc::new(SqliteDriver::new(name, config)?),
        };
        Ok(Database { driver })
    }

    /// Wrap an existing driver, e.g. a fixture implementation in tests.
    pub fn from_driver(driver: Arc<dyn Driver>) -> Database {
        Database { driver }
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        self.driver.instance_name()
    }

    /// Engine selector.
    pub fn kind(&self) -> DriverKind {
        self.driver.kind()
    }

    /// Configured table prefix.
    pub fn table_prefix(&self) -> &str {
        self.driver.table_prefix()
    }

    /// Result cache collaborator, if configured.
    pub fn cache(&self) -> Option<Arc<dyn QueryCache>> {
        self.driver.cache()
    }

    /// Establish the native connection (idempotent).
    pub fn connect(&self) -> DbResult<()> {
        self.driver.connect()
    }

    /// Whether a native handle is currently held.
    pub fn connected(&self) -> bool {
        self.driver.connected()
    }

    /// Release the native handle and drop this instance from the default
    /// registry, so the next [`Database::instance`] constructs anew.
    pub fn disconnect(&self) -> bool {
        self.driver.disconnect();
        Registry::global().evict_entry(self.name(), self);
        true
    }

    /// Set the connection character set.
    pub fn set_charset(&self, charset: &str) -> DbResult<()> {
        self.driver.set_charset(charset)
    }

    /// Begin a transaction, optionally with an engine-specific mode.
    pub fn begin(&self, mode: Option<&str>) -> DbResult<()> {
        self.driver.begin(mode)
    }

    /// Commit the current transaction.
    pub fn commit(&self) -> DbResult<()> {
        self.driver.commit()
    }

    /// Roll back the current transaction.
    pub fn rollback(&self) -> DbResult<()> {
        self.driver.rollback()
    }

    /// Escape text into a fully quoted string literal.
    pub fn escape(&self, value: &str) -> String {
        self.driver.escape(value)
    }

    /// The most recently executed SQL text.
    pub fn last_query(&self) -> Option<String> {
        self.driver.last_query()
    }

    /// Execute one statement against the driver.
    pub fn query(&self, kind: QueryType, sql: &str, params: &Params) -> DbResult<Outcome> {
        self.driver.exec(kind, sql, params)
    }

    /// Convenience `SELECT COUNT(*)` against a quoted table.
    pub fn count_records(&self, table: impl Into<Field>) -> DbResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) AS total_row_count FROM {}",
            self.quote_table(&table.into())?
        );
        let outcome = self.query(QueryType::Select, &sql, &Params::new())?;
        let rows = outcome
            .into_rows()
            .ok_or_else(|| DbError::query("count query produced no result set", &sql))?;
        rows.get("total_row_count")
            .and_then(Value::as_int)
            .ok_or_else(|| DbError::decode("total_row_count", "missing count column"))
    }

    // ==================== Quoting ====================

    /// Quote a value for literal embedding.
    ///
    /// `NULL`, booleans, numbers, and lists have fixed renderings; the
    /// literal placeholder string `?` passes through unescaped (it marks a
    /// bound-parameter slot); expressions and sub-selects compile
    /// themselves; everything else goes through the driver's escaping.
    pub fn quote(&self, value: &Value) -> DbResult<String> {
        match value {
            Value::Null => Ok("NULL".to_string()),
            Value::Bool(true) => Ok("'1'".to_string()),
            Value::Bool(false) => Ok("'0'".to_string()),
            Value::Int(n) => Ok(n.to_string()),
            // Fixed notation: locale-dependent formatting would corrupt the
            // decimal separator.
            Value::Float(f) => Ok(format!("{f:.6}")),
            Value::Str(s) if s == "?" => Ok("?".to_string()),
            Value::Str(s) => Ok(self.driver.escape(s)),
            Value::Bytes(bytes) => {
                let mut out = String::with_capacity(bytes.len() * 2 + 3);
                out.push_str("X'");
                for byte in bytes {
                    let _ = write!(out, "{byte:02X}");
                }
                out.push('\'');
                Ok(out)
            }
            Value::List(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(self.quote(item)?);
                }
                Ok(format!("({})", parts.join(", ")))
            }
            Value::Expr(e) => e.compile(self),
            Value::Select(q) => Ok(format!("({})", q.compile(self)?)),
        }
    }

    /// Quote a generic identifier. Dotted names are quoted per segment; no
    /// table prefix is applied.
    pub fn quote_identifier(&self, field: &Field) -> DbResult<String> {
        match field {
            Field::Name(name) => {
                if name.contains('.') {
                    let parts: Vec<String> =
                        name.split('.').map(|part| self.quote_part(part)).collect();
                    Ok(parts.join("."))
                } else {
                    Ok(self.quote_part(name))
                }
            }
            Field::Alias(name, alias) => Ok(format!(
                "{} AS {}",
                self.quote_identifier(&Field::Name(name.clone()))?,
                self.quote_part(alias)
            )),
            Field::Expr(e) => e.compile(self),
            Field::Select(q) => Ok(format!("({})", q.compile(self)?)),
        }
    }

    /// Quote a column reference. For dotted names the table prefix is
    /// injected before the second-to-last segment; the prefix belongs to
    /// the table, never to the column. `*` segments stay unquoted.
    pub fn quote_column(&self, field: &Field) -> DbResult<String> {
        match field {
            Field::Name(name) => {
                if name == "*" {
                    return Ok(name.clone());
                }
                if name.contains('.') {
                    let mut parts: Vec<String> = name.split('.').map(str::to_string).collect();
                    let prefix = self.table_prefix();
                    if !prefix.is_empty() && parts.len() >= 2 {
                        let offset = parts.len() - 2;
                        parts[offset] = format!("{prefix}{}", parts[offset]);
                    }
                    let quoted: Vec<String> =
                        parts.iter().map(|part| self.quote_part(part)).collect();
                    Ok(quoted.join("."))
                } else {
                    Ok(self.quote_part(name))
                }
            }
            Field::Alias(name, alias) => Ok(format!(
                "{} AS {}",
                self.quote_column(&Field::Name(name.clone()))?,
                self.quote_part(alias)
            )),
            Field::Expr(e) => e.compile(self),
            Field::Select(q) => Ok(format!("({})", q.compile(self)?)),
        }
    }

    /// Quote a table reference, injecting the table prefix: before the last
    /// segment of a dotted name, or directly onto an undotted one.
    pub fn quote_table(&self, field: &Field) -> DbResult<String> {
        let prefix = self.table_prefix();
        match field {
            Field::Name(name) => {
                if name.contains('.') {
                    let mut parts: Vec<String> = name.split('.').map(str::to_string).collect();
                    if !prefix.is_empty() {
                        let last = parts.len() - 1;
                        parts[last] = format!("{prefix}{}", parts[last]);
                    }
                    let quoted: Vec<String> =
                        parts.iter().map(|part| self.quote_part(part)).collect();
                    Ok(quoted.join("."))
                } else {
                    Ok(self.quote_part(&format!("{prefix}{name}")))
                }
            }
            Field::Alias(name, alias) => Ok(format!(
                "{} AS {}",
                self.quote_table(&Field::Name(name.clone()))?,
                self.quote_part(alias)
            )),
            Field::Expr(e) => e.compile(self),
            Field::Select(q) => Ok(format!("({})", q.compile(self)?)),
        }
    }

    /// Quote one identifier segment, doubling embedded quote characters.
    /// `*` and engines without a quote character pass through.
    fn quote_part(&self, part: &str) -> String {
        let quote = self.driver.quote_char();
        if part == "*" || quote.is_empty() {
            return part.to_string();
        }
        let doubled = format!("{quote}{quote}");
        format!("{quote}{}{quote}", part.replace(quote, &doubled))
    }
}

impl PartialEq for Database {
    /// Two handles are equal when they share the same underlying driver
    /// instance.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.driver, &other.driver)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("connected", &self.connected())
            .finish()
    }
}

/// Instance registry: configurations plus lazily constructed handles.
#[derive(Default)]
pub struct Registry {
    configs: Mutex<HashMap<String, Config>>,
    instances: Mutex<HashMap<String, Database>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default registry.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Register a configuration under `name`.
    pub fn configure(&self, name: impl Into<String>, config: Config) {
        self.configs.lock().unwrap().insert(name.into(), config);
    }

    /// Fetch the handle registered under `name`, constructing and
    /// registering it from configuration on first use.
    pub fn instance(&self, name: &str) -> DbResult<Database> {
        if let Some(db) = self.instances.lock().unwrap().get(name) {
            return Ok(db.clone());
        }

        let config = self
            .configs
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| {
                DbError::configuration(format!(
                    "no configuration registered for database instance '{name}'"
                ))
            })?;

        let db = Database::from_config(name, config)?;

        // First registration wins a concurrent construction race.
        let mut instances = self.instances.lock().unwrap();
        Ok(instances.entry(name.to_string()).or_insert(db).clone())
    }

    /// Drop the handle registered under `name`. The configuration stays,
    /// so the next [`Registry::instance`] call reconstructs.
    pub fn evict(&self, name: &str) -> bool {
        self.instances.lock().unwrap().remove(name).is_some()
    }

    /// Drop the entry under `name` only when it is `db` itself; a handle
    /// from another registry never evicts a same-named instance here.
    pub(crate) fn evict_entry(&self, name: &str, db: &Database) -> bool {
        let mut instances = self.instances.lock().unwrap();
        match instances.get(name) {
            Some(existing) if existing == db => {
                instances.remove(name);
                true
            }
            _ => false,
        }
    }

    /// Drop every handle, keeping configurations.
    pub fn clear(&self) {
        self.instances.lock().unwrap().clear();
    }
}
