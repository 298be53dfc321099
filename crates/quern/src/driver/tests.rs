//! Driver-level tests. Everything that needs a live engine runs against
//! in-memory SQLite; the MySQL driver's placeholder mechanics are exercised
//! as pure functions.

use std::sync::Arc;
use std::time::Duration;

use crate::builder::{delete, insert, select, update};
use crate::cache::MemoryCache;
use crate::config::Config;
use crate::database::Database;
use crate::driver::mysql::rewrite_placeholders;
use crate::driver::sqlite::positional_slots;
use crate::driver::profile_category;
use crate::error::{DbError, DbResult};
use crate::params::Params;
use crate::profile::StatsProfiler;
use crate::query::query;
use crate::row::{FromRow, Row};
use crate::test_util::sqlite_db;
use crate::value::Value;

fn seed_users(db: &Database) -> DbResult<()> {
    query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)").execute(db)?;
    insert("users")
        .columns(["id", "name", "age"])
        .values([Value::Int(5), "fred".into(), Value::Int(40)])
        .values([Value::Int(6), "wilma".into(), Value::Int(35)])
        .execute(db)?;
    Ok(())
}

#[test]
fn end_to_end_select_with_bound_parameter() {
    let db = sqlite_db("e2e_select");
    seed_users(&db).unwrap();

    let rows = select()
        .from("users")
        .and_where("id", "=", Value::Str("?".into()))
        .param(1usize, 5i64)
        .execute(&db)
        .unwrap();

    assert_eq!(
        db.last_query().as_deref(),
        Some("SELECT * FROM \"users\" WHERE \"id\" = ?")
    );
    assert_eq!(rows.count(), 1);
    assert_eq!(rows.get("id").and_then(Value::as_int), Some(5));
    assert_eq!(rows.get("name").and_then(Value::as_str), Some("fred"));
}

#[test]
fn named_parameters_bind_directly() {
    let db = sqlite_db("e2e_named");
    seed_users(&db).unwrap();

    let rows = select()
        .from("users")
        .and_where("name", "=", Value::Str(":who".into()))
        .and_where("age", ">", Value::Str("?".into()))
        .param(":who", "wilma")
        .param(1usize, 30i64)
        .execute(&db)
        .unwrap();

    assert_eq!(rows.count(), 1);
    assert_eq!(rows.get("id").and_then(Value::as_int), Some(6));
}

#[test]
fn insert_returns_id_and_count() {
    let db = sqlite_db("e2e_insert");
    query("CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT)")
        .execute(&db)
        .unwrap();

    let (id, affected) = insert("items")
        .columns(["label"])
        .values(["first"])
        .execute(&db)
        .unwrap();
    assert!(id > 0);
    assert_eq!(affected, 1);

    let (next_id, _) = insert("items")
        .columns(["label"])
        .values(["second"])
        .execute(&db)
        .unwrap();
    assert_eq!(next_id, id + 1);
}

#[test]
fn update_and_delete_report_affected_rows() {
    let db = sqlite_db("e2e_mutate");
    seed_users(&db).unwrap();

    let affected = update("users")
        .set("age", 41i64)
        .and_where("id", "=", 5i64)
        .execute(&db)
        .unwrap();
    assert_eq!(affected, 1);

    let affected = delete("users").and_where("age", ">", 100i64).execute(&db).unwrap();
    assert_eq!(affected, 0);

    let affected = delete("users").execute(&db).unwrap();
    assert_eq!(affected, 2);
}

#[test]
fn count_records_counts() {
    let db = sqlite_db("e2e_count");
    seed_users(&db).unwrap();
    assert_eq!(db.count_records("users").unwrap(), 2);
}

#[test]
fn transactions_commit_and_rollback() {
    let db = sqlite_db("e2e_tx");
    query("CREATE TABLE t (n INTEGER)").execute(&db).unwrap();

    db.begin(None).unwrap();
    insert("t").columns(["n"]).values([1i64]).execute(&db).unwrap();
    db.rollback().unwrap();
    assert_eq!(db.count_records("t").unwrap(), 0);

    db.begin(Some("IMMEDIATE")).unwrap();
    insert("t").columns(["n"]).values([2i64]).execute(&db).unwrap();
    db.commit().unwrap();
    assert_eq!(db.count_records("t").unwrap(), 1);
}

#[test]
fn query_errors_are_normalized_with_sql() {
    let db = sqlite_db("e2e_error");
    let result = query("SELECT * FROM missing_table").execute(&db);
    match result {
        Err(DbError::Query { sql, .. }) => assert_eq!(sql, "SELECT * FROM missing_table"),
        other => panic!("expected query error, got {other:?}"),
    }
}

#[test]
fn cached_select_skips_the_driver_on_hit() {
    let name = "drv_cache";
    let profiler = Arc::new(StatsProfiler::new());
    let cache = Arc::new(MemoryCache::new());
    Database::configure(
        name,
        Config::sqlite(":memory:")
            .caching(true)
            .cache(cache.clone())
            .profiler(profiler.clone()),
    );
    let db = Database::instance(name).unwrap();
    seed_users(&db).unwrap();

    let category = profile_category(name);
    let before = profiler.stats(&category).completed;

    let cached_select = || {
        select()
            .from("users")
            .order_by("id")
            .cached(Duration::from_secs(60))
            .execute(&db)
            .unwrap()
    };

    let first = cached_select();
    let second = cached_select();

    // Exactly one native execution; the second call served from cache.
    assert_eq!(profiler.stats(&category).completed - before, 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(first.count(), second.count());
    assert_eq!(
        first.get_row(0).unwrap().get("name").and_then(Value::as_str),
        second.get_row(0).unwrap().get("name").and_then(Value::as_str),
    );
}

#[test]
fn force_execute_bypasses_a_cache_hit() {
    let name = "drv_cache_force";
    let profiler = Arc::new(StatsProfiler::new());
    Database::configure(
        name,
        Config::sqlite(":memory:")
            .cache(Arc::new(MemoryCache::new()))
            .profiler(profiler.clone()),
    );
    let db = Database::instance(name).unwrap();
    seed_users(&db).unwrap();

    let category = profile_category(name);
    let before = profiler.stats(&category).completed;

    let q = select().from("users").cached(Duration::from_secs(60));
    q.clone().execute(&db).unwrap();
    q.clone().force_execute().execute(&db).unwrap();

    assert_eq!(profiler.stats(&category).completed - before, 2);
}

#[test]
fn failed_query_discards_its_profile_span() {
    let name = "drv_profile_discard";
    let profiler = Arc::new(StatsProfiler::new());
    Database::configure(name, Config::sqlite(":memory:").profiler(profiler.clone()));
    let db = Database::instance(name).unwrap();

    let _ = query("SELECT * FROM nowhere").execute(&db);

    let stats = profiler.stats(&profile_category(name));
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.discarded, 1);
}

#[test]
fn hydrates_typed_rows() {
    #[derive(Debug, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    impl FromRow for User {
        fn from_row(row: &Row) -> DbResult<User> {
            Ok(User {
                id: row
                    .require("id")?
                    .as_int()
                    .ok_or_else(|| DbError::decode("id", "expected integer"))?,
                name: row
                    .require("name")?
                    .as_str()
                    .ok_or_else(|| DbError::decode("name", "expected text"))?
                    .to_string(),
            })
        }
    }

    let db = sqlite_db("e2e_hydrate");
    seed_users(&db).unwrap();

    let users: Vec<User> = select()
        .from("users")
        .order_by("id")
        .fetch_all(&db)
        .unwrap();
    assert_eq!(
        users,
        vec![
            User { id: 5, name: "fred".into() },
            User { id: 6, name: "wilma".into() },
        ]
    );

    let one: User = select()
        .from("users")
        .and_where("id", "=", 6i64)
        .fetch_one(&db)
        .unwrap();
    assert_eq!(one.name, "wilma");

    let none: Option<User> = select()
        .from("users")
        .and_where("id", "=", 99i64)
        .fetch_opt(&db)
        .unwrap();
    assert!(none.is_none());
}

// ==================== MySQL placeholder mechanics ====================

#[test]
fn mysql_rewrites_named_to_positional() {
    let mut params = Params::new();
    params.set(1usize, 10i64);
    params.set(":name", "bob");

    let (sql, bound) = rewrite_placeholders(
        "SELECT * FROM t WHERE a = ? AND b = :name AND c = ':skip'",
        &params,
    )
    .unwrap();

    assert_eq!(sql, "SELECT * FROM t WHERE a = ? AND b = ? AND c = ':skip'");
    assert_eq!(
        bound,
        vec![mysql::Value::Int(10), mysql::Value::Bytes(b"bob".to_vec())]
    );
}

#[test]
fn mysql_missing_binding_is_a_parameter_error() {
    let result = rewrite_placeholders("SELECT ?", &Params::new());
    assert!(matches!(result, Err(DbError::Parameter(_))));

    let result = rewrite_placeholders("SELECT :absent", &Params::new());
    assert!(matches!(result, Err(DbError::Parameter(_))));
}

#[test]
fn mysql_type_tags_bound_values() {
    let mut params = Params::new();
    params.set(1usize, Value::Null);
    params.set(2usize, true);
    params.set(3usize, 1.5f64);

    let (_, bound) = rewrite_placeholders("SELECT ?, ?, ?", &params).unwrap();
    assert_eq!(
        bound,
        vec![
            mysql::Value::NULL,
            mysql::Value::Int(1),
            mysql::Value::Double(1.5),
        ]
    );
}

// ==================== SQLite placeholder mechanics ====================

#[test]
fn sqlite_positional_slots_with_mixed_styles() {
    assert_eq!(positional_slots("a = ? AND b = ?"), vec![1, 2]);
    // A leading named parameter consumes index 1.
    assert_eq!(positional_slots("a = :x AND b = ?"), vec![2]);
    // Repeated names share one index.
    assert_eq!(positional_slots("a = :x AND b = :x AND c = ?"), vec![2]);
    // Parameters inside literals are not placeholders.
    assert_eq!(positional_slots("a = '?' AND b = ?"), vec![1]);
}

#[test]
fn disconnect_releases_the_handle() {
    let db = sqlite_db("drv_disconnect");
    db.connect().unwrap();
    assert!(db.connected());
    assert!(db.disconnect());
    assert!(!db.connected());
    // Disconnect is idempotent.
    assert!(db.disconnect());
}
