//! Cross-builder tests: prefix interaction, expressions, reuse.

use crate::builder::{delete, insert, select, update};
use crate::expression::expr;
use crate::test_util::mysql_db;
use crate::value::Value;

#[test]
fn select_applies_prefix_to_tables_only() {
    let db = mysql_db("xb_prefix", "p_");
    let sql = select()
        .column("users.name")
        .from("users")
        .inner_join("orders")
        .on("users.id", "=", "orders.user_id")
        .compile(&db)
        .unwrap();
    assert_eq!(
        sql,
        "SELECT `p_users`.`name` FROM `p_users` \
         INNER JOIN `p_orders` ON (`p_users`.`id` = `p_orders`.`user_id`)"
    );
}

#[test]
fn expression_columns_are_never_escaped() {
    let db = mysql_db("xb_expr", "");
    let sql = select()
        .column(expr("COUNT(*)"))
        .column(("id", "user_id"))
        .from("users")
        .compile(&db)
        .unwrap();
    assert_eq!(sql, "SELECT COUNT(*), `id` AS `user_id` FROM `users`");
}

#[test]
fn expression_with_bound_value() {
    let db = mysql_db("xb_expr_param", "");
    let sql = update("counters")
        .set("hits", expr("hits + :step").param(":step", 5i64))
        .and_where("name", "=", "views")
        .compile(&db)
        .unwrap();
    assert_eq!(
        sql,
        "UPDATE `counters` SET `hits` = hits + 5 WHERE `name` = 'views'"
    );
}

#[test]
fn subquery_as_condition_value() {
    let db = mysql_db("xb_subquery", "");
    let newest = select().column(expr("MAX(id)")).from("users");
    let sql = select()
        .from("users")
        .and_where("id", "=", newest)
        .compile(&db)
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM `users` WHERE `id` = (SELECT MAX(id) FROM `users`)"
    );
}

#[test]
fn insert_select_round_trip_against_prefix() {
    let db = mysql_db("xb_insert_select", "log_");
    let sql = insert("archive")
        .columns(["id", "name"])
        .select(select().columns(["id", "name"]).from("users"))
        .compile(&db)
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO `log_archive` (`id`, `name`) SELECT `id`, `name` FROM `log_users`"
    );
}

#[test]
fn builders_can_be_reused_after_reset() {
    let db = mysql_db("xb_reuse", "");

    let mut q = delete("events").and_where("id", "=", 1i64);
    assert_eq!(
        q.compile(&db).unwrap(),
        "DELETE FROM `events` WHERE `id` = 1"
    );

    q.reset();
    assert_eq!(q.compile(&db).unwrap(), "DELETE FROM `events`");

    let q = q.and_where("id", "=", 2i64);
    assert_eq!(
        q.compile(&db).unwrap(),
        "DELETE FROM `events` WHERE `id` = 2"
    );
}

#[test]
fn update_reset_clears_parameters() {
    let db = mysql_db("xb_upd_reset", "");
    let mut q = update("t")
        .set("a", Value::Str(":a".into()))
        .param(":a", 1i64);
    assert_eq!(q.compile(&db).unwrap(), "UPDATE `t` SET `a` = :a");

    q.reset();
    // Without the declared key, ":a" is an ordinary string again.
    let q = q.set("a", Value::Str(":a".into()));
    assert_eq!(q.compile(&db).unwrap(), "UPDATE `t` SET `a` = ':a'");
}

#[test]
fn end_to_end_compile_shape() {
    let db = mysql_db("xb_endtoend", "");
    let q = select()
        .from("users")
        .and_where("id", "=", Value::Str("?".into()))
        .param(1usize, 5i64);
    assert_eq!(
        q.compile(&db).unwrap(),
        "SELECT * FROM `users` WHERE `id` = ?"
    );
}
