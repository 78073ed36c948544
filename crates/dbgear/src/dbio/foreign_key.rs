//! Foreign-key constraint operations, keyed by constraint name.
//!
//! Foreign keys are never part of `CREATE TABLE`; they are added by a
//! separate `ALTER TABLE ... ADD CONSTRAINT` after table creation.

use mysql_async::{params, Params};

use crate::error::Result;
use crate::model::relation::Relation;
use crate::model::table::Table;
use crate::template::{RenderContext, TemplateRegistry};

use super::DbConn;

pub async fn is_exist(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table_name: &str,
    constraint_name: &str,
) -> Result<bool> {
    let sql = reg.render("check_foreign_key_exists", &RenderContext::new())?;
    conn.is_exist(
        &sql,
        params! {
            "env" => env,
            "table_name" => table_name,
            "constraint_name" => constraint_name,
        },
    )
    .await
}

pub async fn add(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
    relation: &Relation,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        table: Some(table),
        relation: Some(relation),
        ..Default::default()
    };
    let sql = reg.render("add_foreign_key", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}

pub async fn drop(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table_name: &str,
    constraint_name: &str,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        table_name: Some(table_name),
        constraint_name: Some(constraint_name),
        ..Default::default()
    };
    let sql = reg.render("drop_foreign_key", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}
