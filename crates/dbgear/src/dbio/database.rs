//! Database-level operations.

use mysql_async::{params, Params};

use crate::error::Result;
use crate::template::{RenderContext, TemplateRegistry};

use super::DbConn;

pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_COLLATION: &str = "utf8mb4_unicode_ci";

pub async fn is_exist(conn: &mut DbConn, reg: &TemplateRegistry, database: &str) -> Result<bool> {
    let sql = reg.render("check_database_exists", &RenderContext::new())?;
    conn.is_exist(&sql, params! { "database_name" => database }).await
}

pub async fn create(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    database: &str,
    charset: Option<&str>,
    collation: Option<&str>,
) -> Result<()> {
    let ctx = RenderContext {
        database_name: Some(database),
        charset: Some(charset.unwrap_or(DEFAULT_CHARSET)),
        collation: Some(collation.unwrap_or(DEFAULT_COLLATION)),
        ..Default::default()
    };
    let sql = reg.render("create_database", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}

pub async fn drop(conn: &mut DbConn, reg: &TemplateRegistry, database: &str) -> Result<()> {
    let ctx = RenderContext {
        database_name: Some(database),
        ..Default::default()
    };
    let sql = reg.render("drop_database", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}
