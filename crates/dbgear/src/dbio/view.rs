//! View operations.

use mysql_async::{params, Params};

use crate::error::{DbGearError, Result};
use crate::model::view::View;
use crate::template::{RenderContext, TemplateRegistry};

use super::DbConn;

pub async fn is_exist(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    view: &View,
) -> Result<bool> {
    let sql = reg.render("check_view_exists", &RenderContext::new())?;
    conn.is_exist(
        &sql,
        params! { "env" => env, "view_name" => view.view_name.as_str() },
    )
    .await
}

pub async fn create(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    view: &View,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        view: Some(view),
        ..Default::default()
    };
    let sql = reg.render("create_view", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}

pub async fn drop(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    view: &View,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        view_name: Some(&view.view_name),
        ..Default::default()
    };
    let sql = reg.render("drop_view", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}

pub async fn create_or_replace(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    view: &View,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        view_name: Some(&view.view_name),
        select_statement: Some(&view.select_statement),
        ..Default::default()
    };
    let sql = reg.render("create_or_replace_view", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}

/// The live definition of a view, if present.
pub async fn get_view_definition(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    view_name: &str,
) -> Result<Option<String>> {
    let sql = reg.render("get_view_definition", &RenderContext::new())?;
    let row = conn
        .select_first(&sql, params! { "env" => env, "view_name" => view_name })
        .await?;
    Ok(row.and_then(|r| r.get(0)))
}

/// Check that every declared dependency of the view exists as a table or a
/// view before creating it.
pub async fn validate_dependencies(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    view: &View,
) -> Result<()> {
    for dependency in &view.depends_on {
        let table_sql = reg.render("check_dependency_exists", &RenderContext::new())?;
        let table_exists = conn
            .is_exist(
                &table_sql,
                params! { "env" => env, "dependency_name" => dependency.as_str() },
            )
            .await?;
        if table_exists {
            continue;
        }
        let view_sql = reg.render("check_view_dependency_exists", &RenderContext::new())?;
        let view_exists = conn
            .is_exist(
                &view_sql,
                params! { "env" => env, "dependency_name" => dependency.as_str() },
            )
            .await?;
        if !view_exists {
            return Err(DbGearError::validation(format!(
                "dependency '{}' not found for view '{}'",
                dependency, view.view_name
            )));
        }
    }
    Ok(())
}
