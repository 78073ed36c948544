//! Stored procedure and function operations.

use mysql_async::{params, Params};

use crate::error::Result;
use crate::model::procedure::Procedure;
use crate::template::{RenderContext, TemplateRegistry};

use super::DbConn;

pub async fn is_exist(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    procedure: &Procedure,
) -> Result<bool> {
    let sql = reg.render("check_procedure_exists", &RenderContext::new())?;
    let routine_type = if procedure.is_function() {
        "FUNCTION"
    } else {
        "PROCEDURE"
    };
    conn.is_exist(
        &sql,
        params! {
            "env" => env,
            "procedure_name" => procedure.procedure_name.as_str(),
            "routine_type" => routine_type,
        },
    )
    .await
}

pub async fn create(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    procedure: &Procedure,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        procedure: Some(procedure),
        ..Default::default()
    };
    let template = if procedure.is_function() {
        "create_function"
    } else {
        "create_procedure"
    };
    let sql = reg.render(template, &ctx)?;
    conn.execute(&sql, Params::Empty).await
}

pub async fn drop(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    procedure: &Procedure,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        procedure_name: Some(&procedure.procedure_name),
        ..Default::default()
    };
    let template = if procedure.is_function() {
        "drop_function"
    } else {
        "drop_procedure"
    };
    let sql = reg.render(template, &ctx)?;
    conn.execute(&sql, Params::Empty).await
}
