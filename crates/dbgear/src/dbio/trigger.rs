//! Trigger operations.

use mysql_async::{params, Params};

use crate::error::Result;
use crate::model::trigger::Trigger;
use crate::template::{RenderContext, TemplateRegistry};

use super::DbConn;

pub async fn is_exist(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    trigger: &Trigger,
) -> Result<bool> {
    let sql = reg.render("check_trigger_exists", &RenderContext::new())?;
    conn.is_exist(
        &sql,
        params! { "env" => env, "trigger_name" => trigger.trigger_name.as_str() },
    )
    .await
}

pub async fn create(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    trigger: &Trigger,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        trigger: Some(trigger),
        ..Default::default()
    };
    let sql = reg.render("create_trigger", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}

pub async fn drop(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    trigger: &Trigger,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        trigger_name: Some(&trigger.trigger_name),
        ..Default::default()
    };
    let sql = reg.render("drop_trigger", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}
