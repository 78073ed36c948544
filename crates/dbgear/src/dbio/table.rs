//! Table operations: DDL, fixture inserts, backup and restore.

use mysql_async::{params, Params};
use tracing::warn;

use crate::datasource::{Row, RowValue};
use crate::error::{DbGearError, Result};
use crate::model::table::Table;
use crate::template::{RenderContext, TemplateRegistry};

use super::DbConn;

pub async fn is_exist(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
) -> Result<bool> {
    let sql = reg.render("check_table_exists", &RenderContext::new())?;
    conn.is_exist(
        &sql,
        params! { "env" => env, "table_name" => table.table_name.as_str() },
    )
    .await
}

pub async fn create(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        table: Some(table),
        ..Default::default()
    };
    let sql = reg.render("create_table", &ctx)?;
    conn.execute(&sql, Params::Empty).await?;
    create_indexes(conn, reg, env, table).await
}

pub async fn drop(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        table_name: Some(&table.table_name),
        ..Default::default()
    };
    let sql = reg.render("drop_table", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}

/// Create every secondary index, preserving declared order.
pub async fn create_indexes(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
) -> Result<()> {
    for (position, index) in table.indexes.iter().enumerate() {
        let ctx = RenderContext {
            env: Some(env),
            table: Some(table),
            index: Some(index),
            index_pos: Some(position),
            ..Default::default()
        };
        let sql = reg.render("create_index", &ctx)?;
        conn.execute(&sql, Params::Empty).await?;
    }
    Ok(())
}

/// Drop every secondary index that exists, preserving declared order.
pub async fn drop_indexes(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
) -> Result<()> {
    for (position, index) in table.indexes.iter().enumerate() {
        let name = index.effective_name(&table.table_name, position);
        let check = reg.render("check_index_exists", &RenderContext::new())?;
        let exists = conn
            .is_exist(
                &check,
                params! {
                    "env" => env,
                    "table_name" => table.table_name.as_str(),
                    "index_name" => name.as_str(),
                },
            )
            .await?;
        if !exists {
            continue;
        }
        let ctx = RenderContext {
            env: Some(env),
            table_name: Some(&table.table_name),
            index_name: Some(&name),
            ..Default::default()
        };
        let sql = reg.render("drop_index", &ctx)?;
        conn.execute(&sql, Params::Empty).await?;
    }
    Ok(())
}

pub async fn recreate_indexes(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
) -> Result<()> {
    drop_indexes(conn, reg, env, table).await?;
    create_indexes(conn, reg, env, table).await
}

/// Insert fixture rows in one batch, committing unless dryrun.
///
/// Generated columns are never named; the column list and placeholders are
/// derived from the first row, with SQL fragments spliced verbatim.
pub async fn insert(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
    rows: &[Row],
) -> Result<()> {
    if rows.is_empty() {
        warn!("no rows to insert into {}.{}", env, table.table_name);
        return Ok(());
    }

    let statement = InsertStatement::build(table, rows)?;
    let ctx = RenderContext {
        env: Some(env),
        table_name: Some(&table.table_name),
        column_names: Some(&statement.column_names),
        value_placeholders: Some(&statement.placeholders),
        ..Default::default()
    };
    let sql = reg.render("insert_into", &ctx)?;
    conn.execute_batch(&sql, statement.params).await?;
    conn.commit().await
}

/// The pure half of [`insert`]: column list, placeholder list, and one
/// parameter set per row.
pub(crate) struct InsertStatement {
    pub column_names: Vec<String>,
    pub placeholders: Vec<String>,
    pub params: Vec<Params>,
}

impl InsertStatement {
    pub(crate) fn build(table: &Table, rows: &[Row]) -> Result<Self> {
        let insertable: Vec<_> = table.columns.iter().filter(|c| !c.is_generated()).collect();

        let first = &rows[0];
        let mut column_names = Vec::with_capacity(insertable.len());
        let mut placeholders = Vec::with_capacity(insertable.len());
        let mut bound: Vec<&str> = Vec::new();
        for column in &insertable {
            let name = column.column_name.as_str();
            let value = first.get(name).ok_or_else(|| {
                DbGearError::validation(format!(
                    "table {}: column '{}' not found in row",
                    table.table_name, name
                ))
            })?;
            column_names.push(name.to_string());
            match value {
                RowValue::SqlFragment(fragment) => placeholders.push(fragment.clone()),
                _ => {
                    placeholders.push(format!(":{}", name));
                    bound.push(name);
                }
            }
        }

        let mut params = Vec::with_capacity(rows.len());
        for row in rows {
            let mut pairs = Vec::with_capacity(bound.len());
            for name in &bound {
                let value = row.get(*name).ok_or_else(|| {
                    DbGearError::validation(format!(
                        "table {}: column '{}' not found in row",
                        table.table_name, name
                    ))
                })?;
                pairs.push((name.to_string(), value.to_bind_value()?));
            }
            params.push(Params::from(pairs));
        }

        Ok(Self {
            column_names,
            placeholders,
            params,
        })
    }
}

pub async fn backup(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
    ymd: &str,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        table_name: Some(&table.table_name),
        ymd: Some(ymd),
        ..Default::default()
    };
    let sql = reg.render("backup_table", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}

pub async fn restore(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
    ymd: &str,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        table_name: Some(&table.table_name),
        ymd: Some(ymd),
        ..Default::default()
    };
    let sql = reg.render("restore_table", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}

pub async fn restore_update(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
    ymd: &str,
) -> Result<()> {
    let ctx = RenderContext {
        env: Some(env),
        table_name: Some(&table.table_name),
        ymd: Some(ymd),
        ..Default::default()
    };
    let sql = reg.render("restore_table_update", &ctx)?;
    conn.execute(&sql, Params::Empty).await
}

pub async fn is_exist_backup(
    conn: &mut DbConn,
    reg: &TemplateRegistry,
    env: &str,
    table: &Table,
    ymd: &str,
) -> Result<bool> {
    let sql = reg.render("check_backup_exists", &RenderContext::new())?;
    let backup_table_name = format!("bak_{}_{}", table.table_name, ymd);
    conn.is_exist(
        &sql,
        params! { "env" => env, "backup_table_name" => backup_table_name },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::column::testutil::column;
    use crate::model::table::testutil::users_table;

    fn row(pairs: &[(&str, RowValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_build_insert_names_and_placeholders() {
        let table = users_table();
        let rows = vec![row(&[
            ("id", RowValue::Int(1)),
            ("name", RowValue::Str("Alice".to_string())),
        ])];
        let statement = InsertStatement::build(&table, &rows).unwrap();
        assert_eq!(statement.column_names, vec!["id", "name"]);
        assert_eq!(statement.placeholders, vec![":id", ":name"]);
        assert_eq!(statement.params.len(), 1);
    }

    #[test]
    fn test_build_insert_splices_fragments() {
        let mut table = users_table();
        table.columns.push(column("created_at", "DATETIME"));
        let rows = vec![row(&[
            ("id", RowValue::Int(1)),
            ("name", RowValue::Str("Alice".to_string())),
            ("created_at", RowValue::SqlFragment("NOW()".to_string())),
        ])];
        let statement = InsertStatement::build(&table, &rows).unwrap();
        assert_eq!(statement.placeholders, vec![":id", ":name", "NOW()"]);
        // The fragment column is not bound.
        match &statement.params[0] {
            Params::Named(map) => assert_eq!(map.len(), 2),
            other => panic!("expected named params, got {:?}", other),
        }
    }

    #[test]
    fn test_build_insert_skips_generated_columns() {
        let mut table = users_table();
        let mut total = column("total", "BIGINT");
        total.expression = Some("1 + 1".to_string());
        table.columns.push(total);
        let rows = vec![row(&[
            ("id", RowValue::Int(1)),
            ("name", RowValue::Str("Alice".to_string())),
            ("total", RowValue::Int(2)),
        ])];
        let statement = InsertStatement::build(&table, &rows).unwrap();
        assert!(!statement.column_names.contains(&"total".to_string()));
    }

    #[test]
    fn test_build_insert_missing_column_is_validation_error() {
        let table = users_table();
        let rows = vec![row(&[("id", RowValue::Int(1))])];
        assert!(matches!(
            InsertStatement::build(&table, &rows),
            Err(DbGearError::Validation(_))
        ));
    }

    #[test]
    fn test_build_insert_json_cell_binds_as_text() {
        let mut table = users_table();
        table.columns.push(column("meta", "JSON"));
        let rows = vec![row(&[
            ("id", RowValue::Int(1)),
            ("name", RowValue::Str("Alice".to_string())),
            ("meta", RowValue::Json(serde_json::json!({"a": 1}))),
        ])];
        let statement = InsertStatement::build(&table, &rows).unwrap();
        match &statement.params[0] {
            Params::Named(map) => {
                let value = map.get(&b"meta"[..].to_vec()).expect("meta bound");
                assert_eq!(
                    *value,
                    mysql_async::Value::Bytes(b"{\"a\":1}".to_vec())
                );
            }
            other => panic!("expected named params, got {:?}", other),
        }
    }
}
