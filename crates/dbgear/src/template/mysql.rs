//! MySQL dialect templates.
//!
//! Check templates embed `:named` bind placeholders; the executor supplies
//! the values. DDL templates inline quoted identifiers only.

use crate::error::Result;
use crate::model::column::Column;
use crate::model::procedure::Procedure;

use super::{escape_literal, join_columns, quote_ident, RenderContext, TemplateRegistry};

/// Register the MySQL template set.
pub fn register(registry: &mut TemplateRegistry) {
    registry.add("create_table", create_table);
    registry.add("drop_table", drop_table);
    registry.add("check_table_exists", check_table_exists);
    registry.add("create_index", create_index);
    registry.add("drop_index", drop_index);
    registry.add("check_index_exists", check_index_exists);
    registry.add("insert_into", insert_into);
    registry.add("backup_table", backup_table);
    registry.add("restore_table", restore_table);
    registry.add("restore_table_update", restore_table_update);
    registry.add("check_backup_exists", check_backup_exists);
    registry.add("add_foreign_key", add_foreign_key);
    registry.add("drop_foreign_key", drop_foreign_key);
    registry.add("check_foreign_key_exists", check_foreign_key_exists);
    registry.add("create_view", create_view);
    registry.add("drop_view", drop_view);
    registry.add("create_or_replace_view", create_or_replace_view);
    registry.add("check_view_exists", check_view_exists);
    registry.add("get_view_definition", get_view_definition);
    registry.add("check_dependency_exists", check_dependency_exists);
    registry.add("check_view_dependency_exists", check_view_dependency_exists);
    registry.add("create_trigger", create_trigger);
    registry.add("drop_trigger", drop_trigger);
    registry.add("check_trigger_exists", check_trigger_exists);
    registry.add("create_procedure", create_procedure);
    registry.add("create_function", create_function);
    registry.add("drop_procedure", drop_procedure);
    registry.add("drop_function", drop_function);
    registry.add("check_procedure_exists", check_procedure_exists);
    registry.add("create_database", create_database);
    registry.add("drop_database", drop_database);
    registry.add("check_database_exists", check_database_exists);
}

fn qualify(env: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(env), quote_ident(name))
}

fn backup_name(table_name: &str, ymd: &str) -> String {
    format!("bak_{}_{}", table_name, ymd)
}

/// Type arguments: `(length)`, `(precision[, scale])`, or the item list of
/// an enumerated type.
fn type_args(column: &Column) -> String {
    let ct = &column.column_type;
    if let Some(length) = ct.length.filter(|l| *l > 0) {
        return format!("({})", length);
    }
    if let Some(precision) = ct.precision {
        return match ct.scale {
            Some(scale) => format!("({}, {})", precision, scale),
            None => format!("({})", precision),
        };
    }
    let items = ct.item_values();
    if !items.is_empty() {
        let quoted: Vec<String> = items
            .iter()
            .map(|v| format!("'{}'", escape_literal(v)))
            .collect();
        return format!("({})", quoted.join(", "));
    }
    String::new()
}

fn column_definition(column: &Column) -> String {
    let mut sql = format!(
        "{} {}{}",
        quote_ident(&column.column_name),
        column.column_type.base_type,
        type_args(column)
    );
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if column.auto_increment {
        sql.push_str(" AUTO_INCREMENT");
    }
    if let Some(expression) = &column.expression {
        sql.push_str(&format!(
            " GENERATED ALWAYS AS ({}) {}",
            expression,
            if column.stored { "STORED" } else { "VIRTUAL" }
        ));
    } else if let Some(default_value) = &column.default_value {
        sql.push_str(&format!(" DEFAULT {}", default_value));
    }
    if let Some(charset) = &column.charset {
        sql.push_str(&format!(" CHARACTER SET {}", charset));
    }
    if let Some(collation) = &column.collation {
        sql.push_str(&format!(" COLLATE {}", collation));
    }
    sql
}

fn create_table(ctx: &RenderContext) -> Result<String> {
    let env = ctx.env()?;
    let table = ctx.table()?;

    let mut lines: Vec<String> = table.columns.iter().map(column_definition).collect();

    let pk = table.pk_columns();
    if !pk.is_empty() {
        lines.push(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            quote_ident(&format!("{}_PKC", table.table_name)),
            join_columns(pk.iter().map(|c| c.column_name.as_str()))
        ));
    }

    let mut sql = format!(
        "CREATE TABLE {} (\n  {}\n)",
        qualify(env, &table.table_name),
        lines.join(",\n  ")
    );

    if let Some(options) = &table.dialect_options {
        if let Some(engine) = &options.engine {
            sql.push_str(&format!(" ENGINE={}", engine));
        }
        if let Some(charset) = &options.charset {
            sql.push_str(&format!(" DEFAULT CHARSET={}", charset));
        }
        if let Some(collation) = &options.collation {
            sql.push_str(&format!(" COLLATE={}", collation));
        }
        if let Some(auto_increment) = options.auto_increment {
            sql.push_str(&format!(" AUTO_INCREMENT={}", auto_increment));
        }
        if let Some(row_format) = &options.row_format {
            sql.push_str(&format!(" ROW_FORMAT={}", row_format));
        }
    }

    Ok(sql)
}

fn drop_table(ctx: &RenderContext) -> Result<String> {
    Ok(format!(
        "DROP TABLE {}",
        qualify(ctx.env()?, ctx.table_name()?)
    ))
}

fn check_table_exists(_ctx: &RenderContext) -> Result<String> {
    Ok("SELECT TABLE_NAME FROM information_schema.tables \
        WHERE table_schema = :env AND table_name = :table_name"
        .to_string())
}

fn create_index(ctx: &RenderContext) -> Result<String> {
    let env = ctx.env()?;
    let table = ctx.table()?;
    let index = ctx.index()?;
    let position = ctx.index_pos()?;

    let mut sql = String::from("CREATE ");
    if index.unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str("INDEX ");
    sql.push_str(&quote_ident(&index.effective_name(&table.table_name, position)));
    if index.index_type != "BTREE" {
        sql.push_str(&format!(" USING {}", index.index_type));
    }
    sql.push_str(&format!(
        " ON {} ({})",
        qualify(env, &table.table_name),
        join_columns(&index.columns)
    ));
    if let Some(condition) = &index.partial_condition {
        sql.push_str(&format!(" WHERE {}", condition));
    }
    Ok(sql)
}

fn drop_index(ctx: &RenderContext) -> Result<String> {
    let index_name = ctx
        .index_name
        .ok_or_else(|| super::missing_field("index_name"))?;
    Ok(format!(
        "DROP INDEX {} ON {}",
        quote_ident(index_name),
        qualify(ctx.env()?, ctx.table_name()?)
    ))
}

fn check_index_exists(_ctx: &RenderContext) -> Result<String> {
    Ok("SELECT INDEX_NAME FROM information_schema.statistics \
        WHERE table_schema = :env AND table_name = :table_name AND index_name = :index_name"
        .to_string())
}

fn insert_into(ctx: &RenderContext) -> Result<String> {
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualify(ctx.env()?, ctx.table_name()?),
        join_columns(ctx.column_names()?),
        ctx.value_placeholders()?.join(", ")
    ))
}

fn backup_table(ctx: &RenderContext) -> Result<String> {
    let env = ctx.env()?;
    let table_name = ctx.table_name()?;
    Ok(format!(
        "CREATE TABLE {} AS SELECT * FROM {}",
        qualify(env, &backup_name(table_name, ctx.ymd()?)),
        qualify(env, table_name)
    ))
}

fn restore_table(ctx: &RenderContext) -> Result<String> {
    let env = ctx.env()?;
    let table_name = ctx.table_name()?;
    Ok(format!(
        "INSERT IGNORE INTO {} SELECT * FROM {}",
        qualify(env, table_name),
        qualify(env, &backup_name(table_name, ctx.ymd()?))
    ))
}

fn restore_table_update(ctx: &RenderContext) -> Result<String> {
    let env = ctx.env()?;
    let table_name = ctx.table_name()?;
    Ok(format!(
        "REPLACE INTO {} SELECT * FROM {}",
        qualify(env, table_name),
        qualify(env, &backup_name(table_name, ctx.ymd()?))
    ))
}

fn check_backup_exists(_ctx: &RenderContext) -> Result<String> {
    Ok("SELECT TABLE_NAME FROM information_schema.tables \
        WHERE table_schema = :env AND table_name = :backup_table_name"
        .to_string())
}

fn add_foreign_key(ctx: &RenderContext) -> Result<String> {
    let env = ctx.env()?;
    let table = ctx.table()?;
    let relation = ctx.relation()?;
    let constraint_name = relation
        .constraint_name
        .as_deref()
        .ok_or_else(|| super::missing_field("relation.constraint_name"))?;

    let mut sql = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        qualify(env, &table.table_name),
        quote_ident(constraint_name),
        join_columns(relation.source_columns()),
        quote_ident(&relation.target.table_name),
        join_columns(relation.target_columns())
    );
    if relation.on_delete != "RESTRICT" {
        sql.push_str(&format!(" ON DELETE {}", relation.on_delete));
    }
    if relation.on_update != "RESTRICT" {
        sql.push_str(&format!(" ON UPDATE {}", relation.on_update));
    }
    Ok(sql)
}

fn drop_foreign_key(ctx: &RenderContext) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} DROP FOREIGN KEY {}",
        qualify(ctx.env()?, ctx.table_name()?),
        quote_ident(ctx.constraint_name()?)
    ))
}

fn check_foreign_key_exists(_ctx: &RenderContext) -> Result<String> {
    Ok("SELECT CONSTRAINT_NAME FROM information_schema.table_constraints \
        WHERE table_schema = :env AND table_name = :table_name \
        AND constraint_name = :constraint_name AND constraint_type = 'FOREIGN KEY'"
        .to_string())
}

fn create_view(ctx: &RenderContext) -> Result<String> {
    let view = ctx.view()?;
    Ok(format!(
        "CREATE VIEW {} AS\n{}",
        qualify(ctx.env()?, &view.view_name),
        view.select_statement
    ))
}

fn drop_view(ctx: &RenderContext) -> Result<String> {
    Ok(format!(
        "DROP VIEW IF EXISTS {}",
        qualify(ctx.env()?, ctx.view_name()?)
    ))
}

fn create_or_replace_view(ctx: &RenderContext) -> Result<String> {
    Ok(format!(
        "CREATE OR REPLACE VIEW {} AS\n{}",
        qualify(ctx.env()?, ctx.view_name()?),
        ctx.select_statement()?
    ))
}

fn check_view_exists(_ctx: &RenderContext) -> Result<String> {
    Ok("SELECT TABLE_NAME FROM information_schema.views \
        WHERE table_schema = :env AND table_name = :view_name"
        .to_string())
}

fn get_view_definition(_ctx: &RenderContext) -> Result<String> {
    Ok("SELECT VIEW_DEFINITION FROM information_schema.views \
        WHERE table_schema = :env AND table_name = :view_name"
        .to_string())
}

fn check_dependency_exists(_ctx: &RenderContext) -> Result<String> {
    Ok("SELECT TABLE_NAME FROM information_schema.tables \
        WHERE table_schema = :env AND table_name = :dependency_name"
        .to_string())
}

fn check_view_dependency_exists(_ctx: &RenderContext) -> Result<String> {
    Ok("SELECT TABLE_NAME FROM information_schema.views \
        WHERE table_schema = :env AND table_name = :dependency_name"
        .to_string())
}

fn create_trigger(ctx: &RenderContext) -> Result<String> {
    let env = ctx.env()?;
    let trigger = ctx.trigger()?;
    let mut sql = format!(
        "CREATE TRIGGER {}\n{} {} ON {}\nFOR EACH ROW\n",
        qualify(env, &trigger.trigger_name),
        trigger.timing,
        trigger.event,
        qualify(env, &trigger.table_name)
    );
    if let Some(condition) = &trigger.condition {
        sql.push_str(&format!("WHEN ({})\n", condition));
    }
    sql.push_str(&trigger.body);
    Ok(sql)
}

fn drop_trigger(ctx: &RenderContext) -> Result<String> {
    Ok(format!(
        "DROP TRIGGER IF EXISTS {}",
        qualify(ctx.env()?, ctx.trigger_name()?)
    ))
}

fn check_trigger_exists(_ctx: &RenderContext) -> Result<String> {
    Ok("SELECT TRIGGER_NAME FROM information_schema.triggers \
        WHERE trigger_schema = :env AND trigger_name = :trigger_name"
        .to_string())
}

fn routine_traits(procedure: &Procedure) -> String {
    let mut sql = String::new();
    if procedure.deterministic {
        sql.push_str("DETERMINISTIC");
    } else {
        sql.push_str("NOT DETERMINISTIC");
    }
    if procedure.reads_sql_data {
        sql.push_str(" READS SQL DATA");
    }
    if procedure.modifies_sql_data {
        sql.push_str(" MODIFIES SQL DATA");
    }
    sql.push_str(&format!(" SQL SECURITY {}", procedure.security_type));
    sql
}

fn create_procedure(ctx: &RenderContext) -> Result<String> {
    let env = ctx.env()?;
    let procedure = ctx.procedure()?;
    let params: Vec<String> = procedure
        .parameters
        .iter()
        .map(|p| {
            let mut sql = format!("{} {} {}", p.direction, quote_ident(&p.name), p.data_type);
            if let Some(default_value) = &p.default_value {
                sql.push_str(&format!(" DEFAULT {}", default_value));
            }
            sql
        })
        .collect();

    Ok(format!(
        "CREATE PROCEDURE {}({})\n{}\nBEGIN\n{}\nEND",
        qualify(env, &procedure.procedure_name),
        params.join(", "),
        routine_traits(procedure),
        procedure.body
    ))
}

fn create_function(ctx: &RenderContext) -> Result<String> {
    let env = ctx.env()?;
    let procedure = ctx.procedure()?;
    let return_type = procedure
        .return_type
        .as_deref()
        .ok_or_else(|| super::missing_field("procedure.return_type"))?;
    let params: Vec<String> = procedure
        .parameters
        .iter()
        .map(|p| format!("{} {}", quote_ident(&p.name), p.data_type))
        .collect();

    Ok(format!(
        "CREATE FUNCTION {}({})\nRETURNS {}\n{}\nBEGIN\n{}\nEND",
        qualify(env, &procedure.procedure_name),
        params.join(", "),
        return_type,
        routine_traits(procedure),
        procedure.body
    ))
}

fn drop_procedure(ctx: &RenderContext) -> Result<String> {
    Ok(format!(
        "DROP PROCEDURE IF EXISTS {}",
        qualify(ctx.env()?, ctx.procedure_name()?)
    ))
}

fn drop_function(ctx: &RenderContext) -> Result<String> {
    Ok(format!(
        "DROP FUNCTION IF EXISTS {}",
        qualify(ctx.env()?, ctx.procedure_name()?)
    ))
}

fn check_procedure_exists(_ctx: &RenderContext) -> Result<String> {
    Ok("SELECT ROUTINE_NAME FROM information_schema.routines \
        WHERE routine_schema = :env AND routine_name = :procedure_name \
        AND routine_type = :routine_type"
        .to_string())
}

fn create_database(ctx: &RenderContext) -> Result<String> {
    let mut sql = format!("CREATE DATABASE {}", quote_ident(ctx.database_name()?));
    if let Some(charset) = ctx.charset {
        sql.push_str(&format!(" DEFAULT CHARACTER SET {}", charset));
    }
    if let Some(collation) = ctx.collation {
        sql.push_str(&format!(" COLLATE {}", collation));
    }
    Ok(sql)
}

fn drop_database(ctx: &RenderContext) -> Result<String> {
    Ok(format!("DROP DATABASE {}", quote_ident(ctx.database_name()?)))
}

fn check_database_exists(_ctx: &RenderContext) -> Result<String> {
    Ok("SHOW DATABASES LIKE :database_name".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::column::testutil::column;
    use crate::model::index::Index;
    use crate::model::procedure::{ParamDirection, ProcedureParameter, SecurityType};
    use crate::model::relation::testutil::relation;
    use crate::model::table::testutil::users_table;
    use crate::model::table::DialectOptions;
    use crate::model::trigger::{Trigger, TriggerEvent, TriggerTiming};
    use crate::model::view::View;

    fn registry() -> TemplateRegistry {
        TemplateRegistry::mysql()
    }

    #[test]
    fn test_create_table_users() {
        let table = users_table();
        let ctx = RenderContext {
            env: Some("app"),
            table: Some(&table),
            ..Default::default()
        };
        let sql = registry().render("create_table", &ctx).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE `app`.`users` (\n  \
             `id` BIGINT NOT NULL AUTO_INCREMENT,\n  \
             `name` VARCHAR(100),\n  \
             CONSTRAINT `users_PKC` PRIMARY KEY (`id`)\n)"
        );
    }

    #[test]
    fn test_create_table_generated_and_default_columns() {
        let mut table = users_table();
        let mut total = column("total", "BIGINT");
        total.expression = Some("price * quantity".to_string());
        total.stored = true;
        let mut status = column("status", "VARCHAR");
        status.column_type.length = Some(20);
        status.default_value = Some("'new'".to_string());
        table.columns.push(total);
        table.columns.push(status);

        let ctx = RenderContext {
            env: Some("app"),
            table: Some(&table),
            ..Default::default()
        };
        let sql = registry().render("create_table", &ctx).unwrap();
        assert!(sql.contains("`total` BIGINT GENERATED ALWAYS AS (price * quantity) STORED"));
        assert!(sql.contains("`status` VARCHAR(20) DEFAULT 'new'"));
    }

    #[test]
    fn test_create_table_enum_and_dialect_options() {
        let mut table = users_table();
        let mut state = column("state", "ENUM");
        state.column_type.column_type = "ENUM('active','closed')".to_string();
        state.column_type.items = Some(vec![
            crate::model::column_type::ColumnTypeItem::from_value("active"),
            crate::model::column_type::ColumnTypeItem::from_value("closed"),
        ]);
        table.columns.push(state);
        table.dialect_options = Some(DialectOptions {
            engine: Some("InnoDB".to_string()),
            charset: Some("utf8mb4".to_string()),
            collation: None,
            auto_increment: Some(100),
            row_format: Some("DYNAMIC".to_string()),
        });

        let ctx = RenderContext {
            env: Some("app"),
            table: Some(&table),
            ..Default::default()
        };
        let sql = registry().render("create_table", &ctx).unwrap();
        assert!(sql.contains("`state` ENUM('active', 'closed')"));
        assert!(sql.ends_with(
            ") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 AUTO_INCREMENT=100 ROW_FORMAT=DYNAMIC"
        ));
    }

    #[test]
    fn test_create_index_synthesized_name() {
        let table = users_table();
        let index = Index {
            index_name: None,
            columns: vec!["name".to_string()],
            index_type: "BTREE".to_string(),
            unique: false,
            partial_condition: None,
            include_columns: None,
            storage_parameters: None,
            tablespace: None,
            notes: vec![],
        };
        let ctx = RenderContext {
            env: Some("app"),
            table: Some(&table),
            index: Some(&index),
            index_pos: Some(0),
            ..Default::default()
        };
        let sql = registry().render("create_index", &ctx).unwrap();
        assert_eq!(sql, "CREATE INDEX `users_IX0` ON `app`.`users` (`name`)");
    }

    #[test]
    fn test_create_index_unique_hash_partial() {
        let table = users_table();
        let index = Index {
            index_name: Some("users_by_name".to_string()),
            columns: vec!["name".to_string()],
            index_type: "HASH".to_string(),
            unique: true,
            partial_condition: Some("name IS NOT NULL".to_string()),
            include_columns: None,
            storage_parameters: None,
            tablespace: None,
            notes: vec![],
        };
        let ctx = RenderContext {
            env: Some("app"),
            table: Some(&table),
            index: Some(&index),
            index_pos: Some(2),
            ..Default::default()
        };
        let sql = registry().render("create_index", &ctx).unwrap();
        assert_eq!(
            sql,
            "CREATE UNIQUE INDEX `users_by_name` USING HASH \
             ON `app`.`users` (`name`) WHERE name IS NOT NULL"
        );
    }

    #[test]
    fn test_insert_into_splices_placeholders() {
        let columns = vec!["id".to_string(), "name".to_string(), "created_at".to_string()];
        let placeholders = vec![":id".to_string(), ":name".to_string(), "NOW()".to_string()];
        let ctx = RenderContext {
            env: Some("app"),
            table_name: Some("users"),
            column_names: Some(&columns),
            value_placeholders: Some(&placeholders),
            ..Default::default()
        };
        let sql = registry().render("insert_into", &ctx).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `app`.`users` (`id`, `name`, `created_at`) VALUES (:id, :name, NOW())"
        );
    }

    #[test]
    fn test_backup_restore_family() {
        let ctx = RenderContext {
            env: Some("app"),
            table_name: Some("users"),
            ymd: Some("20240101000000"),
            ..Default::default()
        };
        assert_eq!(
            registry().render("backup_table", &ctx).unwrap(),
            "CREATE TABLE `app`.`bak_users_20240101000000` AS SELECT * FROM `app`.`users`"
        );
        assert_eq!(
            registry().render("restore_table", &ctx).unwrap(),
            "INSERT IGNORE INTO `app`.`users` SELECT * FROM `app`.`bak_users_20240101000000`"
        );
        assert_eq!(
            registry().render("restore_table_update", &ctx).unwrap(),
            "REPLACE INTO `app`.`users` SELECT * FROM `app`.`bak_users_20240101000000`"
        );
    }

    #[test]
    fn test_add_foreign_key_emits_non_default_actions() {
        let table = users_table();
        let mut rel = relation("main", "roles", "role_id", "id");
        rel.constraint_name = Some("fk_users_role".to_string());
        rel.on_delete = "CASCADE".to_string();
        let ctx = RenderContext {
            env: Some("app"),
            table: Some(&table),
            relation: Some(&rel),
            ..Default::default()
        };
        let sql = registry().render("add_foreign_key", &ctx).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE `app`.`users` ADD CONSTRAINT `fk_users_role` \
             FOREIGN KEY (`role_id`) REFERENCES `roles` (`id`) ON DELETE CASCADE"
        );
    }

    #[test]
    fn test_add_foreign_key_requires_constraint_name() {
        let table = users_table();
        let rel = relation("main", "roles", "role_id", "id");
        let ctx = RenderContext {
            env: Some("app"),
            table: Some(&table),
            relation: Some(&rel),
            ..Default::default()
        };
        assert!(registry().render("add_foreign_key", &ctx).is_err());
    }

    #[test]
    fn test_view_templates() {
        let view = View {
            view_name: "active_users".to_string(),
            display_name: "Active Users".to_string(),
            select_statement: "SELECT * FROM users WHERE active = 1".to_string(),
            depends_on: vec![],
            notes: vec![],
        };
        let ctx = RenderContext {
            env: Some("app"),
            view: Some(&view),
            view_name: Some("active_users"),
            select_statement: Some(&view.select_statement),
            ..Default::default()
        };
        assert_eq!(
            registry().render("create_view", &ctx).unwrap(),
            "CREATE VIEW `app`.`active_users` AS\nSELECT * FROM users WHERE active = 1"
        );
        assert_eq!(
            registry().render("drop_view", &ctx).unwrap(),
            "DROP VIEW IF EXISTS `app`.`active_users`"
        );
        assert!(registry()
            .render("create_or_replace_view", &ctx)
            .unwrap()
            .starts_with("CREATE OR REPLACE VIEW"));
    }

    #[test]
    fn test_create_trigger_with_condition() {
        let trigger = Trigger {
            trigger_name: "users_audit".to_string(),
            display_name: "Audit".to_string(),
            table_name: "users".to_string(),
            timing: TriggerTiming::After,
            event: TriggerEvent::Update,
            condition: Some("NEW.name <> OLD.name".to_string()),
            body: "INSERT INTO audit_log (user_id) VALUES (NEW.id);".to_string(),
            notes: vec![],
        };
        let ctx = RenderContext {
            env: Some("app"),
            trigger: Some(&trigger),
            ..Default::default()
        };
        let sql = registry().render("create_trigger", &ctx).unwrap();
        assert!(sql.starts_with("CREATE TRIGGER `app`.`users_audit`\nAFTER UPDATE ON `app`.`users`"));
        assert!(sql.contains("FOR EACH ROW"));
        assert!(sql.contains("WHEN (NEW.name <> OLD.name)"));
        assert!(sql.ends_with("INSERT INTO audit_log (user_id) VALUES (NEW.id);"));
    }

    fn sample_procedure(return_type: Option<&str>) -> crate::model::procedure::Procedure {
        crate::model::procedure::Procedure {
            procedure_name: "user_total".to_string(),
            display_name: "User total".to_string(),
            parameters: vec![ProcedureParameter {
                name: "uid".to_string(),
                direction: ParamDirection::In,
                data_type: "BIGINT".to_string(),
                default_value: None,
            }],
            return_type: return_type.map(str::to_string),
            body: "SELECT 1;".to_string(),
            language: "SQL".to_string(),
            deterministic: true,
            reads_sql_data: true,
            modifies_sql_data: false,
            security_type: SecurityType::Invoker,
            notes: vec![],
        }
    }

    #[test]
    fn test_create_procedure() {
        let procedure = sample_procedure(None);
        let ctx = RenderContext {
            env: Some("app"),
            procedure: Some(&procedure),
            ..Default::default()
        };
        let sql = registry().render("create_procedure", &ctx).unwrap();
        assert!(sql.starts_with("CREATE PROCEDURE `app`.`user_total`(IN `uid` BIGINT)"));
        assert!(sql.contains("DETERMINISTIC READS SQL DATA SQL SECURITY INVOKER"));
        assert!(sql.contains("BEGIN\nSELECT 1;\nEND"));
    }

    #[test]
    fn test_create_function_requires_return_type() {
        let procedure = sample_procedure(Some("DECIMAL(10,2)"));
        let ctx = RenderContext {
            env: Some("app"),
            procedure: Some(&procedure),
            ..Default::default()
        };
        let sql = registry().render("create_function", &ctx).unwrap();
        assert!(sql.contains("RETURNS DECIMAL(10,2)"));
        assert!(!sql.contains("IN `uid`"));

        let no_return = sample_procedure(None);
        let ctx = RenderContext {
            env: Some("app"),
            procedure: Some(&no_return),
            ..Default::default()
        };
        assert!(registry().render("create_function", &ctx).is_err());
    }

    #[test]
    fn test_database_templates() {
        let ctx = RenderContext {
            database_name: Some("app"),
            charset: Some("utf8mb4"),
            collation: Some("utf8mb4_unicode_ci"),
            ..Default::default()
        };
        assert_eq!(
            registry().render("create_database", &ctx).unwrap(),
            "CREATE DATABASE `app` DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci"
        );
        assert_eq!(
            registry().render("drop_database", &ctx).unwrap(),
            "DROP DATABASE `app`"
        );
        assert_eq!(
            registry().render("check_database_exists", &ctx).unwrap(),
            "SHOW DATABASES LIKE :database_name"
        );
    }

    #[test]
    fn test_check_templates_bind_placeholders() {
        let ctx = RenderContext::new();
        for name in [
            "check_table_exists",
            "check_backup_exists",
            "check_view_exists",
            "check_trigger_exists",
            "check_procedure_exists",
            "check_foreign_key_exists",
            "check_index_exists",
            "check_dependency_exists",
            "check_view_dependency_exists",
            "get_view_definition",
        ] {
            let sql = registry().render(name, &ctx).unwrap();
            assert!(sql.contains(":env") || sql.contains(":database_name"), "{}", name);
        }
    }

    #[test]
    fn test_drop_statements() {
        let ctx = RenderContext {
            env: Some("app"),
            table_name: Some("users"),
            trigger_name: Some("t"),
            procedure_name: Some("p"),
            constraint_name: Some("fk"),
            index_name: Some("users_IX0"),
            ..Default::default()
        };
        assert_eq!(
            registry().render("drop_table", &ctx).unwrap(),
            "DROP TABLE `app`.`users`"
        );
        assert_eq!(
            registry().render("drop_trigger", &ctx).unwrap(),
            "DROP TRIGGER IF EXISTS `app`.`t`"
        );
        assert_eq!(
            registry().render("drop_procedure", &ctx).unwrap(),
            "DROP PROCEDURE IF EXISTS `app`.`p`"
        );
        assert_eq!(
            registry().render("drop_function", &ctx).unwrap(),
            "DROP FUNCTION IF EXISTS `app`.`p`"
        );
        assert_eq!(
            registry().render("drop_foreign_key", &ctx).unwrap(),
            "ALTER TABLE `app`.`users` DROP FOREIGN KEY `fk`"
        );
        assert_eq!(
            registry().render("drop_index", &ctx).unwrap(),
            "DROP INDEX `users_IX0` ON `app`.`users`"
        );
    }
}
