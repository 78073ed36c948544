//! The apply engine: walks the mappings of an environment, composes the
//! effective schema, and drives DDL + fixture reconciliation against the
//! live database with the backup/restore policy.

pub mod patch;

use std::collections::HashSet;
use std::path::PathBuf;

use mysql_async::Params;
use tracing::{info, warn};

use crate::datasource::SourceRegistry;
use crate::dbio::{self, DbConn};
use crate::error::{DbGearError, Result};
use crate::model::datamodel::{DataModel, SyncMode};
use crate::model::environ::Environ;
use crate::model::mapping::Mapping;
use crate::model::project::Project;
use crate::model::schema::Schema;
use crate::model::trigger::Trigger;
use crate::resolver::DependencyResolver;
use crate::template::TemplateRegistry;

use patch::Patch;

/// Whole-database apply mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Drop and recreate the database before any DDL.
    Drop,
    /// Create the database only if absent, recreate objects in place.
    Delta,
}

impl std::str::FromStr for ApplyMode {
    type Err = DbGearError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "drop" => Ok(ApplyMode::Drop),
            "delta" => Ok(ApplyMode::Delta),
            other => Err(DbGearError::Config(format!(
                "apply mode must be 'drop' or 'delta', got '{}'",
                other
            ))),
        }
    }
}

/// Options controlling one apply run.
#[derive(Debug, Default)]
pub struct ApplyOptions {
    /// `Some(mode)` applies every object; `None` requires `target`.
    pub mode: Option<ApplyMode>,

    /// Limit work to one named table, view, trigger, or procedure.
    /// Ignored when `mode` is set.
    pub target: Option<String>,

    /// Skip both initial-data inserts and backup-restore steps.
    pub no_restore: bool,

    /// Skip table/view/trigger/procedure (re)creation.
    pub restore_only: bool,

    /// Only drop and recreate secondary indexes on the target table.
    pub index_only: bool,

    /// Restore the target from its backup table when it has no data-model.
    pub restore_backup: bool,

    /// Patch file for a selective restore of the target.
    pub patch: Option<PathBuf>,

    /// Override the run stamp (defaults to the current time).
    pub backup_key: Option<String>,

    /// Log rendered SQL instead of executing it.
    pub dryrun: bool,
}

/// One apply run: a connection held for its duration plus the loaded
/// configuration, treated as a read-only snapshot.
pub struct Operation<'a> {
    project: &'a Project,
    environ: Environ,
    database: Option<String>,
    templates: TemplateRegistry,
    sources: SourceRegistry,
    resolver: DependencyResolver,
    conn: DbConn,
    ymd: String,
}

impl std::fmt::Debug for Operation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("database", &self.database)
            .field("ymd", &self.ymd)
            .finish_non_exhaustive()
    }
}

impl<'a> Operation<'a> {
    /// Open a connection for the deployment and prepare the run.
    pub async fn connect(
        project: &'a Project,
        environ: &str,
        database: Option<&str>,
        deploy: &str,
        options: &ApplyOptions,
    ) -> Result<Operation<'a>> {
        let environ = Environ::load(&project.folder, environ)?;
        let url = environ.deployment_url(deploy)?.to_string();
        let conn = DbConn::connect(&url, options.dryrun).await?;
        let ymd = options
            .backup_key
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y%m%d%H%M%S").to_string());

        Ok(Operation {
            project,
            environ,
            database: database.map(str::to_string),
            templates: TemplateRegistry::mysql(),
            sources: SourceRegistry::standard(),
            resolver: DependencyResolver::new(),
            conn,
            ymd,
        })
    }

    /// The run stamp naming this run's backup tables.
    pub fn backup_key(&self) -> &str {
        &self.ymd
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await
    }

    /// Run the reconciliation over every selected mapping.
    pub async fn run(&mut self, options: &ApplyOptions) -> Result<()> {
        for mapping in self.selected_mappings()? {
            self.apply_mapping(&mapping, options).await?;
        }
        Ok(())
    }

    /// Drop and recreate every database with all DDL and no data.
    pub async fn reset_all(&mut self) -> Result<()> {
        let options = ApplyOptions {
            mode: Some(ApplyMode::Drop),
            no_restore: true,
            ..Default::default()
        };
        for mapping in self.selected_mappings()? {
            let schema = self.compose_schema(&mapping)?;
            self.create_database(&mapping, &options).await?;
            self.create_objects(mapping.instance_name(), &schema, &options)
                .await?;
        }
        Ok(())
    }

    /// Insert one table's fixture data (test-fixture convenience).
    pub async fn require(&mut self, schema_name: &str, table_name: &str) -> Result<()> {
        for mapping in self.selected_mappings()? {
            let schema = self.compose_schema(&mapping)?;
            let Some(model) = mapping.datamodel(schema_name, table_name)? else {
                continue;
            };
            let table = schema.tables.get(table_name).ok_or_else(|| {
                DbGearError::EntityNotFound(format!("table '{}' in composed schema", table_name))
            })?;
            let env = mapping.instance_name();
            for mut source in self.sources.sources_for(&model)? {
                if !source.exists() {
                    continue;
                }
                info!("insert {} to {}.{}", source.filename(), env, table.table_name);
                source.load()?;
                dbio::table::insert(&mut self.conn, &self.templates, env, table, source.rows())
                    .await?;
            }
        }
        Ok(())
    }

    fn selected_mappings(&self) -> Result<Vec<Mapping>> {
        let mut mappings = self.environ.databases()?;
        if let Some(database) = &self.database {
            mappings.retain(|m| m.instance_name() == database);
        }
        Ok(mappings)
    }

    fn compose_schema(&self, mapping: &Mapping) -> Result<Schema> {
        mapping.build_schema(self.project.schemas()?, self.environ.schemas()?)
    }

    async fn apply_mapping(&mut self, mapping: &Mapping, options: &ApplyOptions) -> Result<()> {
        let schema = self.compose_schema(mapping)?;
        let env = mapping.instance_name().to_string();

        if options.index_only {
            let target = options.target.as_deref().ok_or_else(|| {
                DbGearError::Config("index-only requires a target table".to_string())
            })?;
            let table = schema.tables.get(target).ok_or_else(|| {
                DbGearError::EntityNotFound(format!("table '{}' in composed schema", target))
            })?;
            info!("recreate indexes on {}.{}", env, target);
            return dbio::table::recreate_indexes(&mut self.conn, &self.templates, &env, table)
                .await;
        }

        // Resolve the insertion order up front so explicit dependency
        // cycles abort before any DDL runs.
        let ordered = self.ordered_datamodels(mapping, &schema, options)?;

        self.create_database(mapping, options).await?;

        if !options.restore_only {
            self.create_objects(&env, &schema, options).await?;
        }

        if !options.no_restore {
            self.insert_data(&env, &schema, &ordered, options).await?;

            if let Some(target) = options.target.as_deref() {
                let covered = ordered.iter().any(|dm| dm.table_name == target);
                if !covered {
                    self.restore_target(&env, &schema, target, options).await?;
                }
            }
        }

        Ok(())
    }

    fn ordered_datamodels(
        &self,
        mapping: &Mapping,
        schema: &Schema,
        options: &ApplyOptions,
    ) -> Result<Vec<DataModel>> {
        let models = mapping.datamodels()?;
        if options.mode.is_some() {
            for warning in self.resolver.validate_dependencies(&models, schema) {
                warn!("{}", warning);
            }
            self.resolver.resolve_insertion_order(models, schema)
        } else {
            let target = options.target.as_deref();
            Ok(models
                .into_iter()
                .filter(|dm| target == Some(dm.table_name.as_str()))
                .collect())
        }
    }

    async fn create_database(&mut self, mapping: &Mapping, options: &ApplyOptions) -> Result<()> {
        let name = mapping.instance_name();
        let charset = mapping.options.get("charset").map(String::as_str);
        let collation = mapping.options.get("collation").map(String::as_str);

        if options.mode == Some(ApplyMode::Drop) {
            info!("database {}", name);
            if dbio::database::is_exist(&mut self.conn, &self.templates, name).await? {
                dbio::database::drop(&mut self.conn, &self.templates, name).await?;
            }
            dbio::database::create(&mut self.conn, &self.templates, name, charset, collation)
                .await?;
        } else if !dbio::database::is_exist(&mut self.conn, &self.templates, name).await? {
            info!("database {} was created.", name);
            dbio::database::create(&mut self.conn, &self.templates, name, charset, collation)
                .await?;
        }
        Ok(())
    }

    async fn create_objects(
        &mut self,
        env: &str,
        schema: &Schema,
        options: &ApplyOptions,
    ) -> Result<()> {
        let all = options.mode.is_some();
        let target = options.target.as_deref();
        let mut recreated_triggers: HashSet<String> = HashSet::new();

        for table in schema.tables.values() {
            if !all && target != Some(table.table_name.as_str()) {
                continue;
            }
            if !dbio::table::is_exist(&mut self.conn, &self.templates, env, table).await? {
                info!("table {}.{} was created.", env, table.table_name);
                dbio::table::create(&mut self.conn, &self.templates, env, table).await?;
            } else {
                info!("backup {}.{}", env, table.table_name);
                dbio::table::backup(&mut self.conn, &self.templates, env, table, &self.ymd)
                    .await?;
                info!("drop & create table {}.{}", env, table.table_name);
                dbio::table::drop(&mut self.conn, &self.templates, env, table).await?;
                dbio::table::create(&mut self.conn, &self.templates, env, table).await?;
            }

            // Triggers on a recreated table go with it.
            for trigger in schema.triggers.values() {
                if trigger.table_name == table.table_name {
                    self.recreate_trigger(env, trigger).await?;
                    recreated_triggers.insert(trigger.trigger_name.clone());
                }
            }
        }

        // Foreign keys take the separate ALTER TABLE path once every table
        // of the run exists.
        for table in schema.tables.values() {
            if !all && target != Some(table.table_name.as_str()) {
                continue;
            }
            for relation in &table.relations {
                let Some(constraint_name) = relation.constraint_name.as_deref() else {
                    continue;
                };
                if dbio::foreign_key::is_exist(
                    &mut self.conn,
                    &self.templates,
                    env,
                    &table.table_name,
                    constraint_name,
                )
                .await?
                {
                    dbio::foreign_key::drop(
                        &mut self.conn,
                        &self.templates,
                        env,
                        &table.table_name,
                        constraint_name,
                    )
                    .await?;
                }
                info!("add foreign key {}.{}", table.table_name, constraint_name);
                dbio::foreign_key::add(&mut self.conn, &self.templates, env, table, relation)
                    .await?;
            }
        }

        for view in schema.views.values() {
            if !all && target != Some(view.view_name.as_str()) {
                continue;
            }
            dbio::view::validate_dependencies(&mut self.conn, &self.templates, env, view).await?;
            if !dbio::view::is_exist(&mut self.conn, &self.templates, env, view).await? {
                info!("view {}.{} was created.", env, view.view_name);
            } else {
                info!("drop & create view {}.{}", env, view.view_name);
                dbio::view::drop(&mut self.conn, &self.templates, env, view).await?;
            }
            dbio::view::create(&mut self.conn, &self.templates, env, view).await?;
        }

        for trigger in schema.triggers.values() {
            if recreated_triggers.contains(&trigger.trigger_name) {
                continue;
            }
            if !all && target != Some(trigger.trigger_name.as_str()) {
                continue;
            }
            self.recreate_trigger(env, trigger).await?;
        }

        for procedure in schema.procedures.values() {
            if !all && target != Some(procedure.procedure_name.as_str()) {
                continue;
            }
            if !dbio::procedure::is_exist(&mut self.conn, &self.templates, env, procedure).await? {
                info!("procedure {}.{} was created.", env, procedure.procedure_name);
            } else {
                info!("drop & create procedure {}.{}", env, procedure.procedure_name);
                dbio::procedure::drop(&mut self.conn, &self.templates, env, procedure).await?;
            }
            dbio::procedure::create(&mut self.conn, &self.templates, env, procedure).await?;
        }

        Ok(())
    }

    async fn recreate_trigger(&mut self, env: &str, trigger: &Trigger) -> Result<()> {
        if !dbio::trigger::is_exist(&mut self.conn, &self.templates, env, trigger).await? {
            info!("trigger {}.{} was created.", env, trigger.trigger_name);
        } else {
            info!("drop & create trigger {}.{}", env, trigger.trigger_name);
            dbio::trigger::drop(&mut self.conn, &self.templates, env, trigger).await?;
        }
        dbio::trigger::create(&mut self.conn, &self.templates, env, trigger).await
    }

    async fn insert_data(
        &mut self,
        env: &str,
        schema: &Schema,
        ordered: &[DataModel],
        options: &ApplyOptions,
    ) -> Result<()> {
        let all = options.mode.is_some();

        for model in ordered {
            // Hand-maintained tables stay untouched on whole-database runs;
            // individual targeting still processes them.
            if all && model.sync_mode == SyncMode::Manual {
                continue;
            }
            let table = schema.tables.get(&model.table_name).ok_or_else(|| {
                DbGearError::validation(format!(
                    "data-model {} has no table in the composed schema",
                    model.key()
                ))
            })?;

            for mut source in self.sources.sources_for(model)? {
                info!("insert {} to {}.{}", source.filename(), env, table.table_name);
                source.load()?;
                dbio::table::insert(&mut self.conn, &self.templates, env, table, source.rows())
                    .await?;
            }

            if model.sync_mode != SyncMode::DropCreate
                && dbio::table::is_exist_backup(
                    &mut self.conn,
                    &self.templates,
                    env,
                    table,
                    &self.ymd,
                )
                .await?
            {
                info!("restore {}.{}", env, table.table_name);
                match model.sync_mode {
                    SyncMode::Replace => {
                        dbio::table::restore_update(
                            &mut self.conn,
                            &self.templates,
                            env,
                            table,
                            &self.ymd,
                        )
                        .await?
                    }
                    SyncMode::Manual | SyncMode::UpdateDiff => {
                        dbio::table::restore(&mut self.conn, &self.templates, env, table, &self.ymd)
                            .await?
                    }
                    SyncMode::DropCreate => unreachable!(),
                }
            }

            self.conn.commit().await?;
        }
        Ok(())
    }

    /// Restore a target table that has no data-model, from a patch file or
    /// straight from its backup table.
    async fn restore_target(
        &mut self,
        env: &str,
        schema: &Schema,
        target: &str,
        options: &ApplyOptions,
    ) -> Result<()> {
        if let Some(patch_path) = &options.patch {
            let patch = Patch::load(patch_path)?;
            patch.validate(target)?;
            let sql = patch.build_sql(env, &self.ymd);
            info!("patch restore {}.{}", env, target);
            self.conn.execute(&sql, Params::Empty).await?;
            return self.conn.commit().await;
        }

        if options.restore_backup {
            let Some(table) = schema.tables.get(target) else {
                return Ok(());
            };
            if dbio::table::is_exist_backup(&mut self.conn, &self.templates, env, table, &self.ymd)
                .await?
            {
                info!("restore {}.{} from backup", env, target);
                dbio::table::restore(&mut self.conn, &self.templates, env, table, &self.ymd)
                    .await?;
                self.conn.commit().await?;
            }
        }
        Ok(())
    }
}

/// End-to-end apply for the CLI: connect, run every selected mapping,
/// always release the connection.
pub async fn apply(
    project: &Project,
    environ: &str,
    database: Option<&str>,
    deploy: &str,
    options: &ApplyOptions,
) -> Result<()> {
    if options.mode.is_none() && options.target.is_none() {
        return Err(DbGearError::Config(
            "specify a target or a full-apply mode".to_string(),
        ));
    }

    let mut operation = Operation::connect(project, environ, database, deploy, options).await?;
    let result = operation.run(options).await;
    let closed = operation.close().await;
    result.and(closed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_mode_parsing() {
        assert_eq!("drop".parse::<ApplyMode>().unwrap(), ApplyMode::Drop);
        assert_eq!("delta".parse::<ApplyMode>().unwrap(), ApplyMode::Delta);
        assert!("all".parse::<ApplyMode>().is_err());
    }

    #[tokio::test]
    async fn test_apply_without_mode_or_target_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::for_tests(dir.path());
        let err = apply(&project, "dev", None, "local", &ApplyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbGearError::Config(_)));
    }

    #[tokio::test]
    async fn test_connect_unknown_environment_fails() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::for_tests(dir.path());
        let options = ApplyOptions {
            mode: Some(ApplyMode::Drop),
            ..Default::default()
        };
        let err = Operation::connect(&project, "dev", None, "local", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, DbGearError::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn test_connect_unknown_deployment_fails() {
        let dir = tempfile::tempdir().unwrap();
        crate::model::environ::testutil::write_environ(dir.path(), "dev");
        let project = Project::for_tests(dir.path());
        let options = ApplyOptions {
            mode: Some(ApplyMode::Drop),
            ..Default::default()
        };
        let err = Operation::connect(&project, "dev", None, "missing", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, DbGearError::EntityNotFound(_)));
    }
}
