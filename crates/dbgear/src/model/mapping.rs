//! Mappings: named compositions of schemas, the unit at which a database
//! is created and seeded.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DbGearError, Result};

use super::datamodel::DataModel;
use super::schema::{Schema, SchemaManager};

/// One mapping directory (`<folder>/<environ>/<name>/_mapping.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapping {
    #[serde(skip)]
    pub folder: PathBuf,

    #[serde(skip)]
    pub environ: String,

    #[serde(skip)]
    pub name: String,

    pub description: String,

    /// Schema names to compose, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub deploy: bool,

    /// Set when this mapping was materialized from a tenant registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,

    /// Database-level options (charset, collation).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, String>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Mapping {
    /// Load `<folder>/<environ>/<name>/_mapping.yaml`.
    pub fn load(
        folder: impl Into<PathBuf>,
        environ: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let folder = folder.into();
        let environ = environ.into();
        let name = name.into();
        let path = folder.join(&environ).join(&name).join("_mapping.yaml");
        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DbGearError::EntityNotFound(format!("mapping '{}' in {}/{}", name, folder.display(), environ))
            } else {
                DbGearError::Io(e)
            }
        })?;
        let mut mapping: Mapping = serde_yaml::from_str(&content)?;
        mapping.folder = folder;
        mapping.environ = environ;
        mapping.name = name;
        Ok(mapping)
    }

    /// Database name this mapping deploys to.
    pub fn instance_name(&self) -> &str {
        self.tenant_name.as_deref().unwrap_or(&self.name)
    }

    pub fn dir(&self) -> PathBuf {
        self.folder.join(&self.environ).join(&self.name)
    }

    /// Compose the effective schema for this mapping: for each schema name
    /// in order, merge the project-level schema (if present) and then the
    /// environment-level overlay (if present). The result carries the
    /// mapping's name.
    pub fn build_schema(
        &self,
        project_schemas: Option<&SchemaManager>,
        environ_schemas: Option<&SchemaManager>,
    ) -> Result<Schema> {
        let mut composed = Schema::new(self.name.clone());
        for schema_name in &self.schemas {
            if let Some(schema) = project_schemas.and_then(|m| m.get(schema_name)) {
                composed.merge(schema);
            }
            if let Some(schema) = environ_schemas.and_then(|m| m.get(schema_name)) {
                composed.merge(schema);
            }
        }

        let mut errors = composed.validate();
        errors.extend(composed.validate_composed());
        if !errors.is_empty() {
            return Err(DbGearError::Validation(errors));
        }
        Ok(composed)
    }

    /// Data-models of this mapping, in file order.
    pub fn datamodels(&self) -> Result<Vec<DataModel>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.dir())? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name == "_mapping.yaml" || !file_name.ends_with(".yaml") {
                continue;
            }
            names.push(file_name);
        }
        names.sort();
        names
            .into_iter()
            .map(|n| DataModel::load(self, &n))
            .collect()
    }

    /// The data-model for one `<schema>@<table>`, if its file exists.
    pub fn datamodel(&self, schema_name: &str, table_name: &str) -> Result<Option<DataModel>> {
        let file_name = format!("{}@{}.yaml", schema_name, table_name);
        if !self.dir().join(&file_name).is_file() {
            return Ok(None);
        }
        DataModel::load(self, &file_name).map(Some)
    }

    pub fn add_datamodel(&self, model: &DataModel) -> Result<()> {
        let path = self.dir().join(model.filename());
        if path.exists() {
            return Err(DbGearError::EntityExists(format!(
                "data-model {} in {}",
                model.filename(),
                self.dir().display()
            )));
        }
        let yaml = serde_yaml::to_string(model)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn remove_datamodel(&self, model: &DataModel) -> Result<()> {
        let path = self.dir().join(model.filename());
        std::fs::remove_file(&path).map_err(|e| {
            DbGearError::EntityRemoval(format!(
                "failed to remove data-model {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// Folder-backed manager for the mappings of one environment.
pub struct MappingManager {
    folder: PathBuf,
    environ: String,
}

impl MappingManager {
    pub fn new(folder: impl Into<PathBuf>, environ: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            environ: environ.into(),
        }
    }

    pub fn get(&self, name: &str) -> Result<Mapping> {
        Mapping::load(&self.folder, &self.environ, name)
    }

    /// All mappings, sorted by directory name.
    pub fn iter(&self) -> Result<Vec<Mapping>> {
        let dir = self.folder.join(&self.environ);
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().join("_mapping.yaml").is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        names.into_iter().map(|n| self.get(&n)).collect()
    }

    pub fn add(&self, mapping: &Mapping) -> Result<()> {
        let dir = self.folder.join(&self.environ).join(&mapping.name);
        if dir.exists() {
            return Err(DbGearError::EntityExists(format!(
                "mapping '{}' in {}/{}",
                mapping.name,
                self.folder.display(),
                self.environ
            )));
        }
        std::fs::create_dir_all(&dir)?;
        let yaml = serde_yaml::to_string(mapping)?;
        std::fs::write(dir.join("_mapping.yaml"), yaml)?;
        Ok(())
    }

    /// Remove a mapping. Fails if files other than `_mapping.yaml` remain.
    pub fn remove(&self, name: &str) -> Result<()> {
        let dir = self.folder.join(&self.environ).join(name);
        if !dir.exists() {
            return Err(DbGearError::EntityNotFound(format!(
                "mapping '{}' in {}/{}",
                name,
                self.folder.display(),
                self.environ
            )));
        }
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_name() != "_mapping.yaml" {
                return Err(DbGearError::EntityRemoval(format!(
                    "cannot remove {}: files other than _mapping.yaml exist",
                    dir.display()
                )));
            }
        }
        std::fs::remove_file(dir.join("_mapping.yaml"))?;
        std::fs::remove_dir(dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::environ::testutil::write_environ;
    use crate::model::schema::SchemaManager;

    fn project_schemas(yaml: &str) -> SchemaManager {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(&path, yaml).unwrap();
        SchemaManager::load(&path).unwrap().unwrap()
    }

    const PROJECT_SCHEMA: &str = r#"
schemas:
  main:
    tables:
      users:
        display_name: Users
        columns:
          - column_name: id
            display_name: ID
            column_type: {column_type: BIGINT, base_type: BIGINT}
            nullable: false
            primary_key: 1
"#;

    const ENV_SCHEMA: &str = r#"
schemas:
  main:
    tables:
      audit_log:
        display_name: Audit Log
        columns:
          - column_name: id
            display_name: ID
            column_type: {column_type: BIGINT, base_type: BIGINT}
            nullable: false
            primary_key: 1
"#;

    #[test]
    fn test_instance_name_prefers_tenant() {
        let dir = tempfile::tempdir().unwrap();
        write_environ(dir.path(), "dev");
        let mut mapping = Mapping::load(dir.path(), "dev", "app").unwrap();
        assert_eq!(mapping.instance_name(), "app");
        mapping.tenant_name = Some("acme".to_string());
        assert_eq!(mapping.instance_name(), "acme");
    }

    #[test]
    fn test_build_schema_composes_project_and_environ() {
        let dir = tempfile::tempdir().unwrap();
        write_environ(dir.path(), "dev");
        let mapping = Mapping::load(dir.path(), "dev", "app").unwrap();

        let project = project_schemas(PROJECT_SCHEMA);
        let environ = project_schemas(ENV_SCHEMA);

        let composed = mapping.build_schema(Some(&project), Some(&environ)).unwrap();
        assert_eq!(composed.name, "app");
        assert!(composed.tables.contains_key("users"));
        assert!(composed.tables.contains_key("audit_log"));
    }

    #[test]
    fn test_build_schema_skips_unknown_names() {
        let dir = tempfile::tempdir().unwrap();
        write_environ(dir.path(), "dev");
        let mut mapping = Mapping::load(dir.path(), "dev", "app").unwrap();
        mapping.schemas = vec!["missing".to_string()];

        let project = project_schemas(PROJECT_SCHEMA);
        let composed = mapping.build_schema(Some(&project), None).unwrap();
        assert!(composed.tables.is_empty());
    }

    #[test]
    fn test_datamodels_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        write_environ(dir.path(), "dev");
        let mapping = Mapping::load(dir.path(), "dev", "app").unwrap();

        for table in ["orders", "customers"] {
            std::fs::write(
                mapping.dir().join(format!("main@{}.yaml", table)),
                "description: fixture\nsync_mode: drop_create\ndata_type: yaml\n",
            )
            .unwrap();
        }

        let models = mapping.datamodels().unwrap();
        let keys: Vec<String> = models.iter().map(|m| m.key()).collect();
        assert_eq!(keys, vec!["main@customers", "main@orders"]);
    }

    #[test]
    fn test_datamodel_lookup() {
        let dir = tempfile::tempdir().unwrap();
        write_environ(dir.path(), "dev");
        let mapping = Mapping::load(dir.path(), "dev", "app").unwrap();
        assert!(mapping.datamodel("main", "users").unwrap().is_none());

        std::fs::write(
            mapping.dir().join("main@users.yaml"),
            "description: fixture\nsync_mode: drop_create\ndata_type: yaml\n",
        )
        .unwrap();
        let model = mapping.datamodel("main", "users").unwrap().unwrap();
        assert_eq!(model.table_name, "users");
    }

    #[test]
    fn test_manager_add_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        write_environ(dir.path(), "dev");
        let manager = MappingManager::new(dir.path(), "dev");

        assert!(matches!(
            manager.remove("missing"),
            Err(DbGearError::EntityNotFound(_))
        ));

        let mut mapping = manager.get("app").unwrap();
        mapping.name = "reports".to_string();
        manager.add(&mapping).unwrap();
        assert!(matches!(manager.add(&mapping), Err(DbGearError::EntityExists(_))));

        manager.remove("reports").unwrap();
        assert!(!dir.path().join("dev").join("reports").exists());
    }

    #[test]
    fn test_manager_remove_refuses_dependents() {
        let dir = tempfile::tempdir().unwrap();
        write_environ(dir.path(), "dev");
        let manager = MappingManager::new(dir.path(), "dev");
        std::fs::write(
            dir.path().join("dev").join("app").join("main@users.yaml"),
            "description: d\nsync_mode: drop_create\ndata_type: yaml\n",
        )
        .unwrap();
        assert!(matches!(
            manager.remove("app"),
            Err(DbGearError::EntityRemoval(_))
        ));
    }
}
