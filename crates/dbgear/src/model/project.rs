//! Project root configuration.

use std::path::PathBuf;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::environ::EnvironManager;
use super::schema::SchemaManager;

/// Root of a project folder; owns the lazily loaded project-wide schemas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(skip)]
    pub folder: PathBuf,

    pub project_name: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, serde_yaml::Value>,

    #[serde(skip)]
    schemas: OnceCell<Option<SchemaManager>>,
}

impl Project {
    /// Load `<folder>/project.yaml`.
    pub fn load(folder: impl Into<PathBuf>) -> Result<Self> {
        let folder = folder.into();
        let content = std::fs::read_to_string(folder.join("project.yaml"))?;
        let mut project: Project = serde_yaml::from_str(&content)?;
        project.folder = folder;
        Ok(project)
    }

    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(self.folder.join("project.yaml"), yaml)?;
        Ok(())
    }

    /// Project-wide schemas from `<folder>/schema.yaml`, loaded on first
    /// access. `None` when the file does not exist.
    pub fn schemas(&self) -> Result<Option<&SchemaManager>> {
        let cell = self
            .schemas
            .get_or_try_init(|| SchemaManager::load(self.schema_path()))?;
        Ok(cell.as_ref())
    }

    pub fn schema_path(&self) -> PathBuf {
        self.folder.join("schema.yaml")
    }

    pub fn envs(&self) -> EnvironManager {
        EnvironManager::new(&self.folder)
    }
}

impl Project {
    #[cfg(test)]
    pub(crate) fn for_tests(folder: &std::path::Path) -> Self {
        Project {
            folder: folder.to_path_buf(),
            project_name: "test".to_string(),
            description: "test project".to_string(),
            options: IndexMap::new(),
            schemas: OnceCell::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("project.yaml"),
            "project_name: shop\ndescription: storefront database\n",
        )
        .unwrap();

        let project = Project::load(dir.path()).unwrap();
        assert_eq!(project.project_name, "shop");
        assert_eq!(project.folder, dir.path());

        project.save().unwrap();
        let reloaded = Project::load(dir.path()).unwrap();
        assert_eq!(reloaded.project_name, project.project_name);
        assert_eq!(reloaded.description, project.description);
    }

    #[test]
    fn test_schemas_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("project.yaml"),
            "project_name: shop\ndescription: d\n",
        )
        .unwrap();
        let project = Project::load(dir.path()).unwrap();
        assert!(project.schemas().unwrap().is_none());
    }

    #[test]
    fn test_schemas_loaded_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("project.yaml"),
            "project_name: shop\ndescription: d\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("schema.yaml"), "schemas:\n  main: {}\n").unwrap();

        let project = Project::load(dir.path()).unwrap();
        assert!(project.schemas().unwrap().is_some());

        // Deleting the file after first access must not matter.
        std::fs::remove_file(dir.path().join("schema.yaml")).unwrap();
        assert!(project.schemas().unwrap().is_some());
    }
}
