//! Environment configuration and the per-environment directory layout.
//!
//! ```text
//! <folder>/<environ>/environ.yaml   deployments + options (the marker file)
//! <folder>/<environ>/schema.yaml    optional schema overlay
//! <folder>/<environ>/tenant.yaml    optional tenant registry
//! <folder>/<environ>/<mapping>/...  mapping directories
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{DbGearError, Result};

use super::mapping::{Mapping, MappingManager};
use super::schema::SchemaManager;
use super::tenant::TenantRegistry;

/// One environment: deployments, options, and an optional schema overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environ {
    #[serde(skip)]
    pub folder: PathBuf,

    #[serde(skip)]
    pub name: String,

    pub description: String,

    /// Deploy name -> database connection URL.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub deployment: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, serde_yaml::Value>,

    #[serde(skip)]
    schemas: OnceCell<Option<SchemaManager>>,
}

impl Environ {
    /// Load `<folder>/<name>/environ.yaml`.
    pub fn load(folder: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        let folder = folder.into();
        let name = name.into();
        let path = folder.join(&name).join("environ.yaml");
        if !path.is_file() {
            return Err(DbGearError::EntityNotFound(format!(
                "environment '{}' in {}",
                name,
                folder.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let mut environ: Environ = serde_yaml::from_str(&content)?;
        environ.folder = folder;
        environ.name = name;
        Ok(environ)
    }

    pub fn dir(&self) -> PathBuf {
        self.folder.join(&self.name)
    }

    /// Per-environment schema overlay, loaded on first access.
    pub fn schemas(&self) -> Result<Option<&SchemaManager>> {
        let cell = self
            .schemas
            .get_or_try_init(|| SchemaManager::load(self.dir().join("schema.yaml")))?;
        Ok(cell.as_ref())
    }

    /// Optional tenant registry from `tenant.yaml`.
    pub fn tenants(&self) -> Result<Option<TenantRegistry>> {
        TenantRegistry::load(self.dir().join("tenant.yaml"))
    }

    pub fn mappings(&self) -> MappingManager {
        MappingManager::new(&self.folder, &self.name)
    }

    /// Connection URL for a deploy name.
    pub fn deployment_url(&self, deploy: &str) -> Result<&str> {
        self.deployment
            .get(deploy)
            .map(String::as_str)
            .ok_or_else(|| {
                DbGearError::EntityNotFound(format!(
                    "deployment '{}' in environment '{}'",
                    deploy, self.name
                ))
            })
    }

    /// Deployable mappings: every mapping with `deploy: true`, then one
    /// clone per active tenant database with `tenant_name` set. Instance
    /// names must be unique across the result.
    pub fn databases(&self) -> Result<Vec<Mapping>> {
        let manager = self.mappings();
        let mut result: Vec<Mapping> = manager.iter()?.into_iter().filter(|m| m.deploy).collect();

        if let Some(registry) = self.tenants()? {
            for tenant in registry.iter() {
                let base = manager.get(&tenant.ref_)?;
                for info in &tenant.databases {
                    if !info.active {
                        continue;
                    }
                    let mut clone = base.clone();
                    clone.tenant_name = Some(info.database.clone());
                    result.push(clone);
                }
            }
        }

        let mut seen = HashSet::new();
        let mut errors = Vec::new();
        for mapping in &result {
            if !seen.insert(mapping.instance_name().to_string()) {
                errors.push(format!(
                    "environment {}: duplicate instance name '{}'",
                    self.name,
                    mapping.instance_name()
                ));
            }
        }
        if !errors.is_empty() {
            return Err(DbGearError::Validation(errors));
        }

        Ok(result)
    }
}

/// Folder-backed manager for environments.
pub struct EnvironManager {
    folder: PathBuf,
}

impl EnvironManager {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn get(&self, name: &str) -> Result<Environ> {
        Environ::load(&self.folder, name)
    }

    /// All environments, sorted by directory name.
    pub fn iter(&self) -> Result<Vec<Environ>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.folder)? {
            let entry = entry?;
            if entry.path().join("environ.yaml").is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        names.into_iter().map(|n| self.get(&n)).collect()
    }

    pub fn add(&self, name: &str, environ: &Environ) -> Result<()> {
        let dir = self.folder.join(name);
        if dir.exists() {
            return Err(DbGearError::EntityExists(format!(
                "environment '{}' in {}",
                name,
                self.folder.display()
            )));
        }
        std::fs::create_dir_all(&dir)?;
        let yaml = serde_yaml::to_string(environ)?;
        std::fs::write(dir.join("environ.yaml"), yaml)?;
        Ok(())
    }

    /// Remove an environment. Fails if anything other than the marker file
    /// remains in the directory; dependent artifacts must go first.
    pub fn remove(&self, name: &str) -> Result<()> {
        let dir = self.folder.join(name);
        if !dir.exists() {
            return Err(DbGearError::EntityNotFound(format!(
                "environment '{}' in {}",
                name,
                self.folder.display()
            )));
        }
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_name() != "environ.yaml" {
                return Err(DbGearError::EntityRemoval(format!(
                    "cannot remove {}: files other than environ.yaml exist",
                    dir.display()
                )));
            }
        }
        std::fs::remove_file(dir.join("environ.yaml"))?;
        std::fs::remove_dir(dir)?;
        Ok(())
    }
}
