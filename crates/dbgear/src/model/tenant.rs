//! Tenant registry: one logical mapping cloned per active database.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DbGearError, Result};

/// One physical database belonging to a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

/// A tenant: a reference to a mapping plus its databases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    #[serde(skip)]
    pub name: String,

    /// Name of the mapping this tenant clones.
    #[serde(rename = "ref")]
    pub ref_: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<DatabaseInfo>,
}

/// Registry of tenant configurations (`tenant.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRegistry {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tenants: IndexMap<String, TenantConfig>,
}

impl TenantRegistry {
    /// Load a tenant registry; `None` when the file is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let mut registry: TenantRegistry = serde_yaml::from_str(&content)?;
        for (name, tenant) in registry.tenants.iter_mut() {
            tenant.name = name.clone();
        }
        Ok(Some(registry))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TenantConfig> {
        self.tenants.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TenantConfig> {
        self.tenants.values()
    }

    pub fn add(&mut self, tenant: TenantConfig) -> Result<()> {
        if self.tenants.contains_key(&tenant.name) {
            return Err(DbGearError::EntityExists(format!("tenant '{}'", tenant.name)));
        }
        self.tenants.insert(tenant.name.clone(), tenant);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        if self.tenants.shift_remove(name).is_none() {
            return Err(DbGearError::EntityNotFound(format!("tenant '{}'", name)));
        }
        Ok(())
    }
}
