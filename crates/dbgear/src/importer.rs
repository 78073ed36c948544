//! Importer collaborator contract.
//!
//! Importers translate third-party schema descriptions (ER-diagram
//! exports and the like) into a [`SchemaManager`]. The concrete importers
//! live outside this crate; embedders register them here and the CLI
//! resolves formats against the registry.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{DbGearError, Result};
use crate::model::schema::SchemaManager;

/// Contract every importer satisfies.
pub trait SchemaImporter {
    /// Translate `source` into schemas. `mapping` renames source-side
    /// instances to schema names (`KEY:VALUE` pairs on the CLI).
    fn import(&self, source: &Path, mapping: &IndexMap<String, String>) -> Result<SchemaManager>;
}

/// Format name -> importer.
#[derive(Default)]
pub struct ImporterRegistry {
    importers: HashMap<String, Box<dyn SchemaImporter>>,
}

impl ImporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, format: impl Into<String>, importer: Box<dyn SchemaImporter>) {
        self.importers.insert(format.into(), importer);
    }

    /// Run the importer registered for `format`.
    pub fn import(
        &self,
        format: &str,
        source: &Path,
        mapping: &IndexMap<String, String>,
    ) -> Result<SchemaManager> {
        let importer = self.importers.get(format).ok_or_else(|| {
            DbGearError::Config(format!("no importer registered for format '{}'", format))
        })?;
        importer.import(source, mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::Schema;

    struct FakeImporter;

    impl SchemaImporter for FakeImporter {
        fn import(
            &self,
            _source: &Path,
            _mapping: &IndexMap<String, String>,
        ) -> Result<SchemaManager> {
            let mut manager = SchemaManager::default();
            manager.add(Schema::new("main"))?;
            Ok(manager)
        }
    }

    #[test]
    fn test_unknown_format_is_config_error() {
        let registry = ImporterRegistry::new();
        let err = registry
            .import("a5er", Path::new("x.a5er"), &IndexMap::new())
            .unwrap_err();
        assert!(matches!(err, DbGearError::Config(_)));
    }

    #[test]
    fn test_registered_importer_runs() {
        let mut registry = ImporterRegistry::new();
        registry.register("fake", Box::new(FakeImporter));
        let manager = registry
            .import("fake", Path::new("x"), &IndexMap::new())
            .unwrap();
        assert!(manager.contains("main"));
    }
}
