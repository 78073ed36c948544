//! Schema definitions and the schema.yaml manager.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DbGearError, Result};

use super::column_type::ColumnTypeRegistry;
use super::notes::Note;
use super::procedure::Procedure;
use super::table::Table;
use super::trigger::Trigger;
use super::view::View;

/// One named schema: tables, views, triggers, and procedures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(skip)]
    pub name: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tables: IndexMap<String, Table>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub views: IndexMap<String, View>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub triggers: IndexMap<String, Trigger>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub procedures: IndexMap<String, Procedure>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Schema {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Merge `other` into self: union of each child collection, later wins
    /// on key collision; notes concatenate.
    pub fn merge(&mut self, other: &Schema) {
        for (key, table) in &other.tables {
            self.tables.insert(key.clone(), table.clone());
        }
        for (key, view) in &other.views {
            self.views.insert(key.clone(), view.clone());
        }
        for (key, trigger) in &other.triggers {
            self.triggers.insert(key.clone(), trigger.clone());
        }
        for (key, procedure) in &other.procedures {
            self.procedures.insert(key.clone(), procedure.clone());
        }
        self.notes.extend(other.notes.iter().cloned());
    }

    /// Copy mapping keys into each child's identifying field.
    pub(crate) fn populate_names(&mut self, name: &str) {
        self.name = name.to_string();
        for (key, table) in self.tables.iter_mut() {
            table.table_name = key.clone();
        }
        for (key, view) in self.views.iter_mut() {
            view.view_name = key.clone();
        }
        for (key, trigger) in self.triggers.iter_mut() {
            trigger.trigger_name = key.clone();
        }
        for (key, procedure) in self.procedures.iter_mut() {
            procedure.procedure_name = key.clone();
        }
    }

    /// Schema-level invariants: disjoint namespaces plus every table's own
    /// invariants. Violations are aggregated.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for name in self.views.keys() {
            if self.tables.contains_key(name) {
                errors.push(format!(
                    "schema {}: view {} collides with a table of the same name",
                    self.name, name
                ));
            }
        }
        for name in self.triggers.keys() {
            if self.tables.contains_key(name) || self.views.contains_key(name) {
                errors.push(format!(
                    "schema {}: trigger {} collides with another entity of the same name",
                    self.name, name
                ));
            }
        }
        for name in self.procedures.keys() {
            if self.tables.contains_key(name)
                || self.views.contains_key(name)
                || self.triggers.contains_key(name)
            {
                errors.push(format!(
                    "schema {}: procedure {} collides with another entity of the same name",
                    self.name, name
                ));
            }
        }

        for table in self.tables.values() {
            errors.extend(table.validate());
        }

        errors
    }

    /// Validate invariants that only hold after composition: relation
    /// targets must resolve to a table of the composed schema and bind
    /// column counts must line up on both ends.
    pub fn validate_composed(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for table in self.tables.values() {
            for relation in &table.relations {
                let target = match self.tables.get(&relation.target.table_name) {
                    Some(target) => target,
                    None => {
                        errors.push(format!(
                            "table {}: relation target {} not present after composition",
                            table.table_name,
                            relation.target_key()
                        ));
                        continue;
                    }
                };
                for bind in &relation.bind_columns {
                    if target.column(&bind.target_column).is_none() {
                        errors.push(format!(
                            "table {}: relation to {} references unknown target column {}",
                            table.table_name,
                            relation.target_key(),
                            bind.target_column
                        ));
                    }
                }
            }
        }
        errors
    }
}

/// Ordered collection of schemas loaded from one `schema.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaManager {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Schema>,

    #[serde(default, skip_serializing_if = "ColumnTypeRegistry::is_empty")]
    pub registry: ColumnTypeRegistry,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

impl SchemaManager {
    /// Load from a schema.yaml file. Returns `None` when the file is
    /// absent; callers decide whether that is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let mut manager: SchemaManager = serde_yaml::from_str(&content)?;
        manager.populate_names();
        let errors: Vec<String> = manager
            .schemas
            .values()
            .flat_map(|s| s.validate())
            .collect();
        if !errors.is_empty() {
            return Err(DbGearError::Validation(errors));
        }
        Ok(Some(manager))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    fn populate_names(&mut self) {
        for (name, schema) in self.schemas.iter_mut() {
            schema.populate_names(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn add(&mut self, schema: Schema) -> Result<()> {
        if self.schemas.contains_key(&schema.name) {
            return Err(DbGearError::EntityExists(format!("schema '{}'", schema.name)));
        }
        self.schemas.insert(schema.name.clone(), schema);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        if self.schemas.shift_remove(name).is_none() {
            return Err(DbGearError::EntityNotFound(format!("schema '{}'", name)));
        }
        Ok(())
    }
}
