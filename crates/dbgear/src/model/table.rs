//! Table definitions and per-table invariants.

use serde::{Deserialize, Serialize};

use super::column::Column;
use super::index::Index;
use super::notes::Note;
use super::relation::Relation;

/// MySQL-dialect table options appended to `CREATE TABLE`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialectOptions {
    /// Storage engine (InnoDB, MyISAM, MEMORY, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,

    /// AUTO_INCREMENT start value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<u64>,

    /// DYNAMIC, COMPRESSED, REDUNDANT, COMPACT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_format: Option<String>,
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(skip)]
    pub table_name: String,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Column>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect_options: Option<DialectOptions>,
}

impl Table {
    /// Find a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.column_name == name)
    }

    /// Primary-key columns ordered by their key position.
    pub fn pk_columns(&self) -> Vec<&Column> {
        let mut pk: Vec<&Column> = self
            .columns
            .iter()
            .filter(|c| c.primary_key.is_some())
            .collect();
        pk.sort_by_key(|c| c.primary_key);
        pk
    }

    /// Check the per-table invariants, aggregating every violation.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let name = &self.table_name;

        // Composite PK positions must be {1..k}, densely numbered.
        let mut positions: Vec<u32> = self
            .columns
            .iter()
            .filter_map(|c| c.primary_key)
            .collect();
        positions.sort_unstable();
        for (i, pos) in positions.iter().enumerate() {
            if *pos != (i + 1) as u32 {
                errors.push(format!(
                    "table {}: primary key positions must be 1..{} without gaps, got {:?}",
                    name,
                    positions.len(),
                    positions
                ));
                break;
            }
        }

        for column in &self.columns {
            if column.expression.is_some() {
                if column.default_value.is_some() {
                    errors.push(format!(
                        "table {}: generated column {} must not have a default value",
                        name, column.column_name
                    ));
                }
                if column.primary_key.is_some() {
                    errors.push(format!(
                        "table {}: generated column {} must not be a primary key member",
                        name, column.column_name
                    ));
                }
                if self.relations.iter().any(|r| {
                    r.bind_columns
                        .iter()
                        .any(|b| b.source_column == column.column_name)
                }) {
                    errors.push(format!(
                        "table {}: generated column {} must not be a relation source",
                        name, column.column_name
                    ));
                }
            } else if column.stored {
                errors.push(format!(
                    "table {}: column {} sets stored without an expression",
                    name, column.column_name
                ));
            }

            if column.auto_increment {
                if column.primary_key.is_none() {
                    errors.push(format!(
                        "table {}: auto_increment column {} must be a primary key member",
                        name, column.column_name
                    ));
                }
                if column.nullable {
                    errors.push(format!(
                        "table {}: auto_increment column {} must not be nullable",
                        name, column.column_name
                    ));
                }
            }
        }

        for (pos, index) in self.indexes.iter().enumerate() {
            for column in &index.columns {
                if self.column(column).is_none() {
                    errors.push(format!(
                        "table {}: index {} references unknown column {}",
                        name,
                        index.effective_name(name, pos),
                        column
                    ));
                }
            }
        }

        for relation in &self.relations {
            if relation.bind_columns.is_empty() {
                errors.push(format!(
                    "table {}: relation to {} has no bind columns",
                    name,
                    relation.target_key()
                ));
            }
            for bind in &relation.bind_columns {
                if self.column(&bind.source_column).is_none() {
                    errors.push(format!(
                        "table {}: relation to {} references unknown source column {}",
                        name,
                        relation.target_key(),
                        bind.source_column
                    ));
                }
            }
        }

        errors
    }
}
