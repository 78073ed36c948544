//! Secondary index definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::notes::Note;

/// A secondary index on a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Index name; synthesized as `<table>_IX<position>` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    pub columns: Vec<String>,

    #[serde(default = "default_index_type", skip_serializing_if = "is_btree")]
    pub index_type: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_condition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_columns: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_parameters: Option<IndexMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tablespace: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

fn default_index_type() -> String {
    "BTREE".to_string()
}

fn is_btree(v: &str) -> bool {
    v == "BTREE"
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Index {
    /// Effective name given the index's zero-based position on its table.
    pub fn effective_name(&self, table_name: &str, position: usize) -> String {
        match &self.index_name {
            Some(name) => name.clone(),
            None => format!("{}_IX{}", table_name, position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_name_synthesis() {
        let index: Index = serde_yaml::from_str("columns: [name]\n").unwrap();
        assert_eq!(index.effective_name("users", 0), "users_IX0");
        assert_eq!(index.effective_name("users", 3), "users_IX3");
    }

    #[test]
    fn test_effective_name_explicit() {
        let index: Index =
            serde_yaml::from_str("index_name: users_by_name\ncolumns: [name]\n").unwrap();
        assert_eq!(index.effective_name("users", 0), "users_by_name");
    }

    #[test]
    fn test_index_type_default_omitted() {
        let index: Index = serde_yaml::from_str("columns: [a]\n").unwrap();
        assert_eq!(index.index_type, "BTREE");
        let yaml = serde_yaml::to_string(&index).unwrap();
        assert!(!yaml.contains("index_type"));
        assert!(!yaml.contains("unique"));
    }
}
