//! Relations between tables, carrying both logical cardinality and the
//! physical foreign-key constraint definition.

use serde::{Deserialize, Serialize};

use super::notes::Note;

/// Reference to a table in a (possibly different) schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub schema_name: String,
    pub table_name: String,
}

/// One source/target column pair binding a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindColumn {
    pub source_column: String,
    pub target_column: String,
}

/// A relationship between two tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub target: EntityRef,
    pub bind_columns: Vec<BindColumn>,

    // Physical foreign key constraint information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
    #[serde(default = "default_restrict", skip_serializing_if = "is_restrict")]
    pub on_delete: String,
    #[serde(default = "default_restrict", skip_serializing_if = "is_restrict")]
    pub on_update: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deferrable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub initially_deferred: bool,
    #[serde(default = "default_match", skip_serializing_if = "is_simple")]
    pub match_type: String,

    // Logical relationship information
    #[serde(default = "default_one", skip_serializing_if = "is_one")]
    pub cardinarity_source: String,
    #[serde(default = "default_one", skip_serializing_if = "is_one")]
    pub cardinarity_target: String,
    #[serde(default = "default_association", skip_serializing_if = "is_association")]
    pub relationship_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

fn default_restrict() -> String {
    "RESTRICT".to_string()
}

fn is_restrict(v: &str) -> bool {
    v == "RESTRICT"
}

fn default_match() -> String {
    "SIMPLE".to_string()
}

fn is_simple(v: &str) -> bool {
    v == "SIMPLE"
}

fn default_one() -> String {
    "1".to_string()
}

fn is_one(v: &str) -> bool {
    v == "1"
}

fn default_association() -> String {
    "association".to_string()
}

fn is_association(v: &str) -> bool {
    v == "association"
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Relation {
    /// Source column names, in bind order.
    pub fn source_columns(&self) -> Vec<&str> {
        self.bind_columns
            .iter()
            .map(|b| b.source_column.as_str())
            .collect()
    }

    /// Target column names, in bind order.
    pub fn target_columns(&self) -> Vec<&str> {
        self.bind_columns
            .iter()
            .map(|b| b.target_column.as_str())
            .collect()
    }

    /// Key of the target table in `schema@table` form.
    pub fn target_key(&self) -> String {
        format!("{}@{}", self.target.schema_name, self.target.table_name)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    pub fn relation(schema: &str, table: &str, source: &str, target: &str) -> Relation {
        Relation {
            target: EntityRef {
                schema_name: schema.to_string(),
                table_name: table.to_string(),
            },
            bind_columns: vec![BindColumn {
                source_column: source.to_string(),
                target_column: target.to_string(),
            }],
            constraint_name: None,
            on_delete: "RESTRICT".to_string(),
            on_update: "RESTRICT".to_string(),
            deferrable: false,
            initially_deferred: false,
            match_type: "SIMPLE".to_string(),
            cardinarity_source: "1".to_string(),
            cardinarity_target: "1".to_string(),
            relationship_type: "association".to_string(),
            description: None,
            notes: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_yaml() {
        let relation: Relation = serde_yaml::from_str(
            "target:\n  schema_name: main\n  table_name: users\nbind_columns:\n  - source_column: user_id\n    target_column: id\n",
        )
        .unwrap();
        assert_eq!(relation.on_delete, "RESTRICT");
        assert_eq!(relation.match_type, "SIMPLE");
        assert_eq!(relation.cardinarity_source, "1");
        assert_eq!(relation.relationship_type, "association");
        assert_eq!(relation.target_key(), "main@users");
    }

    #[test]
    fn test_column_accessors_preserve_order() {
        let mut relation = testutil::relation("main", "users", "user_id", "id");
        relation.bind_columns.push(BindColumn {
            source_column: "tenant_id".to_string(),
            target_column: "tenant".to_string(),
        });
        assert_eq!(relation.source_columns(), vec!["user_id", "tenant_id"]);
        assert_eq!(relation.target_columns(), vec!["id", "tenant"]);
    }

    #[test]
    fn test_defaults_omitted_on_save() {
        let relation = testutil::relation("main", "users", "user_id", "id");
        let yaml = serde_yaml::to_string(&relation).unwrap();
        assert!(!yaml.contains("on_delete"));
        assert!(!yaml.contains("cardinarity_source"));
        assert!(!yaml.contains("relationship_type"));
    }
}
