//! Column definitions.

use serde::{Deserialize, Serialize};

use super::column_type::ColumnType;
use super::notes::Note;

/// A table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub column_name: String,
    pub display_name: String,
    pub column_type: ColumnType,
    pub nullable: bool,

    /// 1-based position within the composite primary key; `None` when the
    /// column is not a key member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    /// Generated-column expression. Mutually exclusive with `default_value`
    /// and primary-key membership.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// STORED vs VIRTUAL; only meaningful when `expression` is set.
    #[serde(default, skip_serializing_if = "is_false")]
    pub stored: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Column {
    /// Whether the column is computed and must never be written by INSERT.
    pub fn is_generated(&self) -> bool {
        self.expression.is_some()
    }
}
