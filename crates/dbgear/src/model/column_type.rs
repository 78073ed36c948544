//! Rich column-type metadata and the canonical type-string parser.
//!
//! Column types are objects, not bare strings: the canonical string is kept
//! alongside the decomposed base type, length/precision/scale, enumerated
//! items, and an optional JSON schema for JSON columns.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DbGearError, Result};

/// One member of an enumerated (ENUM/SET) column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTypeItem {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnTypeItem {
    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            caption: None,
            description: None,
        }
    }

    /// Caption falls back to the raw value when not set.
    pub fn caption(&self) -> &str {
        self.caption.as_deref().unwrap_or(&self.value)
    }
}

/// Column type metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnType {
    /// Canonical type string, e.g. `VARCHAR(255)` or `DECIMAL(10,2)`.
    pub column_type: String,

    /// Base type, e.g. `VARCHAR`, `INT`, `ENUM`.
    pub base_type: String,

    /// Length for VARCHAR, CHAR, BINARY and display width for integers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,

    /// Precision for DECIMAL / NUMERIC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,

    /// Scale for DECIMAL / NUMERIC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,

    /// Members of ENUM / SET types, in declared order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ColumnTypeItem>>,

    /// JSON Schema for JSON column types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<serde_json::Value>,
}

impl ColumnType {
    /// Build a plain type with no parameters.
    pub fn simple(base_type: impl Into<String>) -> Self {
        let base_type = base_type.into();
        Self {
            column_type: base_type.clone(),
            base_type,
            length: None,
            precision: None,
            scale: None,
            items: None,
            json_schema: None,
        }
    }

    /// Item values for SQL generation, in declared order.
    pub fn item_values(&self) -> Vec<&str> {
        self.items
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|i| i.value.as_str())
            .collect()
    }
}

/// Shared registry of named column types on a schema manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnTypeRegistry {
    types: IndexMap<String, ColumnType>,
}

impl ColumnTypeRegistry {
    pub fn get(&self, name: &str) -> Option<&ColumnType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnType> {
        self.types.values()
    }

    pub fn add(&mut self, column_type: ColumnType) -> Result<()> {
        if self.types.contains_key(&column_type.column_type) {
            return Err(DbGearError::EntityExists(format!(
                "column type '{}'",
                column_type.column_type
            )));
        }
        self.types
            .insert(column_type.column_type.clone(), column_type);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        if self.types.shift_remove(name).is_none() {
            return Err(DbGearError::EntityNotFound(format!("column type '{}'", name)));
        }
        Ok(())
    }
}

/// Parse a canonical MySQL type string into a [`ColumnType`].
///
/// Accepts the usual shapes: `VARCHAR(255)`, `INT(11)`, `DECIMAL(10,2)`,
/// `ENUM('a','b')`, `SET('x','y')`, `TEXT`, `DATETIME`.
pub fn parse_column_type(type_string: &str) -> Result<ColumnType> {
    let original = type_string.trim();
    if original.is_empty() {
        return Err(DbGearError::Config(
            "column type string must not be empty".to_string(),
        ));
    }
    let upper = original.to_uppercase();

    let base_len = upper.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if base_len == 0 {
        return Err(DbGearError::Config(format!(
            "cannot extract base type from '{}'",
            original
        )));
    }
    let base_type = upper[..base_len].to_string();

    let mut parsed = ColumnType {
        column_type: original.to_string(),
        base_type: base_type.clone(),
        length: None,
        precision: None,
        scale: None,
        items: None,
        json_schema: None,
    };

    let args = paren_args(&upper[base_len..]);

    match base_type.as_str() {
        "VARCHAR" | "CHAR" | "VARBINARY" | "BINARY" | "TINYINT" | "SMALLINT" | "MEDIUMINT"
        | "INT" | "INTEGER" | "BIGINT" | "BIT" => {
            if let Some(args) = args {
                parsed.length = args.first().and_then(|a| a.parse().ok());
            }
        }
        "DECIMAL" | "NUMERIC" | "DEC" | "FLOAT" | "DOUBLE" => {
            if let Some(args) = args {
                parsed.precision = args.first().and_then(|a| a.parse().ok());
                parsed.scale = args.get(1).and_then(|a| a.parse().ok());
            }
        }
        "ENUM" | "SET" => {
            // Re-read the argument list from the original string so item
            // values keep their case.
            if let Some(args) = paren_args(&original[base_len..]) {
                let items = args
                    .iter()
                    .map(|a| ColumnTypeItem::from_value(unquote(a)))
                    .collect::<Vec<_>>();
                if items.is_empty() {
                    return Err(DbGearError::Config(format!(
                        "{} type requires at least one item: '{}'",
                        base_type, original
                    )));
                }
                parsed.items = Some(items);
            } else {
                return Err(DbGearError::Config(format!(
                    "{} type requires an item list: '{}'",
                    base_type, original
                )));
            }
        }
        _ => {}
    }

    Ok(parsed)
}

/// Split `(a, b, c)` into trimmed arguments, honoring single-quoted commas.
fn paren_args(rest: &str) -> Option<Vec<String>> {
    let rest = rest.trim();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    for c in inner.chars() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                current.push(c);
            }
            ',' if !in_quote => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    Some(args)
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .map(|v| v.replace("''", "'"))
        .unwrap_or_else(|| trimmed.to_string())
}
