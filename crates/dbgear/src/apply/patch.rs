//! Partial-restore patches: a column projection plus WHERE predicate
//! replayed from a table's backup into the live table.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DbGearError, Result};

/// A patch file: `{ name, select: [...], where?: ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patch {
    pub name: String,

    /// Columns or expressions projected from the backup table.
    #[serde(default)]
    pub select: Vec<String>,

    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
}

/// Conservative denylist for `where`. Keywords match on word boundaries so
/// identifiers like `update_user` pass.
const DENIED_PATTERNS: &[&str] = &[";", "--", "/*", "*/"];
const DENIED_KEYWORDS: &[&str] = &["DROP", "DELETE", "UPDATE"];

impl Patch {
    /// Load a patch file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DbGearError::Patch(format!("cannot read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&content)
            .map_err(|e| DbGearError::Patch(format!("invalid patch file {}: {}", path.display(), e)))
    }

    /// Validate against the run's target table. Failures abort the run.
    pub fn validate(&self, target: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(DbGearError::Patch("table name cannot be empty".to_string()));
        }
        if self.select.is_empty() {
            return Err(DbGearError::Patch("select list cannot be empty".to_string()));
        }
        if self.name != target {
            return Err(DbGearError::Patch(format!(
                "patch is for table '{}' but the target is '{}'",
                self.name, target
            )));
        }
        if let Some(where_clause) = &self.where_clause {
            let upper = where_clause.to_uppercase();
            for pattern in DENIED_PATTERNS {
                if upper.contains(pattern) {
                    return Err(DbGearError::Patch(format!(
                        "denylisted pattern '{}' in WHERE clause",
                        pattern
                    )));
                }
            }
            for keyword in DENIED_KEYWORDS {
                if contains_word(&upper, keyword) {
                    return Err(DbGearError::Patch(format!(
                        "denylisted keyword '{}' in WHERE clause",
                        keyword
                    )));
                }
            }
        }
        Ok(())
    }

    /// The `INSERT ... SELECT` replayed from the backup table.
    pub fn build_sql(&self, env: &str, ymd: &str) -> String {
        let mut sql = format!(
            "INSERT INTO {}.{} SELECT {} FROM {}.bak_{}_{}",
            env,
            self.name,
            self.select.join(", "),
            env,
            self.name,
            ymd
        );
        if let Some(where_clause) = &self.where_clause {
            sql.push_str(&format!(" WHERE {}", where_clause));
        }
        sql
    }
}

/// Word-boundary containment: `needle` must not be preceded or followed by
/// an identifier character.
fn contains_word(haystack: &str, needle: &str) -> bool {
    let bytes = haystack.as_bytes();
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    for (idx, _) in haystack.match_indices(needle) {
        let before_ok = idx == 0 || !is_word(bytes[idx - 1]);
        let after = idx + needle.len();
        let after_ok = after >= bytes.len() || !is_word(bytes[after]);
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(where_clause: Option<&str>) -> Patch {
        Patch {
            name: "orders".to_string(),
            select: vec!["id".to_string(), "total".to_string()],
            where_clause: where_clause.map(str::to_string),
        }
    }

    #[test]
    fn test_build_sql_exact_form() {
        let p = patch(Some("status = 'paid'"));
        assert_eq!(
            p.build_sql("app", "20240101000000"),
            "INSERT INTO app.orders SELECT id, total FROM app.bak_orders_20240101000000 \
             WHERE status = 'paid'"
        );
    }

    #[test]
    fn test_build_sql_without_where() {
        let p = patch(None);
        assert_eq!(
            p.build_sql("app", "20240101000000"),
            "INSERT INTO app.orders SELECT id, total FROM app.bak_orders_20240101000000"
        );
    }

    #[test]
    fn test_validate_accepts_simple_predicate() {
        assert!(patch(Some("status = 'paid'")).validate("orders").is_ok());
    }

    #[test]
    fn test_validate_rejects_denied_keywords() {
        for bad in ["DROP TABLE x", "delete from x", "1=1 OR UPDATE x"] {
            assert!(matches!(
                patch(Some(bad)).validate("orders"),
                Err(DbGearError::Patch(_))
            ));
        }
    }

    #[test]
    fn test_validate_allows_identifiers_containing_keywords() {
        assert!(patch(Some("updated_at > '2024-01-01'")).validate("orders").is_ok());
        assert!(patch(Some("update_user = 'admin'")).validate("orders").is_ok());
    }

    #[test]
    fn test_validate_rejects_comment_and_statement_tokens() {
        for bad in ["1=1; SELECT 1", "1=1 -- x", "1=1 /* x */"] {
            assert!(patch(Some(bad)).validate("orders").is_err());
        }
    }

    #[test]
    fn test_validate_rejects_empty_fields_and_target_mismatch() {
        let mut p = patch(None);
        p.select.clear();
        assert!(p.validate("orders").is_err());

        let mut p = patch(None);
        p.name.clear();
        assert!(p.validate("orders").is_err());

        assert!(patch(None).validate("users").is_err());
    }

    #[test]
    fn test_load_missing_file_is_patch_error() {
        assert!(matches!(
            Patch::load("/nonexistent/orders.patch.yaml"),
            Err(DbGearError::Patch(_))
        ));
    }

    #[test]
    fn test_load_parses_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.patch.yaml");
        std::fs::write(
            &path,
            "name: orders\nselect: [id, total]\nwhere: \"status = 'paid'\"\n",
        )
        .unwrap();
        let p = Patch::load(&path).unwrap();
        assert_eq!(p.name, "orders");
        assert_eq!(p.where_clause.as_deref(), Some("status = 'paid'"));
    }
}
