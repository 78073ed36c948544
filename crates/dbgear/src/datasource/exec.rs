//! External-producer adapter: run a configured command and read a JSON
//! array of row objects from its stdout.
//!
//! This replaces the original in-process plugin loading; producers are
//! ordinary programs named by `data_path` with `data_args` as argv.

use std::path::PathBuf;
use std::process::Command;

use crate::error::{DbGearError, Result};
use crate::model::datamodel::DataModel;

use super::{DataSource, Row, RowValue};

pub struct ExecDataSource {
    program: PathBuf,
    args: Vec<String>,
    rows: Vec<Row>,
}

/// Constructor registered under `exec` (YAML alias: `python`).
pub fn create(model: &DataModel, _segment: Option<&str>) -> Result<Box<dyn DataSource>> {
    let program = model.data_path.clone().ok_or_else(|| {
        DbGearError::Config(format!(
            "data-model {} uses exec but sets no data_path",
            model.key()
        ))
    })?;
    Ok(Box::new(ExecDataSource {
        program,
        args: model.data_args.clone(),
        rows: Vec::new(),
    }))
}

impl ExecDataSource {
    fn parse_rows(&self, stdout: &[u8]) -> Result<Vec<Row>> {
        let documents: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_slice(stdout)?;
        let mut rows = Vec::with_capacity(documents.len());
        for document in &documents {
            let mut row = Row::new();
            for (key, value) in document {
                row.insert(key.clone(), RowValue::from_json(value));
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

impl DataSource for ExecDataSource {
    fn filename(&self) -> String {
        self.program.display().to_string()
    }

    fn load(&mut self) -> Result<()> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| {
                DbGearError::Config(format!(
                    "cannot run data producer {}: {}",
                    self.program.display(),
                    e
                ))
            })?;
        if !output.status.success() {
            return Err(DbGearError::Config(format!(
                "data producer {} failed ({}): {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        self.rows = self.parse_rows(&output.stdout)?;
        Ok(())
    }

    fn rows(&self) -> &[Row] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ExecDataSource {
        ExecDataSource {
            program: PathBuf::from("producer"),
            args: vec![],
            rows: Vec::new(),
        }
    }

    #[test]
    fn test_parse_rows_tags_values() {
        let rows = source()
            .parse_rows(br#"[{"id": 1, "name": "Alice", "created_at": "NOW()", "meta": {"k": 1}}]"#)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], RowValue::Int(1));
        assert_eq!(rows[0]["name"], RowValue::Str("Alice".to_string()));
        assert_eq!(
            rows[0]["created_at"],
            RowValue::SqlFragment("NOW()".to_string())
        );
        assert!(matches!(rows[0]["meta"], RowValue::Json(_)));
    }

    #[test]
    fn test_parse_rows_rejects_non_array() {
        assert!(source().parse_rows(br#"{"id": 1}"#).is_err());
    }

    #[test]
    fn test_missing_program_fails_load() {
        let mut src = ExecDataSource {
            program: PathBuf::from("/nonexistent/producer"),
            args: vec![],
            rows: Vec::new(),
        };
        assert!(matches!(src.load(), Err(DbGearError::Config(_))));
    }
}
