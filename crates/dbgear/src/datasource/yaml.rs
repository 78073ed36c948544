//! YAML fixture adapter: `<schema>@<table>[#<segment>].dat` files holding a
//! sequence of row mappings.

use std::path::PathBuf;

use crate::error::{DbGearError, Result};
use crate::model::datamodel::DataModel;

use super::{DataSource, Row, RowValue};

pub struct YamlDataSource {
    path: PathBuf,
    file_name: String,
    rows: Vec<Row>,
}

/// Constructor registered under `yaml`.
pub fn create(model: &DataModel, segment: Option<&str>) -> Result<Box<dyn DataSource>> {
    let file_name = match segment {
        Some(segment) => format!("{}@{}#{}.dat", model.schema_name, model.table_name, segment),
        None => format!("{}@{}.dat", model.schema_name, model.table_name),
    };
    Ok(Box::new(YamlDataSource {
        path: model.dir.join(&file_name),
        file_name,
        rows: Vec::new(),
    }))
}

impl YamlDataSource {
    /// Write the buffered rows back to the payload file.
    pub fn save(&self) -> Result<()> {
        let values: Vec<serde_yaml::Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut mapping = serde_yaml::Mapping::new();
                for (key, value) in row {
                    mapping.insert(
                        serde_yaml::Value::String(key.clone()),
                        to_yaml_value(value),
                    );
                }
                serde_yaml::Value::Mapping(mapping)
            })
            .collect();
        std::fs::write(&self.path, serde_yaml::to_string(&values)?)?;
        Ok(())
    }
}

fn to_yaml_value(value: &RowValue) -> serde_yaml::Value {
    match value {
        RowValue::Null => serde_yaml::Value::Null,
        RowValue::Bool(b) => serde_yaml::Value::Bool(*b),
        RowValue::Int(i) => serde_yaml::Value::Number((*i).into()),
        RowValue::Float(f) => serde_yaml::Value::Number((*f).into()),
        RowValue::Str(s) | RowValue::SqlFragment(s) => serde_yaml::Value::String(s.clone()),
        RowValue::Json(json) => serde_yaml::to_value(json).unwrap_or(serde_yaml::Value::Null),
    }
}

impl DataSource for YamlDataSource {
    fn filename(&self) -> String {
        self.file_name.clone()
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Err(DbGearError::Config(format!(
                "data source file {} does not exist",
                self.path.display()
            )));
        }
        let content = std::fs::read_to_string(&self.path)?;
        let documents: Vec<serde_yaml::Value> = serde_yaml::from_str(&content)?;

        let mut rows = Vec::with_capacity(documents.len());
        for document in &documents {
            let mapping = document.as_mapping().ok_or_else(|| {
                DbGearError::Config(format!(
                    "{}: every fixture entry must be a mapping",
                    self.file_name
                ))
            })?;
            let mut row = Row::new();
            for (key, value) in mapping {
                let key = key.as_str().ok_or_else(|| {
                    DbGearError::Config(format!("{}: column names must be strings", self.file_name))
                })?;
                row.insert(key.to_string(), RowValue::from_yaml(value)?);
            }
            rows.push(row);
        }
        self.rows = rows;
        Ok(())
    }

    fn rows(&self) -> &[Row] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::environ::testutil::write_environ;
    use crate::model::mapping::Mapping;

    fn model_with_payload(dir: &std::path::Path, payload: &str) -> DataModel {
        write_environ(dir, "dev");
        let mapping = Mapping::load(dir, "dev", "app").unwrap();
        std::fs::write(
            mapping.dir().join("main@users.yaml"),
            "description: seed\nsync_mode: drop_create\ndata_type: yaml\n",
        )
        .unwrap();
        std::fs::write(mapping.dir().join("main@users.dat"), payload).unwrap();
        DataModel::load(&mapping, "main@users.yaml").unwrap()
    }

    #[test]
    fn test_load_rows_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let model = model_with_payload(
            dir.path(),
            "- id: 1\n  name: Alice\n- id: 2\n  name: Bob\n  created_at: NOW()\n",
        );

        let mut source = create(&model, None).unwrap();
        assert_eq!(source.filename(), "main@users.dat");
        source.load().unwrap();

        let rows = source.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], RowValue::Int(1));
        assert_eq!(rows[1]["name"], RowValue::Str("Bob".to_string()));
        assert_eq!(
            rows[1]["created_at"],
            RowValue::SqlFragment("NOW()".to_string())
        );
    }

    #[test]
    fn test_load_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let model = model_with_payload(dir.path(), "- id: 1\n");
        let mut source = create(&model, None).unwrap();
        source.load().unwrap();
        let first = source.rows().len();
        // A second walk over the same buffer sees the same rows.
        assert_eq!(source.rows().len(), first);
    }

    #[test]
    fn test_missing_file_raises() {
        let dir = tempfile::tempdir().unwrap();
        let model = model_with_payload(dir.path(), "[]");
        let mut source = create(&model, Some("01")).unwrap();
        assert_eq!(source.filename(), "main@users#01.dat");
        assert!(matches!(source.load(), Err(DbGearError::Config(_))));
    }

    #[test]
    fn test_non_mapping_entry_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let model = model_with_payload(dir.path(), "- 42\n");
        let mut source = create(&model, None).unwrap();
        assert!(matches!(source.load(), Err(DbGearError::Config(_))));
    }
}
