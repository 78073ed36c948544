//! Data-models: per-(schema, table) fixture descriptors.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DbGearError, Result};

use super::mapping::Mapping;

/// How fixture data is reconciled with preserved rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// The fixture is authoritative; no restore.
    DropCreate,
    /// Rows are maintained by hand; fixture wins, missing rows come back
    /// from backup.
    Manual,
    /// Fixture wins, missing rows come back from backup.
    UpdateDiff,
    /// Backup wins over the fixture by primary key.
    Replace,
}

/// Which adapter produces the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "yaml")]
    Yaml,
    #[serde(rename = "xlsx")]
    Xlsx,
    /// External producer: run a command, read JSON rows from stdout.
    #[serde(rename = "exec", alias = "python")]
    Exec,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Yaml => "yaml",
            DataType::Xlsx => "xlsx",
            DataType::Exec => "exec",
        }
    }
}

/// Fixture descriptor stored as `<schema>@<table>.yaml` in a mapping
/// directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataModel {
    /// Mapping directory holding this descriptor and its payloads.
    #[serde(skip)]
    pub dir: PathBuf,

    #[serde(skip)]
    pub environ: String,

    #[serde(skip)]
    pub map_name: String,

    #[serde(skip)]
    pub schema_name: String,

    #[serde(skip)]
    pub table_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,

    pub description: String,

    pub sync_mode: SyncMode,

    pub data_type: DataType,

    /// Adapter-specific path: workbook for `xlsx`, program for `exec`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,

    /// Adapter arguments (argv for `exec`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_args: Vec<String>,

    /// Adapter parameters (e.g. `header_row` / `start_row` for `xlsx`).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub data_params: IndexMap<String, serde_yaml::Value>,

    /// Explicit insertion dependencies as `schema@table` keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl DataModel {
    /// Load a data-model from its mapping directory. The `schema@table`
    /// identity comes from the file name.
    pub fn load(mapping: &Mapping, file_name: &str) -> Result<Self> {
        let (schema_name, table_name) = parse_file_name(file_name)?;
        let path = mapping.dir().join(file_name);
        let content = std::fs::read_to_string(&path)?;
        let mut model: DataModel = serde_yaml::from_str(&content)?;
        model.dir = mapping.dir();
        model.environ = mapping.environ.clone();
        model.map_name = mapping.name.clone();
        model.schema_name = schema_name;
        model.table_name = table_name;
        Ok(model)
    }

    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(self.dir.join(self.filename()), yaml)?;
        Ok(())
    }

    /// Identity key in `schema@table` form.
    pub fn key(&self) -> String {
        format!("{}@{}", self.schema_name, self.table_name)
    }

    pub fn filename(&self) -> String {
        format!("{}@{}.yaml", self.schema_name, self.table_name)
    }

    /// Segment names of this data-model's `.dat` payloads, sorted. Empty
    /// when only the unsegmented file is used.
    pub fn segments(&self) -> Result<Vec<String>> {
        let prefix = format!("{}@{}#", self.schema_name, self.table_name);
        let mut segments = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(rest) = file_name.strip_prefix(&prefix) {
                if let Some(segment) = rest.strip_suffix(".dat") {
                    segments.push(segment.to_string());
                }
            }
        }
        segments.sort();
        Ok(segments)
    }

    /// Get an integer parameter from `data_params`.
    pub fn param_u32(&self, key: &str) -> Option<u32> {
        self.data_params.get(key).and_then(|v| v.as_u64()).map(|v| v as u32)
    }
}

fn parse_file_name(file_name: &str) -> Result<(String, String)> {
    let stem = file_name.strip_suffix(".yaml").ok_or_else(|| {
        DbGearError::Config(format!("data-model file must end in .yaml: '{}'", file_name))
    })?;
    match stem.split_once('@') {
        Some((schema, table)) if !schema.is_empty() && !table.is_empty() => {
            Ok((schema.to_string(), table.to_string()))
        }
        _ => Err(DbGearError::Config(format!(
            "data-model file must be named <schema>@<table>.yaml: '{}'",
            file_name
        ))),
    }
}
