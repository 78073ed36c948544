//! Data-source adapters producing fixture rows for one data-model.
//!
//! Adapters are cold until `load()` runs; afterwards `rows()` is a
//! materialized, repeatable view. Values are tagged: the SQL-expression
//! splice (`NOW()` and friends) is decided here, never re-inferred at the
//! I/O layer.

pub mod exec;
pub mod xlsx;
pub mod yaml;

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{DbGearError, Result};
use crate::model::datamodel::{DataModel, DataType};

/// One cell value of a fixture row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A SQL expression spliced verbatim into the INSERT column list,
    /// e.g. `NOW()`.
    SqlFragment(String),
    /// A nested structure bound as its JSON text form.
    Json(serde_json::Value),
}

impl RowValue {
    /// Normalize a YAML value into a tagged cell. Strings containing `(`
    /// are treated as SQL expressions; nested structures become JSON.
    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self> {
        Ok(match value {
            serde_yaml::Value::Null => RowValue::Null,
            serde_yaml::Value::Bool(b) => RowValue::Bool(*b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RowValue::Int(i)
                } else {
                    RowValue::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_yaml::Value::String(s) => Self::from_string(s.clone()),
            other => RowValue::Json(serde_json::to_value(other)?),
        })
    }

    /// Normalize a JSON value (exec adapter contract).
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RowValue::Null,
            serde_json::Value::Bool(b) => RowValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RowValue::Int(i)
                } else {
                    RowValue::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Self::from_string(s.clone()),
            other => RowValue::Json(other.clone()),
        }
    }

    /// Tag a string cell: function-call shapes are SQL fragments.
    pub fn from_string(s: String) -> Self {
        if s.contains('(') {
            RowValue::SqlFragment(s)
        } else {
            RowValue::Str(s)
        }
    }

    /// Driver value for binding; JSON cells bind as their text form.
    /// SQL fragments are never bound as parameters by the insert path, but
    /// a fragment appearing past the first row degrades to a plain string.
    pub fn to_bind_value(&self) -> Result<mysql_async::Value> {
        Ok(match self {
            RowValue::Null => mysql_async::Value::NULL,
            RowValue::Bool(b) => mysql_async::Value::from(*b),
            RowValue::Int(i) => mysql_async::Value::from(*i),
            RowValue::Float(f) => mysql_async::Value::from(*f),
            RowValue::Str(s) | RowValue::SqlFragment(s) => mysql_async::Value::from(s.as_str()),
            RowValue::Json(v) => mysql_async::Value::from(serde_json::to_string(v)?),
        })
    }
}

/// One fixture row: ordered column name -> value.
pub type Row = IndexMap<String, RowValue>;

/// Contract shared by all adapters.
pub trait DataSource {
    /// Informational name of the backing artifact.
    fn filename(&self) -> String;

    /// Whether the backing artifact is present without loading it.
    fn exists(&self) -> bool {
        true
    }

    /// Read the backing artifact into the internal row buffer.
    fn load(&mut self) -> Result<()>;

    /// Rows loaded by [`DataSource::load`]; repeatable iteration.
    fn rows(&self) -> &[Row];
}

/// Constructor for one adapter kind. `segment` applies to segmented YAML
/// payloads only.
pub type SourceCtor = fn(&DataModel, Option<&str>) -> Result<Box<dyn DataSource>>;

/// Registry of adapter constructors, seeded at engine start.
pub struct SourceRegistry {
    ctors: HashMap<&'static str, SourceCtor>,
}

impl SourceRegistry {
    /// The standard adapter set: `yaml`, `xlsx`, `exec`.
    pub fn standard() -> Self {
        let mut ctors: HashMap<&'static str, SourceCtor> = HashMap::new();
        ctors.insert("yaml", yaml::create);
        ctors.insert("xlsx", xlsx::create);
        ctors.insert("exec", exec::create);
        Self { ctors }
    }

    /// Replace or add a constructor (used by tests and embedders).
    pub fn register(&mut self, data_type: &'static str, ctor: SourceCtor) {
        self.ctors.insert(data_type, ctor);
    }

    fn create(&self, model: &DataModel, segment: Option<&str>) -> Result<Box<dyn DataSource>> {
        let tag = model.data_type.as_str();
        let ctor = self.ctors.get(tag).ok_or_else(|| {
            DbGearError::Config(format!("no data source registered for type '{}'", tag))
        })?;
        ctor(model, segment)
    }

    /// All adapters for one data-model: one per segment for segmented YAML
    /// payloads, otherwise a single adapter.
    pub fn sources_for(&self, model: &DataModel) -> Result<Vec<Box<dyn DataSource>>> {
        if model.data_type == DataType::Yaml {
            let segments = model.segments()?;
            if !segments.is_empty() {
                return segments
                    .iter()
                    .map(|s| self.create(model, Some(s)))
                    .collect();
            }
        }
        Ok(vec![self.create(model, None)?])
    }
}
