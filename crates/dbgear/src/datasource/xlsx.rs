//! Spreadsheet fixture adapter.
//!
//! The sheet is chosen by table name; a header row is followed by data
//! rows. Dotted header names expand into nested JSON cells, and a handful
//! of special cell strings are normalized the way hand-maintained
//! workbooks tend to write them.

use std::path::PathBuf;

use calamine::{open_workbook, Data, Reader, Xlsx};
use serde_json::Value as JsonValue;

use crate::error::{DbGearError, Result};
use crate::model::datamodel::DataModel;

use super::{DataSource, Row, RowValue};

const DEFAULT_HEADER_ROW: u32 = 1;
const DEFAULT_START_ROW: u32 = 2;

pub struct XlsxDataSource {
    path: PathBuf,
    table_name: String,
    header_row: u32,
    start_row: u32,
    rows: Vec<Row>,
}

/// Constructor registered under `xlsx`.
pub fn create(model: &DataModel, _segment: Option<&str>) -> Result<Box<dyn DataSource>> {
    let path = model.data_path.clone().ok_or_else(|| {
        DbGearError::Config(format!(
            "data-model {} uses xlsx but sets no data_path",
            model.key()
        ))
    })?;
    Ok(Box::new(XlsxDataSource {
        path,
        table_name: model.table_name.clone(),
        header_row: model.param_u32("header_row").unwrap_or(DEFAULT_HEADER_ROW),
        start_row: model.param_u32("start_row").unwrap_or(DEFAULT_START_ROW),
        rows: Vec::new(),
    }))
}

impl DataSource for XlsxDataSource {
    fn filename(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&mut self) -> Result<()> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path)
            .map_err(|e| DbGearError::Config(format!("cannot open {}: {}", self.path.display(), e)))?;
        let range = workbook.worksheet_range(&self.table_name).map_err(|e| {
            DbGearError::Config(format!(
                "sheet '{}' not readable in {}: {}",
                self.table_name,
                self.path.display(),
                e
            ))
        })?;

        let grid: Vec<&[Data]> = range.rows().collect();
        let header_idx = (self.header_row as usize).saturating_sub(1);
        let headers: Vec<String> = match grid.get(header_idx) {
            Some(cells) => cells
                .iter()
                .enumerate()
                .map(|(i, cell)| match cell {
                    Data::Empty => format!("Column_{}", i + 1),
                    other => other.to_string().trim().to_string(),
                })
                .collect(),
            None => {
                return Err(DbGearError::Config(format!(
                    "sheet '{}' has no header row {}",
                    self.table_name, self.header_row
                )))
            }
        };

        let mut rows = Vec::new();
        for cells in grid.iter().skip((self.start_row as usize).saturating_sub(1)) {
            let mut flat: Vec<(String, RowValue)> = Vec::with_capacity(headers.len());
            let mut has_data = false;
            for (i, header) in headers.iter().enumerate() {
                let value = cells.get(i).map(convert_cell).unwrap_or(RowValue::Null);
                if value != RowValue::Null {
                    has_data = true;
                }
                flat.push((header.clone(), value));
            }
            if has_data {
                rows.push(expand_dotted_keys(flat));
            }
        }
        self.rows = rows;
        Ok(())
    }

    fn rows(&self) -> &[Row] {
        &self.rows
    }
}

/// Normalize one cell into a tagged value.
fn convert_cell(cell: &Data) -> RowValue {
    match cell {
        Data::Empty => RowValue::Null,
        Data::Bool(b) => RowValue::Bool(*b),
        Data::Int(i) => RowValue::Int(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                RowValue::Int(*f as i64)
            } else {
                RowValue::Float(*f)
            }
        }
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => RowValue::Str(naive.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => RowValue::Null,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => RowValue::Str(s.clone()),
        Data::String(s) => convert_string_cell(s),
        Data::Error(_) => RowValue::Null,
    }
}

fn convert_string_cell(raw: &str) -> RowValue {
    let value = raw.trim();
    let upper = value.to_uppercase();
    match upper.as_str() {
        "NOW()" | "CURRENT_TIMESTAMP" => return RowValue::SqlFragment("NOW()".to_string()),
        "SYSTEM" | "CURRENT_USER" => return RowValue::Str("SYSTEM".to_string()),
        "NULL" | "NONE" | "" => return RowValue::Null,
        _ => {}
    }
    if value.contains('.') {
        if let Ok(f) = value.parse::<f64>() {
            return RowValue::Float(f);
        }
    } else if let Ok(i) = value.parse::<i64>() {
        return RowValue::Int(i);
    }
    RowValue::from_string(value.to_string())
}

/// Expand `{"col.a": 1, "col.b": 2}` into `{"col": {"a": 1, "b": 2}}`.
fn expand_dotted_keys(flat: Vec<(String, RowValue)>) -> Row {
    let mut row = Row::new();
    for (key, value) in flat {
        match key.split_once('.') {
            None => {
                row.insert(key, value);
            }
            Some((root, rest)) => {
                let slot = row
                    .entry(root.to_string())
                    .or_insert_with(|| RowValue::Json(JsonValue::Object(Default::default())));
                if let RowValue::Json(JsonValue::Object(map)) = slot {
                    insert_nested(map, rest, to_json(&value));
                }
            }
        }
    }
    row
}

fn insert_nested(map: &mut serde_json::Map<String, JsonValue>, path: &str, value: JsonValue) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = map
                .entry(head.to_string())
                .or_insert_with(|| JsonValue::Object(Default::default()));
            if let JsonValue::Object(inner) = slot {
                insert_nested(inner, rest, value);
            }
        }
    }
}

fn to_json(value: &RowValue) -> JsonValue {
    match value {
        RowValue::Null => JsonValue::Null,
        RowValue::Bool(b) => JsonValue::Bool(*b),
        RowValue::Int(i) => JsonValue::from(*i),
        RowValue::Float(f) => JsonValue::from(*f),
        RowValue::Str(s) | RowValue::SqlFragment(s) => JsonValue::String(s.clone()),
        RowValue::Json(v) => v.clone(),
    }
}
