use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use log::info;
use serde_json::Value as JsonValue;

use super::fetcher::RawContent;
use super::model::{CellValue, Column, ColumnType, Table, DEFAULT_CARDINALITY_THRESHOLD};
use crate::error::LoadError;

/// Tokens read as a missing value in CSV cells. Any spelling of `nan` is
/// missing too, see [`is_missing_token`].
const NA_TOKENS: &[&str] = &["", "NA", "N/A", "null", "NULL", "None"];

/// Default directory downloaded tables are saved to.
pub const DEFAULT_DATA_DIR: &str = "data/raw";

// ---------------------------------------------------------------------------
// Format dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Excel,
    Json,
}

impl Format {
    /// Map a lowercase extension hint to a format.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint {
            "csv" => Some(Format::Csv),
            "xls" | "xlsx" => Some(Format::Excel),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Format::Csv => "CSV",
            Format::Excel => "Excel workbook",
            Format::Json => "JSON",
        }
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Parses downloaded content into a [`Table`] and saves a CSV copy.
#[derive(Debug, Clone)]
pub struct Loader {
    pub data_dir: PathBuf,
    pub cardinality_threshold: usize,
}

impl Default for Loader {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cardinality_threshold: DEFAULT_CARDINALITY_THRESHOLD,
        }
    }
}

impl Loader {
    /// Parse `content` according to `hint`, then persist the table as CSV
    /// under `data_dir`.
    ///
    /// An unsupported hint fails before any parsing or disk access.
    pub fn load(&self, content: &RawContent, hint: &str) -> Result<Table, LoadError> {
        let table = self.parse(&content.bytes, hint)?;
        let path = self.saved_path(&content.file_name());
        write_csv(&table, &path)?;
        info!(
            "Saved {} rows × {} columns to {}",
            table.len(),
            table.columns().len(),
            path.display()
        );
        Ok(table)
    }

    /// Where a download called `file_name` is saved.
    pub fn saved_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    /// Parse bytes without touching the filesystem.
    pub fn parse(&self, bytes: &[u8], hint: &str) -> Result<Table, LoadError> {
        let hint = hint.to_ascii_lowercase();
        let format = Format::from_hint(&hint).ok_or(LoadError::UnsupportedFormat { hint })?;

        let columns = match format {
            Format::Csv => parse_csv(bytes),
            Format::Excel => parse_excel(bytes),
            Format::Json => parse_json(bytes),
        }
        .map_err(|details| LoadError::ParseFailure {
            format: format.name(),
            details,
        })?;

        Table::new(columns, self.cardinality_threshold).map_err(|e| LoadError::ParseFailure {
            format: format.name(),
            details: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Type inference
// ---------------------------------------------------------------------------

/// Best-effort typing of raw text cells: integer, then float, then boolean,
/// otherwise everything stays text.
fn infer_text_column(name: String, raw: Vec<Option<String>>) -> Column {
    if raw.iter().all(Option::is_none) {
        return Column::new(name, ColumnType::Empty, vec![CellValue::Missing; raw.len()]);
    }

    if let Some(values) = convert_all(&raw, |s| s.parse::<i64>().ok().map(CellValue::Integer)) {
        return Column::new(name, ColumnType::Integer, values);
    }
    if let Some(values) = convert_all(&raw, parse_float) {
        return Column::new(name, ColumnType::Float, values);
    }
    if let Some(values) = convert_all(&raw, |s| parse_bool(s).map(CellValue::Bool)) {
        return Column::new(name, ColumnType::Boolean, values);
    }

    let values = raw
        .into_iter()
        .map(|cell| cell.map_or(CellValue::Missing, CellValue::Text))
        .collect();
    Column::new(name, ColumnType::Text, values)
}

/// Convert every present cell with `parse`, or give up on the first miss.
fn convert_all(
    raw: &[Option<String>],
    parse: impl Fn(&str) -> Option<CellValue>,
) -> Option<Vec<CellValue>> {
    raw.iter()
        .map(|cell| match cell {
            None => Some(CellValue::Missing),
            Some(s) => parse(s.trim()),
        })
        .collect()
}

fn is_missing_token(s: &str) -> bool {
    let s = s.trim();
    NA_TOKENS.contains(&s) || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("-nan")
}

/// `inf` and `-inf` stay floats; a NaN never becomes a cell value.
fn parse_float(s: &str) -> Option<CellValue> {
    let f = s.parse::<f64>().ok()?;
    Some(if f.is_nan() { CellValue::Missing } else { CellValue::Float(f) })
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Settle a column of already-typed cells on one type. Integers mixed with
/// floats widen to float; any other mix falls back to text.
fn unify_column(name: String, values: Vec<CellValue>) -> Column {
    let mut has_int = false;
    let mut has_float = false;
    let mut has_bool = false;
    let mut has_text = false;
    for v in &values {
        match v {
            CellValue::Integer(_) => has_int = true,
            CellValue::Float(_) => has_float = true,
            CellValue::Bool(_) => has_bool = true,
            CellValue::Text(_) => has_text = true,
            CellValue::Missing => {}
        }
    }

    let dtype = match (has_int, has_float, has_bool, has_text) {
        (false, false, false, false) => ColumnType::Empty,
        (true, false, false, false) => ColumnType::Integer,
        (_, true, false, false) => ColumnType::Float,
        (false, false, true, false) => ColumnType::Boolean,
        _ => ColumnType::Text,
    };

    let values = match dtype {
        ColumnType::Float => values
            .into_iter()
            .map(|v| match v {
                CellValue::Integer(i) => CellValue::Float(i as f64),
                other => other,
            })
            .collect(),
        ColumnType::Text => values
            .into_iter()
            .map(|v| match v {
                CellValue::Missing | CellValue::Text(_) => v,
                other => CellValue::Text(other.to_string()),
            })
            .collect(),
        _ => values,
    };

    Column::new(name, dtype, values)
}

/// Replace blank header names and suffix repeated ones with `.1`, `.2`, ….
fn normalize_headers(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut names: Vec<String> = Vec::new();

    for (idx, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            name
        };
        let mut candidate = base.clone();
        while names.contains(&candidate) {
            let n = counts.entry(base.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{base}.{n}");
        }
        names.push(candidate);
    }
    names
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Header row gives the column names. Short rows are padded with missing
/// values; rows with extra fields are rejected.
fn parse_csv(bytes: &[u8]) -> Result<Vec<Column>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    if headers.is_empty() {
        return Err("no columns to parse".to_string());
    }
    let names = normalize_headers(headers.iter().map(str::to_string));

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("row {}: {e}", row_no + 1))?;
        if record.len() > names.len() {
            return Err(format!(
                "row {}: expected {} fields, saw {}",
                row_no + 1,
                names.len(),
                record.len()
            ));
        }
        for (col_idx, column) in cells.iter_mut().enumerate() {
            let cell = record
                .get(col_idx)
                .filter(|s| !is_missing_token(s))
                .map(str::to_string);
            column.push(cell);
        }
    }

    Ok(names
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| infer_text_column(name, raw))
        .collect())
}

// ---------------------------------------------------------------------------
// Excel
// ---------------------------------------------------------------------------

/// First worksheet, first row is the header.
fn parse_excel(bytes: &[u8]) -> Result<Vec<Column>, String> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|e| e.to_string())?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no worksheets".to_string())?
        .map_err(|e| e.to_string())?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| "first worksheet is empty".to_string())?;
    let names = normalize_headers(header.iter().map(|cell| match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }));

    let mut values: Vec<Vec<CellValue>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (col_idx, column) in values.iter_mut().enumerate() {
            column.push(row.get(col_idx).map_or(CellValue::Missing, excel_cell));
        }
    }

    Ok(names
        .into_iter()
        .zip(values)
        .map(|(name, vals)| unify_column(name, vals))
        .collect())
}

fn excel_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) if s.is_empty() => CellValue::Missing,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Empty | Data::Error(_) => CellValue::Missing,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Make": "Ford", "Fuel": "Petrol", "Year": 2019 },
///   { "Make": "BMW", "Year": 2021 }
/// ]
/// ```
///
/// Keys become columns in first-seen order; a record without a key gets a
/// missing value in that column.
fn parse_json(bytes: &[u8]) -> Result<Vec<Column>, String> {
    let root: JsonValue = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    let records = root
        .as_array()
        .ok_or_else(|| "expected top-level JSON array".to_string())?;

    let mut names: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| format!("row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !index.contains_key(key) {
                index.insert(key.clone(), names.len());
                names.push(key.clone());
            }
        }
    }

    let mut values: Vec<Vec<CellValue>> =
        vec![vec![CellValue::Missing; records.len()]; names.len()];
    for (row, rec) in records.iter().enumerate() {
        if let Some(obj) = rec.as_object() {
            for (key, val) in obj {
                values[index[key]][row] = json_cell(val);
            }
        }
    }

    Ok(names
        .into_iter()
        .zip(values)
        .map(|(name, vals)| unify_column(name, vals))
        .collect())
}

fn json_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Missing,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Write `table` as CSV to `path`, creating parent directories.
pub fn write_csv(table: &Table, path: &Path) -> Result<(), LoadError> {
    let persist = |message: String| LoadError::PersistFailure {
        path: path.to_path_buf(),
        message,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| persist(e.to_string()))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| persist(e.to_string()))?;
    writer
        .write_record(table.column_names())
        .map_err(|e| persist(e.to_string()))?;
    for row in 0..table.len() {
        writer
            .write_record(table.row(row).iter().map(|v| v.to_csv_field()))
            .map_err(|e| persist(e.to_string()))?;
    }
    writer.flush().map_err(|e| persist(e.to_string()))
}
