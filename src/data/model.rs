use std::collections::{BTreeSet, HashSet};
use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// CellValue – a single cell in a column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Selections are kept in `BTreeSet`s downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Missing,
}

// -- Equality and ordering both go through `Ord`, so floats compare with
// `total_cmp` and a NaN cell equals itself --

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    /// Missing < Bool < Integer < Float < Text; values of one variant
    /// compare naturally.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::{Bool, Float, Integer, Missing, Text};
        fn rank(v: &CellValue) -> u8 {
            match v {
                Missing => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        match (self, other) {
            (Missing, Missing) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Missing => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Missing => write!(f, "<missing>"),
        }
    }
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Text written to a CSV field. Missing values become an empty field.
    pub fn to_csv_field(&self) -> String {
        match self {
            CellValue::Missing => String::new(),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// Inferred storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    /// Every value is missing.
    Empty,
}

/// Whether a column is offered as a discrete filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Categorical,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
    pub kind: ColumnKind,
    pub values: Vec<CellValue>,
}

impl Column {
    /// Build a column, inferring nothing: `dtype` must already describe `values`.
    /// The kind is decided by [`Table::new`].
    pub fn new(name: impl Into<String>, dtype: ColumnType, values: Vec<CellValue>) -> Self {
        Column {
            name: name.into(),
            dtype,
            kind: ColumnKind::Other,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sorted distinct values, missing values excluded.
    pub fn distinct_values(&self) -> BTreeSet<CellValue> {
        self.values
            .iter()
            .filter(|v| !v.is_missing())
            .cloned()
            .collect()
    }

    /// Copy of this column restricted to `rows`, in the given order.
    /// Type and kind carry over from the source column.
    pub fn take(&self, rows: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            dtype: self.dtype,
            kind: self.kind,
            values: rows.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }

    fn classify(&self, cardinality_threshold: usize) -> ColumnKind {
        match self.dtype {
            ColumnType::Text | ColumnType::Boolean => {
                let distinct: HashSet<&CellValue> =
                    self.values.iter().filter(|v| !v.is_missing()).collect();
                if distinct.len() < cardinality_threshold {
                    ColumnKind::Categorical
                } else {
                    ColumnKind::Other
                }
            }
            ColumnType::Integer | ColumnType::Float | ColumnType::Empty => ColumnKind::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// Rows × named columns. Column names are unique and every column has the
/// same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

/// Default distinct-value count below which a text column is categorical.
pub const DEFAULT_CARDINALITY_THRESHOLD: usize = 50;

impl Table {
    /// Validate the columns and tag each one as categorical or not.
    pub fn new(mut columns: Vec<Column>, cardinality_threshold: usize) -> Result<Self, TableError> {
        let n_rows = columns.first().map_or(0, Column::len);

        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(TableError::DuplicateColumn(col.name.clone()));
            }
            if col.len() != n_rows {
                return Err(TableError::LengthMismatch {
                    column: col.name.clone(),
                    expected: n_rows,
                    actual: col.len(),
                });
            }
        }

        for col in &mut columns {
            col.kind = col.classify(cardinality_threshold);
        }

        Ok(Table { columns, n_rows })
    }

    /// Assemble a derived table from columns already validated elsewhere.
    pub(crate) fn from_parts(columns: Vec<Column>, n_rows: usize) -> Self {
        Table { columns, n_rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Columns tagged categorical at load time, in table order.
    pub fn categorical_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Categorical)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Values of row `idx` in column order.
    pub fn row(&self, idx: usize) -> Vec<&CellValue> {
        self.columns.iter().map(|c| &c.values[idx]).collect()
    }
}
