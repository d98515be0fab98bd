use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::filter::RowCap;
use crate::data::loader::{Loader, DEFAULT_DATA_DIR};
use crate::data::model::DEFAULT_CARDINALITY_THRESHOLD;

// ---------------------------------------------------------------------------
// Viewer configuration
// ---------------------------------------------------------------------------

/// Settings read from an optional JSON file. Every field has a default, so
/// `{}` is a valid config.
///
/// ```json
/// {
///   "data_dir": "data/raw",
///   "pinned_filters": ["Make", "Fuel", "LicenceStatus"],
///   "search_columns": ["Model", "GenModel"]
/// }
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Directory the CSV copy of each download is written to.
    pub data_dir: PathBuf,
    /// Text columns with fewer distinct values than this get a filter widget.
    pub cardinality_threshold: usize,
    /// Initial row cap; clamped like the slider.
    pub default_row_cap: i64,
    /// Columns searched by the free-text box.
    pub search_columns: Vec<String>,
    /// Dataset-specific columns shown as single-choice dropdowns first.
    pub pinned_filters: Vec<String>,
    /// Refuse a second URL until the session is reset.
    pub single_shot: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cardinality_threshold: DEFAULT_CARDINALITY_THRESHOLD,
            default_row_cap: RowCap::DEFAULT as i64,
            search_columns: vec!["Model".to_string(), "GenModel".to_string()],
            pinned_filters: Vec::new(),
            single_shot: false,
        }
    }
}

impl ViewerConfig {
    /// Read and parse a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn loader(&self) -> Loader {
        Loader {
            data_dir: self.data_dir.clone(),
            cardinality_threshold: self.cardinality_threshold,
        }
    }

    pub fn row_cap(&self) -> RowCap {
        RowCap::new(self.default_row_cap)
    }
}
