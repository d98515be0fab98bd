use std::collections::{BTreeMap, BTreeSet};

use super::model::{CellValue, Column, Table};

// ---------------------------------------------------------------------------
// Row cap
// ---------------------------------------------------------------------------

/// Number of rows shown, always within [`RowCap::MIN`, `RowCap::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCap(usize);

impl RowCap {
    pub const MIN: usize = 5;
    pub const MAX: usize = 100;
    pub const DEFAULT: usize = 10;

    /// Clamp any requested value into range.
    pub fn new(requested: i64) -> Self {
        RowCap(requested.clamp(Self::MIN as i64, Self::MAX as i64) as usize)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for RowCap {
    fn default() -> Self {
        RowCap(Self::DEFAULT)
    }
}

// ---------------------------------------------------------------------------
// Filter state: everything the user chose for the current view
// ---------------------------------------------------------------------------

/// Per-column selection: maps column_name → set of accepted values.
/// If a column is absent or its set is empty, it means "no filter" (show all).
pub type Selections = BTreeMap<String, BTreeSet<CellValue>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub selections: Selections,
    /// Free-text query; blank counts as no query.
    pub query: Option<String>,
    /// Columns the query is matched against.
    pub search_columns: Vec<String>,
    pub row_cap: RowCap,
    /// Columns to display. `None` or empty shows all columns.
    pub projection: Option<Vec<String>>,
}

impl FilterState {
    fn active_query(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

/// Return indices of rows that pass every active predicate, before the row cap.
///
/// A row passes a column selection when:
/// * The column is not in `selections`, or its set is empty → passes (no constraint)
/// * The table has no such column → passes
/// * The row's value for that column is in the set → passes
///
/// With a query set, at least one search column must contain it,
/// case-insensitively. Missing values never match.
pub fn matching_rows(table: &Table, state: &FilterState) -> Vec<usize> {
    let selections: Vec<(&Column, &BTreeSet<CellValue>)> = state
        .selections
        .iter()
        .filter(|(_, selected)| !selected.is_empty())
        .filter_map(|(col, selected)| table.column(col).map(|c| (c, selected)))
        .collect();

    let query = state.active_query();
    let search: Vec<&Column> = state
        .search_columns
        .iter()
        .filter_map(|name| table.column(name))
        .collect();

    (0..table.len())
        .filter(|&row| {
            selections
                .iter()
                .all(|(col, selected)| selected.contains(&col.values[row]))
        })
        .filter(|&row| match &query {
            None => true,
            Some(q) => search.iter().any(|col| match &col.values[row] {
                CellValue::Missing => false,
                v => v.to_string().to_lowercase().contains(q.as_str()),
            }),
        })
        .collect()
}

/// Derive the displayed table: filter, truncate to the row cap, project.
/// Never fails and never modifies `table`.
pub fn compute_view(table: &Table, state: &FilterState) -> Table {
    let mut rows = matching_rows(table, state);
    rows.truncate(state.row_cap.get());

    let projected: Option<&Vec<String>> = state.projection.as_ref().filter(|p| !p.is_empty());
    let columns = table
        .columns()
        .iter()
        .filter(|c| projected.map_or(true, |p| p.contains(&c.name)))
        .map(|c| c.take(&rows))
        .collect();

    Table::from_parts(columns, rows.len())
}

// ---------------------------------------------------------------------------
// Filter widget descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    /// Single choice with an "All" entry.
    Dropdown,
    MultiSelect,
}

/// One filter control for a rendering layer to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDescriptor {
    pub column: String,
    pub kind: WidgetKind,
    pub options: Vec<CellValue>,
}

/// Dropdowns for the pinned columns the table has (in `pinned` order),
/// then a multiselect for every other categorical column (in table order).
pub fn filter_descriptors(table: &Table, pinned: &[String]) -> Vec<FilterDescriptor> {
    let dropdowns = pinned
        .iter()
        .filter_map(|name| table.column(name))
        .map(|col| FilterDescriptor {
            column: col.name.clone(),
            kind: WidgetKind::Dropdown,
            options: col.distinct_values().into_iter().collect(),
        });

    let multiselects = table
        .categorical_columns()
        .filter(|col| !pinned.contains(&col.name))
        .map(|col| FilterDescriptor {
            column: col.name.clone(),
            kind: WidgetKind::MultiSelect,
            options: col.distinct_values().into_iter().collect(),
        });

    let mut out: Vec<FilterDescriptor> = Vec::new();
    for d in dropdowns.chain(multiselects) {
        if !out.iter().any(|o| o.column == d.column) {
            out.push(d);
        }
    }
    out
}
