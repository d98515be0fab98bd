use std::path::PathBuf;

use log::{debug, error, info, warn};

use crate::config::ViewerConfig;
use crate::data::fetcher::Fetch;
use crate::data::filter::{
    compute_view, filter_descriptors, matching_rows, FilterDescriptor, FilterState, RowCap,
    Selections,
};
use crate::data::loader::Loader;
use crate::data::model::{CellValue, Table};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Pipeline: the collaborators a session needs to load a URL
// ---------------------------------------------------------------------------

pub struct Pipeline<F> {
    pub fetcher: F,
    pub loader: Loader,
}

impl<F: Fetch> Pipeline<F> {
    /// Fetch, parse and persist `url`. Returns the table and where it was saved.
    pub fn run(&self, url: &str) -> Result<(Table, PathBuf), PipelineError> {
        let raw = self.fetcher.fetch(url)?;
        let hint = raw.extension_hint();
        let table = self.loader.load(&raw, &hint)?;
        Ok((table, self.loader.saved_path(&raw.file_name())))
    }
}

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    fn info(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            text: text.into(),
        }
    }

    fn success(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Success,
            text: text.into(),
        }
    }

    /// Every pipeline failure is presented the same way.
    fn from_error(err: &PipelineError) -> Self {
        Self {
            level: StatusLevel::Error,
            text: format!("{} ({err})", err.user_message()),
        }
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Empty,
    Loaded { url: String, table: Table },
}

/// Everything a user interaction can do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SubmitUrl(String),
    Reset,
    /// Add or remove one value from a multiselect.
    ToggleValue { column: String, value: CellValue },
    /// Single choice; `None` means "All".
    SetDropdown {
        column: String,
        value: Option<CellValue>,
    },
    ClearSelection(String),
    SetQuery(String),
    SetRowCap(i64),
    ToggleProjectedColumn(String),
    ShowAllColumns,
}

/// The full UI state of one window, independent of rendering.
pub struct Session {
    pub state: SessionState,

    /// Contents of the URL text field.
    pub url_input: String,

    /// Per-column filter selections.
    pub selections: Selections,

    /// Free-text search box contents.
    pub query: String,

    pub row_cap: RowCap,

    /// Columns picked for display; empty shows all.
    pub projection: Vec<String>,

    /// Filter widgets for the loaded table (cached per table).
    pub descriptors: Vec<FilterDescriptor>,

    /// Rows passing the filters before the row cap.
    pub matched_rows: usize,

    /// The displayed table (cached).
    pub view: Option<Table>,

    /// Status / error message shown in the UI.
    pub status: Option<StatusMessage>,

    search_columns: Vec<String>,
    pinned_filters: Vec<String>,
    single_shot: bool,
    default_row_cap: RowCap,
}

impl Session {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            state: SessionState::Empty,
            url_input: String::new(),
            selections: Selections::new(),
            query: String::new(),
            row_cap: config.row_cap(),
            projection: Vec::new(),
            descriptors: Vec::new(),
            matched_rows: 0,
            view: None,
            status: None,
            search_columns: config.search_columns.clone(),
            pinned_filters: config.pinned_filters.clone(),
            single_shot: config.single_shot,
            default_row_cap: config.row_cap(),
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match &self.state {
            SessionState::Empty => None,
            SessionState::Loaded { table, .. } => Some(table),
        }
    }

    /// Designated search columns present in the loaded table.
    pub fn searchable_columns(&self) -> Vec<&str> {
        match self.table() {
            Some(table) => self
                .search_columns
                .iter()
                .filter(|c| table.column(c).is_some())
                .map(String::as_str)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Snapshot of the current selections as a [`FilterState`].
    pub fn filter_state(&self) -> FilterState {
        FilterState {
            selections: self.selections.clone(),
            query: Some(self.query.clone()),
            search_columns: self.search_columns.clone(),
            row_cap: self.row_cap,
            projection: Some(self.projection.clone()),
        }
    }

    /// Apply one interaction and recompute whatever it invalidates.
    pub fn handle<F: Fetch>(&mut self, action: Action, pipeline: &Pipeline<F>) {
        match action {
            Action::SubmitUrl(url) => {
                self.url_input = url;
                self.submit(pipeline);
            }
            Action::Reset => self.reset(),
            Action::ToggleValue { column, value } => {
                let selected = self.selections.entry(column).or_default();
                if !selected.remove(&value) {
                    selected.insert(value);
                }
                self.refresh_view();
            }
            Action::SetDropdown { column, value } => {
                match value {
                    Some(v) => {
                        self.selections.insert(column, [v].into_iter().collect());
                    }
                    None => {
                        self.selections.remove(&column);
                    }
                }
                self.refresh_view();
            }
            Action::ClearSelection(column) => {
                self.selections.remove(&column);
                self.refresh_view();
            }
            Action::SetQuery(query) => {
                self.query = query;
                self.refresh_view();
            }
            Action::SetRowCap(n) => {
                self.row_cap = RowCap::new(n);
                self.refresh_view();
            }
            Action::ToggleProjectedColumn(column) => {
                if let Some(pos) = self.projection.iter().position(|c| *c == column) {
                    self.projection.remove(pos);
                } else {
                    self.projection.push(column);
                }
                self.refresh_view();
            }
            Action::ShowAllColumns => {
                self.projection.clear();
                self.refresh_view();
            }
        }
    }

    fn submit<F: Fetch>(&mut self, pipeline: &Pipeline<F>) {
        let url = self.url_input.trim().to_string();
        if url.is_empty() {
            return;
        }

        if self.single_shot && self.table().is_some() {
            warn!("Ignoring {url}: a table is already loaded");
            self.status = Some(StatusMessage::info(
                "A table is already loaded. Reset the session to load another URL.",
            ));
            return;
        }

        info!("Downloading {url}");
        match pipeline.run(&url) {
            Ok((table, saved_to)) => {
                info!(
                    "Loaded {} rows with columns {:?}",
                    table.len(),
                    table.column_names().collect::<Vec<_>>()
                );
                self.status = Some(StatusMessage::success(format!(
                    "Loaded {} rows × {} columns. Saved to {}",
                    table.len(),
                    table.columns().len(),
                    saved_to.display()
                )));
                self.set_table(url, table);
            }
            Err(e) => {
                error!("Failed to load {url}: {e}");
                self.status = Some(StatusMessage::from_error(&e));
            }
        }
    }

    /// Ingest a newly loaded table; filters naming old columns are dropped.
    fn set_table(&mut self, url: String, table: Table) {
        self.descriptors = filter_descriptors(&table, &self.pinned_filters);
        self.selections.clear();
        self.query.clear();
        self.projection.clear();
        self.state = SessionState::Loaded { url, table };
        self.refresh_view();
    }

    /// Back to an empty session with default filters.
    fn reset(&mut self) {
        info!("Session reset");
        self.state = SessionState::Empty;
        self.url_input.clear();
        self.selections.clear();
        self.query.clear();
        self.projection.clear();
        self.row_cap = self.default_row_cap;
        self.descriptors.clear();
        self.matched_rows = 0;
        self.view = None;
        self.status = None;
    }

    /// Recompute the cached view after a filter change.
    fn refresh_view(&mut self) {
        let state = self.filter_state();
        if let Some(table) = self.table() {
            let matched = matching_rows(table, &state).len();
            let view = compute_view(table, &state);
            debug!("{matched} of {} rows match, showing {}", table.len(), view.len());
            self.matched_rows = matched;
            self.view = Some(view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fetcher::{parse_url, RawContent};
    use crate::error::FetchError;
    use std::collections::HashMap;
    use std::path::Path;

    /// Serves canned bodies; unknown URLs answer 404.
    struct StubFetcher {
        bodies: HashMap<&'static str, &'static str>,
    }

    impl Fetch for StubFetcher {
        fn fetch(&self, url: &str) -> Result<RawContent, FetchError> {
            let parsed = parse_url(url)?;
            match self.bodies.get(url) {
                Some(body) => Ok(RawContent::new(parsed, body.as_bytes().to_vec())),
                None => Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    code: 404,
                }),
            }
        }
    }

    const CARS_URL: &str = "https://example.com/cars.csv";
    const CARS: &str = "Make,Fuel,Model\nFord,Petrol,Focus\nBMW,Diesel,X5\nFord,Diesel,Fiesta\n";
    const VANS_URL: &str = "https://example.com/vans.json";
    const VANS: &str = r#"[{"Make":"VW","Model":"Transporter"}]"#;
    const NOTES_URL: &str = "https://example.com/notes.txt";

    fn pipeline(dir: &Path) -> Pipeline<StubFetcher> {
        let bodies = HashMap::from([(CARS_URL, CARS), (VANS_URL, VANS), (NOTES_URL, "a,b\n1,2\n")]);
        Pipeline {
            fetcher: StubFetcher { bodies },
            loader: Loader {
                data_dir: dir.to_path_buf(),
                ..Loader::default()
            },
        }
    }

    fn loaded_session(config: &ViewerConfig, pipeline: &Pipeline<StubFetcher>) -> Session {
        let mut session = Session::new(config);
        session.handle(Action::SubmitUrl(CARS_URL.into()), pipeline);
        session
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn successful_submit_loads_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());

        let session = loaded_session(&ViewerConfig::default(), &pipeline);

        assert_eq!(session.table().unwrap().len(), 3);
        assert_eq!(session.view.as_ref().unwrap().len(), 3);
        assert_eq!(session.matched_rows, 3);
        assert_eq!(session.status.as_ref().unwrap().level, StatusLevel::Success);
        assert!(dir.path().join("cars.csv").exists());

        let columns: Vec<&str> = session.descriptors.iter().map(|d| d.column.as_str()).collect();
        assert_eq!(columns, vec!["Make", "Fuel", "Model"]);
    }

    #[test]
    fn not_found_leaves_session_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let mut session = Session::new(&ViewerConfig::default());

        session.handle(Action::SubmitUrl("https://example.com/gone.csv".into()), &pipeline);

        assert_eq!(session.state, SessionState::Empty);
        assert!(session.view.is_none());
        let status = session.status.unwrap();
        assert_eq!(status.level, StatusLevel::Error);
        assert!(status.text.contains("404"));
    }

    #[test]
    fn failed_reload_keeps_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let mut session = loaded_session(&ViewerConfig::default(), &pipeline);

        session.handle(Action::SubmitUrl("https://example.com/gone.csv".into()), &pipeline);

        assert!(matches!(&session.state, SessionState::Loaded { url, .. } if url == CARS_URL));
        assert_eq!(session.status.unwrap().level, StatusLevel::Error);
    }

    #[test]
    fn invalid_url_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let mut session = Session::new(&ViewerConfig::default());

        session.handle(Action::SubmitUrl("not a url".into()), &pipeline);

        assert_eq!(session.state, SessionState::Empty);
        assert_eq!(session.status.unwrap().level, StatusLevel::Error);
    }

    #[test]
    fn unsupported_extension_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let mut session = Session::new(&ViewerConfig::default());

        session.handle(Action::SubmitUrl(NOTES_URL.into()), &pipeline);

        assert_eq!(session.state, SessionState::Empty);
        let status = session.status.unwrap();
        assert_eq!(status.level, StatusLevel::Error);
        assert!(status.text.contains("unsupported file format 'txt'"));
        assert!(!dir.path().join("notes.txt").exists());
    }

    #[test]
    fn new_url_replaces_table_and_clears_filters() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let mut session = loaded_session(&ViewerConfig::default(), &pipeline);
        session.handle(
            Action::ToggleValue {
                column: "Fuel".into(),
                value: text("Diesel"),
            },
            &pipeline,
        );

        session.handle(Action::SubmitUrl(VANS_URL.into()), &pipeline);

        assert_eq!(session.table().unwrap().len(), 1);
        assert!(session.selections.is_empty());
        assert_eq!(session.view.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn single_shot_refuses_second_url_until_reset() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let config = ViewerConfig {
            single_shot: true,
            ..ViewerConfig::default()
        };
        let mut session = loaded_session(&config, &pipeline);

        session.handle(Action::SubmitUrl(VANS_URL.into()), &pipeline);
        assert_eq!(session.table().unwrap().len(), 3);
        assert_eq!(session.status.as_ref().unwrap().level, StatusLevel::Info);

        session.handle(Action::Reset, &pipeline);
        assert_eq!(session.state, SessionState::Empty);

        session.handle(Action::SubmitUrl(VANS_URL.into()), &pipeline);
        assert_eq!(session.table().unwrap().len(), 1);
    }

    #[test]
    fn filters_update_the_cached_view() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let mut session = loaded_session(&ViewerConfig::default(), &pipeline);

        session.handle(
            Action::SetDropdown {
                column: "Make".into(),
                value: Some(text("Ford")),
            },
            &pipeline,
        );
        assert_eq!(session.matched_rows, 2);

        session.handle(Action::SetQuery("fies".into()), &pipeline);
        let view = session.view.as_ref().unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.column("Model").unwrap().values, vec![text("Fiesta")]);

        session.handle(Action::SetQuery(String::new()), &pipeline);
        session.handle(
            Action::SetDropdown {
                column: "Make".into(),
                value: None,
            },
            &pipeline,
        );
        assert_eq!(session.matched_rows, 3);
    }

    #[test]
    fn toggling_a_value_twice_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let mut session = loaded_session(&ViewerConfig::default(), &pipeline);
        let toggle = Action::ToggleValue {
            column: "Make".into(),
            value: text("BMW"),
        };

        session.handle(toggle.clone(), &pipeline);
        assert_eq!(session.matched_rows, 1);

        session.handle(toggle, &pipeline);
        assert_eq!(session.matched_rows, 3);
    }

    #[test]
    fn row_cap_and_projection_only_change_the_view() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let mut session = loaded_session(&ViewerConfig::default(), &pipeline);

        session.handle(Action::SetRowCap(1000), &pipeline);
        assert_eq!(session.row_cap.get(), 100);

        session.handle(Action::ToggleProjectedColumn("Model".into()), &pipeline);
        let view = session.view.as_ref().unwrap();
        assert_eq!(view.column_names().collect::<Vec<_>>(), vec!["Model"]);
        assert_eq!(session.table().unwrap().columns().len(), 3);

        session.handle(Action::ShowAllColumns, &pipeline);
        assert_eq!(session.view.as_ref().unwrap().columns().len(), 3);
    }

    #[test]
    fn blank_url_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let mut session = Session::new(&ViewerConfig::default());

        session.handle(Action::SubmitUrl("   ".into()), &pipeline);

        assert_eq!(session.state, SessionState::Empty);
        assert!(session.status.is_none());
    }
}
