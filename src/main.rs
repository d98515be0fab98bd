mod app;
mod config;
mod data;
mod error;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use eframe::egui;

use app::TabFetchApp;
use config::ViewerConfig;
use data::fetcher::HttpFetcher;
use state::{Pipeline, Session};

/// Download a CSV, Excel or JSON table from a URL and filter it interactively.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory downloaded tables are saved to (overrides the config file).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// URL to load on startup.
    #[arg(long)]
    url: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ViewerConfig::from_file(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    log::debug!("{config:?}");

    let pipeline = Pipeline {
        fetcher: HttpFetcher::new().context("building HTTP client")?,
        loader: config.loader(),
    };
    let session = Session::new(&config);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "tabfetch – URL Table Viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(TabFetchApp::new(session, pipeline, args.url)))),
    )
    .map_err(|e| anyhow!("window error: {e}"))
}
