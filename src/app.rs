use eframe::egui;

use crate::data::fetcher::HttpFetcher;
use crate::state::{Action, Pipeline, Session};
use crate::ui::{panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct TabFetchApp {
    pub session: Session,
    pipeline: Pipeline<HttpFetcher>,
}

impl TabFetchApp {
    pub fn new(session: Session, pipeline: Pipeline<HttpFetcher>, initial_url: Option<String>) -> Self {
        let mut app = Self { session, pipeline };
        if let Some(url) = initial_url {
            app.session.handle(Action::SubmitUrl(url), &app.pipeline);
        }
        app
    }
}

impl eframe::App for TabFetchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut actions = Vec::new();

        // ---- Top panel: URL entry and status ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.session, &mut actions);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &self.session, &mut actions);
            });

        // ---- Central panel: table ----
        egui::CentralPanel::default().show(ctx, |ui| {
            table::table_view(ui, &self.session);
        });

        for action in actions {
            self.session.handle(action, &self.pipeline);
        }
    }
}
