use eframe::egui::{Align, Layout, RichText, ScrollArea, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::model::ColumnType;
use crate::state::Session;

const ROW_HEIGHT: f32 = 20.0;

/// Render the filtered view in the central panel.
pub fn table_view(ui: &mut Ui, session: &Session) {
    let view = match &session.view {
        Some(view) => view,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Enter the URL of a .csv, .xlsx or .json file to get started");
            });
            return;
        }
    };

    if view.columns().is_empty() {
        ui.label("No columns selected.");
        return;
    }

    ui.label(format!(
        "Showing {} of {} matching rows",
        view.len(),
        session.matched_rows
    ));
    ui.separator();

    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(Layout::left_to_right(Align::Center))
            .columns(TableColumn::auto().at_least(60.0), view.columns().len())
            .header(ROW_HEIGHT, |mut header| {
                for col in view.columns() {
                    header.col(|ui: &mut Ui| {
                        ui.strong(&col.name);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, view.len(), |mut row| {
                    let idx = row.index();
                    for col in view.columns() {
                        row.col(|ui: &mut Ui| {
                            let value = &col.values[idx];
                            let text = RichText::new(value.to_string());
                            let text = if value.is_missing() { text.weak() } else { text };
                            if matches!(col.dtype, ColumnType::Integer | ColumnType::Float) {
                                ui.with_layout(Layout::right_to_left(Align::Center), |ui: &mut Ui| {
                                    ui.label(text);
                                });
                            } else {
                                ui.label(text);
                            }
                        });
                    }
                });
            });
    });
}
