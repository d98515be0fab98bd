use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::{FilterDescriptor, RowCap, WidgetKind};
use crate::state::{Action, Session, StatusLevel};

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the URL field, Load / Reset buttons and the status line.
pub fn top_bar(ui: &mut Ui, session: &mut Session, actions: &mut Vec<Action>) {
    ui.add_space(4.0);
    ui.horizontal(|ui: &mut Ui| {
        ui.label("URL:");
        let response = ui.add(
            egui::TextEdit::singleline(&mut session.url_input)
                .hint_text("https://example.com/data.csv")
                .desired_width((ui.available_width() - 140.0).max(120.0)),
        );
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

        if ui.button("Load").clicked() || submitted {
            actions.push(Action::SubmitUrl(session.url_input.clone()));
        }
        if ui.button("Reset").clicked() {
            actions.push(Action::Reset);
        }
    });

    ui.horizontal(|ui: &mut Ui| {
        if let Some(table) = session.table() {
            ui.label(format!(
                "{} rows loaded, {} match",
                table.len(),
                session.matched_rows
            ));
            ui.separator();
        }

        if let Some(status) = &session.status {
            let color = match status.level {
                StatusLevel::Info => Color32::LIGHT_BLUE,
                StatusLevel::Success => Color32::GREEN,
                StatusLevel::Error => Color32::RED,
            };
            ui.label(RichText::new(&status.text).color(color));
        }
    });
    ui.add_space(4.0);
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, session: &Session, actions: &mut Vec<Action>) {
    ui.heading("Filters");
    ui.separator();

    let Some(table) = session.table() else {
        ui.label("No table loaded.");
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Row cap ----
            let mut cap = session.row_cap.get();
            if ui
                .add(egui::Slider::new(&mut cap, RowCap::MIN..=RowCap::MAX).text("rows"))
                .changed()
            {
                actions.push(Action::SetRowCap(cap as i64));
            }

            // ---- Free-text search ----
            let searchable = session.searchable_columns();
            if !searchable.is_empty() {
                ui.add_space(6.0);
                ui.strong(format!("Search {}", searchable.join(", ")));
                let mut query = session.query.clone();
                if ui.text_edit_singleline(&mut query).changed() {
                    actions.push(Action::SetQuery(query));
                }
            }
            ui.separator();

            // ---- Column chooser ----
            let n_shown = if session.projection.is_empty() {
                table.columns().len()
            } else {
                session.projection.len()
            };
            egui::CollapsingHeader::new(
                RichText::new(format!("Columns  ({n_shown}/{})", table.columns().len())).strong(),
            )
            .id_salt("columns")
            .default_open(false)
            .show(ui, |ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    actions.push(Action::ShowAllColumns);
                }
                for name in table.column_names() {
                    let mut checked = session.projection.iter().any(|c| c == name);
                    if ui.checkbox(&mut checked, name).changed() {
                        actions.push(Action::ToggleProjectedColumn(name.to_string()));
                    }
                }
            });
            ui.separator();

            // ---- Per-column filter widgets ----
            for descriptor in &session.descriptors {
                match descriptor.kind {
                    WidgetKind::Dropdown => dropdown(ui, session, descriptor, actions),
                    WidgetKind::MultiSelect => multiselect(ui, session, descriptor, actions),
                }
            }
        });
}

/// Single-choice filter with an "All" entry.
fn dropdown(ui: &mut Ui, session: &Session, descriptor: &FilterDescriptor, actions: &mut Vec<Action>) {
    let col = &descriptor.column;
    let current = session
        .selections
        .get(col)
        .and_then(|selected| selected.iter().next());

    ui.strong(col.as_str());
    egui::ComboBox::from_id_salt(("dropdown", col))
        .selected_text(current.map_or_else(|| "All".to_string(), |v| v.to_string()))
        .show_ui(ui, |ui: &mut Ui| {
            if ui.selectable_label(current.is_none(), "All").clicked() {
                actions.push(Action::SetDropdown {
                    column: col.clone(),
                    value: None,
                });
            }
            for val in &descriptor.options {
                if ui
                    .selectable_label(current == Some(val), val.to_string())
                    .clicked()
                {
                    actions.push(Action::SetDropdown {
                        column: col.clone(),
                        value: Some(val.clone()),
                    });
                }
            }
        });
    ui.add_space(4.0);
}

/// Checkbox list; nothing ticked means no restriction.
fn multiselect(ui: &mut Ui, session: &Session, descriptor: &FilterDescriptor, actions: &mut Vec<Action>) {
    let col = &descriptor.column;
    let selected = session.selections.get(col);
    let n_selected = selected.map_or(0, |s| s.len());
    let header_text = format!("{col}  ({n_selected}/{})", descriptor.options.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(("multiselect", col))
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            if ui.small_button("Clear").clicked() {
                actions.push(Action::ClearSelection(col.clone()));
            }
            for val in &descriptor.options {
                let mut checked = selected.is_some_and(|s| s.contains(val));
                if ui.checkbox(&mut checked, val.to_string()).changed() {
                    actions.push(Action::ToggleValue {
                        column: col.clone(),
                        value: val.clone(),
                    });
                }
            }
        });
}
