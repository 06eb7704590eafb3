//! History panel: search, filter, paginate, preview, export.

use super::{PAGE_SIZES, UiApp};
use eframe::egui;
use egui_extras::{Column, TableBuilder};
use fundus_core::{
    Disease, default_file_name, export_history_csv, export_with_dialog, format_timestamp, paginate,
};

impl UiApp {
    pub(super) fn render_history_panel(&mut self, ui: &mut egui::Ui) {
        let records = self.history.list(&self.history_query);

        ui.horizontal(|ui| {
            ui.heading("Diagnosis history");
            ui.add_space(12.0);
            if ui
                .add_enabled(!records.is_empty(), egui::Button::new("Export CSV"))
                .clicked()
            {
                let name = default_file_name("diagnosis_history", chrono::Local::now());
                match export_with_dialog(&self.dialogs, &name, "Export history", |path| {
                    export_history_csv(&records, path)
                }) {
                    Ok(Some(path)) => {
                        self.status = format!("History exported: {}", path.display())
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!("History export failed: {e}");
                        self.status = format!("History export failed: {e}");
                    }
                }
            }
        });

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label("Search");
            let resp = ui.add(
                egui::TextEdit::singleline(&mut self.history_query.search)
                    .hint_text("Disease or date...")
                    .desired_width(240.0),
            );
            if resp.changed() {
                self.history_page = 0;
            }
            if !self.history_query.search.is_empty() && ui.small_button("x").clicked() {
                self.history_query.search.clear();
                self.history_page = 0;
            }

            ui.add_space(12.0);
            ui.label("Disease");
            let mut selected = self.history_query.disease;
            egui::ComboBox::from_id_salt("history-disease")
                .selected_text(selected.map(|d| d.label()).unwrap_or("All"))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut selected, None, "All");
                    for disease in Disease::ALL {
                        ui.selectable_value(&mut selected, Some(disease), disease.label());
                    }
                });
            if selected != self.history_query.disease {
                self.history_query.disease = selected;
                self.history_page = 0;
            }
        });

        ui.add_space(6.0);
        let view = paginate(&records, self.history_page, self.history_page_size);
        self.history_page = view.page;

        let mut preview = None;
        TableBuilder::new(ui)
            .id_salt("history-table")
            .striped(true)
            .resizable(true)
            .max_scroll_height(420.0)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::initial(160.0))
            .column(Column::initial(170.0))
            .column(Column::initial(100.0))
            .column(Column::initial(240.0))
            .column(Column::initial(240.0))
            .column(Column::remainder())
            .header(20.0, |mut header| {
                for title in ["Diagnosed at", "Disease", "Confidence", "Left eye", "Right eye", ""] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for rec in view.items {
                    body.row(22.0, |mut row| {
                        row.col(|ui| {
                            ui.label(format_timestamp(&rec.result.diagnosed_at));
                        });
                        row.col(|ui| {
                            ui.label(rec.result.disease.label());
                        });
                        row.col(|ui| {
                            ui.label(rec.result.confidence_percent());
                        });
                        row.col(|ui| {
                            ui.label(rec.left_path.to_string_lossy().into_owned());
                        });
                        row.col(|ui| {
                            ui.label(rec.right_path.to_string_lossy().into_owned());
                        });
                        row.col(|ui| {
                            if ui.small_button("View").clicked() {
                                preview = Some(rec.id.clone());
                            }
                        });
                    });
                }
            });

        if records.is_empty() {
            ui.weak("No matching records");
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label("Rows per page");
            egui::ComboBox::from_id_salt("history-page-size")
                .selected_text(self.history_page_size.to_string())
                .show_ui(ui, |ui| {
                    for size in PAGE_SIZES {
                        if ui
                            .selectable_value(&mut self.history_page_size, size, size.to_string())
                            .clicked()
                        {
                            self.history_page = 0;
                        }
                    }
                });
            ui.add_space(12.0);
            if ui
                .add_enabled(view.page > 0, egui::Button::new("<"))
                .clicked()
            {
                self.history_page = view.page - 1;
            }
            ui.label(format!(
                "Page {} of {} ({} records)",
                view.page + 1,
                view.page_count,
                view.total
            ));
            if ui
                .add_enabled(view.page + 1 < view.page_count, egui::Button::new(">"))
                .clicked()
            {
                self.history_page = view.page + 1;
            }
        });

        if let Some(id) = preview {
            self.preview_record = self.history.get(&id);
        }
    }

    /// Detail window for the record chosen with "View".
    pub(super) fn render_record_preview(&mut self, ctx: &egui::Context) {
        let Some(record) = self.preview_record.clone() else {
            return;
        };
        let mut open = true;
        let mut close = false;
        egui::Window::new("Record details")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Diagnosed at: {}",
                    format_timestamp(&record.result.diagnosed_at)
                ));
                ui.label(format!(
                    "Result: {} (confidence {})",
                    record.result.disease,
                    record.result.confidence_percent()
                ));
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        ui.strong("Left eye");
                        self.paint_thumb(ui, Some(record.left_path.as_path()), 200.0, "");
                    });
                    ui.vertical(|ui| {
                        ui.strong("Right eye");
                        self.paint_thumb(ui, Some(record.right_path.as_path()), 200.0, "");
                    });
                });
                if let Some(combined) = &record.combined_path {
                    ui.strong("Combined");
                    self.paint_thumb(ui, Some(combined.as_path()), 240.0, "");
                }
                ui.add_space(6.0);
                if ui.button("Close").clicked() {
                    close = true;
                }
            });
        if !open || close {
            self.preview_record = None;
        }
    }
}
