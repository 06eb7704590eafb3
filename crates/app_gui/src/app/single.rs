//! Single-pair panel: pick both eyes, diagnose, export.

use super::{UiApp, stage_caption};
use eframe::egui;
use egui_extras::{Column, TableBuilder};
use fundus_core::{Eye, default_file_name, export_results_csv, export_with_dialog, format_timestamp};

impl UiApp {
    pub(super) fn render_single_panel(&mut self, ui: &mut egui::Ui) {
        let busy = self.single_run.is_processing();

        ui.horizontal(|ui| {
            for eye in [Eye::Left, Eye::Right] {
                ui.vertical(|ui| {
                    ui.strong(eye.label());
                    let path = self.single.image(eye).map(|img| img.path.clone());
                    self.paint_thumb(ui, path.as_deref(), 260.0, "No image selected");
                    let caption = match eye {
                        Eye::Left => "Select left eye...",
                        Eye::Right => "Select right eye...",
                    };
                    if ui.add_enabled(!busy, egui::Button::new(caption)).clicked() {
                        self.select_eye(eye);
                    }
                });
                ui.add_space(16.0);
            }

            let combined = self
                .single_run
                .results()
                .first()
                .and_then(|r| r.combined.as_ref())
                .map(|c| c.path.clone());
            if combined.is_some() {
                ui.vertical(|ui| {
                    ui.strong("Combined");
                    self.paint_thumb(ui, combined.as_deref(), 260.0, "");
                });
            }
        });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(
                    self.single.can_diagnose() && !self.any_run_active(),
                    egui::Button::new("Diagnose"),
                )
                .clicked()
            {
                self.start_single();
            }
            if ui
                .add_enabled(self.single.can_clear() && !busy, egui::Button::new("Clear"))
                .clicked()
            {
                self.single.clear();
                if let Err(e) = self.single_run.clear() {
                    tracing::warn!("Could not clear results: {e}");
                }
            }
            if busy && ui.button("Cancel").clicked() {
                self.single_run.cancel();
            }
        });

        if busy || self.single_run.state().is_terminal() {
            ui.add_space(6.0);
            let progress = self.single_run.progress();
            ui.add(egui::ProgressBar::new(progress).text(format!(
                "{:.0}%  {}",
                progress * 100.0,
                stage_caption(self.single_run.state(), 1)
            )));
        }

        ui.add_space(12.0);
        ui.separator();
        ui.horizontal(|ui| {
            ui.heading("Result");
            let can_export = !self.single_run.results().is_empty() && !busy;
            if ui
                .add_enabled(can_export, egui::Button::new("Export CSV"))
                .clicked()
            {
                self.export_single();
            }
        });

        if self.single_run.results().is_empty() {
            ui.weak("No diagnosis yet");
            return;
        }
        TableBuilder::new(ui)
            .id_salt("single-results")
            .striped(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::initial(200.0))
            .column(Column::initial(110.0))
            .column(Column::remainder())
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong("Disease");
                });
                header.col(|ui| {
                    ui.strong("Confidence");
                });
                header.col(|ui| {
                    ui.strong("Diagnosed at");
                });
            })
            .body(|mut body| {
                for done in self.single_run.results() {
                    body.row(20.0, |mut row| {
                        row.col(|ui| {
                            ui.label(done.result.disease.label());
                        });
                        row.col(|ui| {
                            ui.label(done.result.confidence_percent());
                        });
                        row.col(|ui| {
                            ui.label(format_timestamp(&done.result.diagnosed_at));
                        });
                    });
                }
            });
    }

    fn select_eye(&mut self, eye: Eye) {
        if self.single.select(eye, &self.dialogs) {
            // New input invalidates the previous result.
            if let Err(e) = self.single_run.clear() {
                tracing::warn!("Could not clear results: {e}");
            }
            self.status = format!("{} image selected", eye.label());
        }
    }

    pub(super) fn start_single(&mut self) {
        let Some(pair) = self.single.pair() else {
            return;
        };
        let started = self
            .ensure_idle()
            .and_then(|_| self.single_run.set_pairs(vec![pair]))
            .and_then(|_| self.single_run.start(self.service.clone()));
        match started {
            Ok(()) => self.status = "Diagnosing...".to_string(),
            Err(e) => {
                tracing::warn!("Could not start diagnosis: {e}");
                self.status = format!("Could not start diagnosis: {e}");
            }
        }
    }

    fn export_single(&mut self) {
        let name = default_file_name("diagnosis", chrono::Local::now());
        let rows = self.single_run.results();
        match export_with_dialog(&self.dialogs, &name, "Save diagnosis result", |path| {
            export_results_csv(rows, path)
        }) {
            Ok(Some(path)) => self.status = format!("CSV exported: {}", path.display()),
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Export failed: {e}");
                self.status = format!("Export failed: {e}");
            }
        }
    }
}
