//! Batch panel: pair two folders, run the queue, inspect and export results.

use super::{MAX_THUMBS, UiApp, stage_caption};
use eframe::egui;
use egui_extras::{Column, TableBuilder};
use fundus_core::{
    BatchState, default_file_name, export_results_csv, export_with_dialog, format_timestamp,
    select_folder_pairs,
};

impl UiApp {
    pub(super) fn render_batch_panel(&mut self, ui: &mut egui::Ui) {
        let busy = self.batch.is_processing();

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!busy, egui::Button::new("Select folders..."))
                .clicked()
            {
                self.select_batch_folders();
            }
            let has_pairs = !self.batch.pairs().is_empty();
            if ui
                .add_enabled(
                    has_pairs && !self.any_run_active(),
                    egui::Button::new("Start batch"),
                )
                .clicked()
            {
                self.start_batch();
            }
            if ui
                .add_enabled(has_pairs && !busy, egui::Button::new("Clear"))
                .clicked()
                && let Err(e) = self.batch.clear()
            {
                tracing::warn!("Could not clear batch: {e}");
            }
            if busy && ui.button("Cancel").clicked() {
                self.batch.cancel();
            }
            let can_export = !self.batch.results().is_empty() && !busy;
            if ui
                .add_enabled(can_export, egui::Button::new("Export CSV"))
                .clicked()
            {
                self.export_batch();
            }
        });

        let total = self.batch.pairs().len();
        if busy || self.batch.state().is_terminal() {
            ui.add_space(6.0);
            let progress = self.batch.progress();
            ui.add(egui::ProgressBar::new(progress).text(format!(
                "{:.0}%  {}",
                progress * 100.0,
                stage_caption(self.batch.state(), total)
            )));
            if let Some((pair, phase)) = self.batch.current_pair() {
                ui.weak(format!("{phase}: {} / {}", pair.left.name, pair.right.name));
            }
        }

        if total == 0 {
            ui.add_space(12.0);
            ui.weak("No image pairs loaded");
            return;
        }

        ui.add_space(8.0);
        self.render_pair_previews(ui);

        ui.add_space(8.0);
        ui.label(format!("Queue: {total} pairs"));
        let current = self.batch.current_pair().map(|(pair, _)| pair.id.clone());
        TableBuilder::new(ui)
            .id_salt("batch-queue")
            .striped(true)
            .max_scroll_height(180.0)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::initial(80.0))
            .column(Column::initial(260.0))
            .column(Column::initial(260.0))
            .column(Column::remainder())
            .header(20.0, |mut header| {
                for title in ["Pair", "Left eye", "Right eye", "Status"] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for (idx, pair) in self.batch.pairs().iter().enumerate() {
                    let status = pair_status(
                        current.as_deref() == Some(pair.id.as_str()),
                        self.batch.state(),
                        self.batch.results().iter().any(|r| r.pair.id == pair.id),
                        self.batch.failures().iter().any(|f| f.index == idx),
                    );
                    body.row(20.0, |mut row| {
                        row.col(|ui| {
                            ui.label(&pair.id);
                        });
                        row.col(|ui| {
                            ui.label(&pair.left.name);
                        });
                        row.col(|ui| {
                            ui.label(&pair.right.name);
                        });
                        row.col(|ui| {
                            ui.label(status);
                        });
                    });
                }
            });

        ui.add_space(12.0);
        ui.separator();
        ui.heading("Results");
        for failure in self.batch.failures() {
            ui.colored_label(
                egui::Color32::LIGHT_RED,
                format!(
                    "{} failed during {}: {}",
                    failure.pair_id,
                    failure.phase.to_string().to_lowercase(),
                    failure.message
                ),
            );
        }
        if self.batch.results().is_empty() {
            ui.weak("No results yet");
            return;
        }
        TableBuilder::new(ui)
            .id_salt("batch-results")
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::initial(80.0))
            .column(Column::initial(220.0))
            .column(Column::initial(220.0))
            .column(Column::initial(170.0))
            .column(Column::initial(100.0))
            .column(Column::remainder())
            .header(20.0, |mut header| {
                for title in ["Pair", "Left eye", "Right eye", "Disease", "Confidence", "Time"] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for done in self.batch.results() {
                    body.row(20.0, |mut row| {
                        row.col(|ui| {
                            ui.label(&done.pair.id);
                        });
                        row.col(|ui| {
                            ui.label(&done.pair.left.name);
                        });
                        row.col(|ui| {
                            ui.label(&done.pair.right.name);
                        });
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

    /// Left/right thumbnails for every queued pair.
    fn render_pair_previews(&mut self, ui: &mut egui::Ui) {
        let pairs: Vec<_> = self
            .batch
            .pairs()
            .iter()
            .take(MAX_PREVIEW_PAIRS)
            .map(|p| (p.id.clone(), p.left.path.clone(), p.right.path.clone()))
            .collect();
        let hidden = self.batch.pairs().len() - pairs.len();
        egui::CollapsingHeader::new(format!("Pair previews ({})", self.batch.pairs().len()))
            .id_salt("batch-previews")
            .default_open(true)
            .show(ui, |ui| {
                let columns = preview_columns(ui.available_width());
                egui::ScrollArea::vertical()
                    .id_salt("batch-previews-scroll")
                    .max_height(280.0)
                    .show(ui, |ui| {
                        egui::Grid::new("batch-previews-grid")
                            .spacing([PREVIEW_GAP, PREVIEW_GAP])
                            .show(ui, |ui| {
                                for (n, (id, left, right)) in pairs.iter().enumerate() {
                                    ui.vertical(|ui| {
                                        ui.small(id.as_str());
                                        ui.horizontal(|ui| {
                                            self.paint_thumb(
                                                ui,
                                                Some(left.as_path()),
                                                PREVIEW_THUMB,
                                                "",
                                            );
                                            self.paint_thumb(
                                                ui,
                                                Some(right.as_path()),
                                                PREVIEW_THUMB,
                                                "",
                                            );
                                        });
                                    });
                                    if (n + 1) % columns == 0 {
                                        ui.end_row();
                                    }
                                }
                            });
                        if hidden > 0 {
                            ui.weak(format!("{hidden} more pairs not previewed"));
                        }
                    });
            });
    }

    fn select_batch_folders(&mut self) {
        match select_folder_pairs(&self.dialogs) {
            Ok(Some(pairs)) => {
                let count = pairs.len();
                match self.batch.set_pairs(pairs) {
                    Ok(()) if count == 0 => {
                        self.status = "No image pairs found in the selected folders".to_string();
                    }
                    Ok(()) => self.status = format!("{count} image pairs loaded"),
                    Err(e) => self.status = format!("Could not load pairs: {e}"),
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Folder selection failed: {e}");
                self.status = format!("Folder selection failed: {e}");
            }
        }
    }

    pub(super) fn start_batch(&mut self) {
        let started = self
            .ensure_idle()
            .and_then(|_| self.batch.start(self.service.clone()));
        match started {
            Ok(()) => self.status = format!("Processing {} pairs...", self.batch.pairs().len()),
            Err(e) => {
                tracing::warn!("Could not start batch: {e}");
                self.status = format!("Could not start batch: {e}");
            }
        }
    }

    fn export_batch(&mut self) {
        let name = default_file_name("batch_diagnosis", chrono::Local::now());
        let rows = self.batch.results();
        match export_with_dialog(&self.dialogs, &name, "Save batch results", |path| {
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

const PREVIEW_THUMB: f32 = 96.0;
// Two textures per pair; stays under the thumbnail cache size.
const MAX_PREVIEW_PAIRS: usize = MAX_THUMBS / 2 - 16;
const PREVIEW_GAP: f32 = 12.0;

/// Pair cells (two thumbnails each) that fit across `width`.
fn preview_columns(width: f32) -> usize {
    let cell = PREVIEW_THUMB * 2.0 + PREVIEW_GAP * 2.0;
    (((width + PREVIEW_GAP) / cell).floor() as usize).max(1)
}

fn pair_status(current: bool, state: BatchState, diagnosed: bool, failed: bool) -> &'static str {
    if diagnosed {
        "Diagnosed"
    } else if failed {
        "Failed"
    } else if current {
        match state {
            BatchState::Stitching(_) => "Stitching",
            _ => "Diagnosing",
        }
    } else if state == BatchState::Cancelled {
        "Skipped"
    } else {
        "Queued"
    }
}
