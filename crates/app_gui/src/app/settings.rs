//! Settings panel rendering for simulation timing, history paging, and versions.

use super::{PAGE_SIZES, UiApp};
use eframe::egui;
use fundus_core::{Disease, SimulatedDiagnosis};
use std::sync::Arc;

impl UiApp {
    /// Renders the settings screen; edits take effect on "Apply".
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Stitching delay");
            ui.add(
                egui::DragValue::new(&mut self.pending_simulation.stitch_delay_ms)
                    .range(0..=10_000)
                    .speed(10)
                    .suffix(" ms"),
            );
        });
        ui.horizontal(|ui| {
            ui.label("Diagnosis delay");
            ui.add(
                egui::DragValue::new(&mut self.pending_simulation.diagnose_delay_ms)
                    .range(0..=10_000)
                    .speed(10)
                    .suffix(" ms"),
            );
        });
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("History rows per page");
            egui::ComboBox::from_id_salt("settings-page-size")
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
        });

        ui.add_space(12.0);
        let busy = self.any_run_active();
        ui.horizontal(|ui| {
            if ui.add_enabled(!busy, egui::Button::new("Apply")).clicked() {
                self.apply_settings();
            }
            if busy {
                ui.weak("Settings can be applied once processing has finished");
            }
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("Disease categories");
        for disease in Disease::ALL {
            ui.label(disease.label());
        }

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("Versions");
        ui.label(format!("App version: {}", self.app_version));
        ui.label(format!(
            "Platform: {} ({})",
            std::env::consts::OS,
            std::env::consts::ARCH
        ));
        match &self.config_path {
            Some(path) => ui.label(format!("Config file: {}", path.display())),
            None => ui.label("Config file: not available"),
        };
    }

    fn apply_settings(&mut self) {
        self.config.simulation = self.pending_simulation.clone();
        self.config.history.page_size = self.history_page_size;
        self.service = Arc::new(SimulatedDiagnosis::new(self.config.simulation.clone()));
        tracing::info!(
            "Simulation delays set to {} ms / {} ms",
            self.config.simulation.stitch_delay_ms,
            self.config.simulation.diagnose_delay_ms
        );

        let Some(path) = &self.config_path else {
            self.status = "Settings applied (not saved, no config directory)".to_string();
            return;
        };
        match self.config.save(path) {
            Ok(()) => self.status = "Settings saved".to_string(),
            Err(e) => {
                tracing::error!("Failed to save settings to {}: {e}", path.display());
                self.status = format!("Settings applied but not saved: {e}");
            }
        }
    }
}
