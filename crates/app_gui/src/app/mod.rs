//! Application state and top-level layout.

mod batch;
mod dialogs;
mod history;
mod settings;
mod single;

use dialogs::RfdDialogs;
use eframe::{App, Frame, egui};
use fundus_core::{
    AppConfig, BatchController, BatchState, DiagnosisService, FundusError, HistoryQuery,
    HistoryRecord, HistoryRepository, InMemoryHistory, NewHistoryRecord, SimulatedDiagnosis,
    SimulationConfig, SingleSession,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const THUMB_SIZE: u32 = 240;
const MAX_THUMBS: usize = 128;
const PAGE_SIZES: [usize; 3] = [5, 10, 25];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Panel {
    Single,
    Batch,
    History,
    Settings,
}

pub struct UiApp {
    panel: Panel,
    status: String,
    config: AppConfig,
    config_path: Option<PathBuf>,
    /// Settings edited in the settings panel, applied on "Apply".
    pending_simulation: SimulationConfig,
    app_version: String,
    dialogs: RfdDialogs,
    service: Arc<dyn DiagnosisService>,

    single: SingleSession,
    single_run: BatchController,
    batch: BatchController,

    history: Box<dyn HistoryRepository>,
    history_query: HistoryQuery,
    history_page: usize,
    history_page_size: usize,
    preview_record: Option<HistoryRecord>,

    // Thumbnail cache (basic LRU)
    thumbs: HashMap<PathBuf, egui::TextureHandle>,
    thumb_keys: VecDeque<PathBuf>,
    unreadable: HashSet<PathBuf>,
}

fn config_path() -> Option<PathBuf> {
    directories_next::ProjectDirs::from("org", "FundusScreen", "FundusScreen")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl UiApp {
    pub fn new() -> Self {
        let config_path = config_path();
        let config = match &config_path {
            Some(path) => AppConfig::load_or_default(path),
            None => {
                tracing::warn!("No config directory available, using defaults");
                AppConfig::default()
            }
        };
        Self::with_config(config, config_path)
    }

    fn with_config(config: AppConfig, config_path: Option<PathBuf>) -> Self {
        let mut rng = match config.simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let history = InMemoryHistory::with_demo_records(config.history.demo_records, &mut rng);
        tracing::info!("History seeded with {} demo records", history.len());

        Self {
            panel: Panel::Single,
            status: String::new(),
            pending_simulation: config.simulation.clone(),
            service: Arc::new(SimulatedDiagnosis::new(config.simulation.clone())),
            history_page_size: config.history.page_size.max(1),
            config,
            config_path,
            app_version: env!("FUNDUS_VERSION").to_string(),
            dialogs: RfdDialogs,
            single: SingleSession::new(),
            single_run: BatchController::new(),
            batch: BatchController::new(),
            history: Box::new(history),
            history_query: HistoryQuery::default(),
            history_page: 0,
            preview_record: None,
            thumbs: HashMap::new(),
            thumb_keys: VecDeque::new(),
            unreadable: HashSet::new(),
        }
    }

    fn any_run_active(&self) -> bool {
        self.single_run.is_processing() || self.batch.is_processing()
    }

    /// Only one run may be active across the single and batch views.
    fn ensure_idle(&self) -> fundus_core::Result<()> {
        if self.any_run_active() {
            return Err(FundusError::AlreadyRunning);
        }
        Ok(())
    }

    /// Drain worker events for both controllers and file finished runs into
    /// history.
    fn pump_runs(&mut self, ctx: &egui::Context) {
        pump(&mut self.single_run, self.history.as_mut(), &mut self.status, "Diagnosis");
        pump(&mut self.batch, self.history.as_mut(), &mut self.status, "Batch");
        if self.any_run_active() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }

    fn get_or_load_thumb(&mut self, ctx: &egui::Context, path: &Path) -> Option<egui::TextureId> {
        if let Some(tex) = self.thumbs.get(path) {
            return Some(tex.id());
        }
        if self.unreadable.contains(path) {
            return None;
        }

        match image::open(path) {
            Ok(img) => {
                let thumb = image::imageops::thumbnail(&img, THUMB_SIZE, THUMB_SIZE);
                let (w, h) = thumb.dimensions();
                let size = [w as usize, h as usize];
                let pixels = thumb.into_raw();
                let color = egui::ColorImage::from_rgba_unmultiplied(size, &pixels);
                let name = format!("thumb:{}", path.display());
                let tex = ctx.load_texture(name, color, egui::TextureOptions::LINEAR);
                self.thumbs.insert(path.to_path_buf(), tex);
                self.thumb_keys.push_back(path.to_path_buf());
                if self.thumbs.len() > MAX_THUMBS
                    && let Some(old) = self.thumb_keys.pop_front()
                {
                    self.thumbs.remove(&old);
                }
                self.thumbs.get(path).map(|t| t.id())
            }
            Err(e) => {
                tracing::warn!("Failed to load thumbnail for {}: {}", path.display(), e);
                self.unreadable.insert(path.to_path_buf());
                None
            }
        }
    }

    /// Square image slot; shows a placeholder when there is nothing to draw.
    fn paint_thumb(&mut self, ui: &mut egui::Ui, path: Option<&Path>, side: f32, empty: &str) {
        let ctx = ui.ctx().clone();
        let desired = egui::Vec2::splat(side);
        let (resp, painter) = ui.allocate_painter(desired, egui::Sense::hover());
        let r = resp.rect;
        match path.and_then(|p| self.get_or_load_thumb(&ctx, p)) {
            Some(id) => {
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                painter.image(id, r, uv, egui::Color32::WHITE);
            }
            None => {
                painter.rect_filled(r, 4.0, egui::Color32::from_gray(40));
                painter.rect_stroke(
                    r,
                    4.0,
                    egui::Stroke::new(1.0, egui::Color32::DARK_GRAY),
                    egui::StrokeKind::Inside,
                );
                let label = path
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| empty.to_string());
                painter.text(
                    r.center(),
                    egui::Align2::CENTER_CENTER,
                    label,
                    egui::FontId::proportional(13.0),
                    egui::Color32::GRAY,
                );
            }
        }
    }
}

fn pump(
    ctl: &mut BatchController,
    history: &mut dyn HistoryRepository,
    status: &mut String,
    what: &str,
) {
    let was_running = ctl.is_processing();
    let polled = ctl.poll();
    if let Err(e) = &polled {
        tracing::error!("{what} worker error: {e}");
    }
    if was_running && !ctl.is_processing() {
        for done in ctl.results() {
            history.create(NewHistoryRecord::from(done));
        }
    }
    match polled {
        Err(e) => {
            *status = format!("{what} aborted: {e} ({} diagnosed)", ctl.results().len());
        }
        Ok(_) if was_running && !ctl.is_processing() => {
            *status = run_summary(what, ctl.state(), ctl.results().len(), ctl.failures().len());
        }
        Ok(_) => {}
    }
}

/// One-line outcome of a finished run for the status bar.
pub(crate) fn run_summary(what: &str, state: BatchState, ok: usize, failed: usize) -> String {
    let head = match state {
        BatchState::Cancelled => format!("{what} cancelled"),
        _ => format!("{what} finished"),
    };
    if failed > 0 {
        format!("{head}: {ok} diagnosed, {failed} failed")
    } else {
        format!("{head}: {ok} diagnosed")
    }
}

/// Progress caption, e.g. "Pair 2 of 5: Stitching".
pub(crate) fn stage_caption(state: BatchState, total: usize) -> String {
    match state.current() {
        Some((index, phase)) => format!("Pair {} of {}: {}", index + 1, total, phase),
        None => match state {
            BatchState::Done => "Completed".to_string(),
            BatchState::Cancelled => "Cancelled".to_string(),
            _ => "Ready".to_string(),
        },
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.pump_runs(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Fundus Screen");
                ui.separator();
                ui.selectable_value(&mut self.panel, Panel::Single, "Single pair");
                ui.selectable_value(&mut self.panel, Panel::Batch, "Batch");
                ui.selectable_value(&mut self.panel, Panel::History, "History");
                ui.selectable_value(&mut self.panel, Panel::Settings, "Settings");
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.status.is_empty() {
                    ui.weak("Ready");
                } else {
                    ui.label(&self.status);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.panel {
            Panel::Single => self.render_single_panel(ui),
            Panel::Batch => self.render_batch_panel(ui),
            Panel::History => self.render_history_panel(ui),
            Panel::Settings => self.render_settings_panel(ui),
        });

        self.render_record_preview(ctx);
    }
}
