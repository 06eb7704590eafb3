mod app;

use app::UiApp;
use eframe::{NativeOptions, egui};

fn main() {
    tracing_subscriber::fmt::init();
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1180.0, 780.0]),
        ..NativeOptions::default()
    };
    if let Err(e) = eframe::run_native(
        "Fundus Screen",
        options,
        Box::new(|_cc| Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(UiApp::new()))),
    ) {
        tracing::error!("Application stopped with error: {e}");
    }
}
