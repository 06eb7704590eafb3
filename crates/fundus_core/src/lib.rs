//! Core of the fundus screening demo: data model, simulated diagnosis
//! backend, batch workflow, history and CSV export. No UI code lives here.

pub mod config;
pub mod controller;
pub mod diagnosis;
pub mod dialogs;
pub mod error;
pub mod export;
pub mod history;
pub mod model;
pub mod scan;
pub mod single;
pub mod workflow;

pub use config::{AppConfig, HistoryConfig, SimulationConfig};
pub use controller::BatchController;
pub use diagnosis::{DiagnosisService, SimulatedDiagnosis};
pub use dialogs::{Dialogs, FileFilter};
pub use error::{FundusError, Result};
pub use export::{
    default_file_name, export_history_csv, export_results_csv, export_with_dialog,
    write_history_csv, write_results_csv,
};
pub use history::{HistoryQuery, HistoryRepository, InMemoryHistory, PageView, paginate};
pub use model::{
    CombinedImage, DiagnosisResult, Disease, Eye, EyeImagePair, HistoryRecord, ImageRef,
    NewHistoryRecord, PairDiagnosis, format_timestamp,
};
pub use scan::{is_supported_image, pair_folders, scan_images};
pub use single::SingleSession;
pub use workflow::{BatchEvent, BatchFailure, BatchRun, BatchState, Phase};

/// Select a left-eye folder and a right-eye folder, then pair their images.
///
/// `Ok(None)` when either dialog is cancelled.
pub fn select_folder_pairs(dialogs: &dyn Dialogs) -> Result<Option<Vec<EyeImagePair>>> {
    let Some(left) = dialogs.pick_directory("Select left-eye image folder") else {
        return Ok(None);
    };
    let Some(right) = dialogs.pick_directory("Select right-eye image folder") else {
        return Ok(None);
    };
    pair_folders(left, right).map(Some)
}
