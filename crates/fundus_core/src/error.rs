use std::path::PathBuf;

/// Errors produced by the diagnosis workflow and its supporting services.
/// A cancelled dialog is reported as `None` by [`crate::Dialogs`], not here.
#[derive(Debug, thiserror::Error)]
pub enum FundusError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("could not serialize configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("not a readable folder: {}", .0.display())]
    InvalidFolder(PathBuf),

    #[error("no image pairs queued")]
    EmptyQueue,

    #[error("a batch is already running")]
    AlreadyRunning,

    #[error("diagnosis service failed: {0}")]
    Simulation(String),

    #[error("batch worker stopped unexpectedly")]
    WorkerDisconnected,
}

pub type Result<T, E = FundusError> = std::result::Result<T, E>;
