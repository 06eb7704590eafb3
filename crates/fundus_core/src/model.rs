use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Disease categories reported by the classifier. Closed set; order is the
/// display order used by filters and the settings panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disease {
    Normal,
    DiabeticRetinopathy,
    Glaucoma,
    Cataract,
    Amd,
    Hypertension,
    Myopia,
    Other,
}

impl Disease {
    pub const ALL: [Disease; 8] = [
        Disease::Normal,
        Disease::DiabeticRetinopathy,
        Disease::Glaucoma,
        Disease::Cataract,
        Disease::Amd,
        Disease::Hypertension,
        Disease::Myopia,
        Disease::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Disease::Normal => "Normal",
            Disease::DiabeticRetinopathy => "Diabetic Retinopathy",
            Disease::Glaucoma => "Glaucoma",
            Disease::Cataract => "Cataract",
            Disease::Amd => "AMD",
            Disease::Hypertension => "Hypertension",
            Disease::Myopia => "Myopia",
            Disease::Other => "Other",
        }
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown disease label: {0}")]
pub struct UnknownDisease(pub String);

impl FromStr for Disease {
    type Err = UnknownDisease;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Disease::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownDisease(s.to_string()))
    }
}

/// Which eye an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub fn label(self) -> &'static str {
        match self {
            Eye::Left => "Left eye",
            Eye::Right => "Right eye",
        }
    }
}

/// A selected fundus image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub path: PathBuf,
    /// Name shown in the UI; the file name unless the caller supplies one.
    pub name: String,
}

impl ImageRef {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, name }
    }
}

/// One left-eye and one right-eye image submitted together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeImagePair {
    /// Unique within a batch.
    pub id: String,
    pub left: ImageRef,
    pub right: ImageRef,
}

impl EyeImagePair {
    pub fn new(id: impl Into<String>, left: ImageRef, right: ImageRef) -> Self {
        Self {
            id: id.into(),
            left,
            right,
        }
    }
}

/// Output of the stitching step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedImage {
    pub path: PathBuf,
}

/// Classifier output for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub disease: Disease,
    /// Confidence in [0,1].
    pub confidence: f32,
    pub diagnosed_at: DateTime<Utc>,
}

impl DiagnosisResult {
    /// Confidence as a percentage string with two decimals, e.g. `87.43%`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }
}

/// A diagnosed pair as produced by a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct PairDiagnosis {
    pub pair: EyeImagePair,
    pub combined: Option<CombinedImage>,
    pub result: DiagnosisResult,
}

/// A stored diagnosis, enriched with the source images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub left_path: PathBuf,
    pub right_path: PathBuf,
    pub combined_path: Option<PathBuf>,
    pub result: DiagnosisResult,
}

/// Fields of a history record before the repository assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryRecord {
    pub left_path: PathBuf,
    pub right_path: PathBuf,
    pub combined_path: Option<PathBuf>,
    pub result: DiagnosisResult,
}

impl From<&PairDiagnosis> for NewHistoryRecord {
    fn from(done: &PairDiagnosis) -> Self {
        Self {
            left_path: done.pair.left.path.clone(),
            right_path: done.pair.right.path.clone(),
            combined_path: done.combined.as_ref().map(|c| c.path.clone()),
            result: done.result.clone(),
        }
    }
}

/// Local-time rendering used in tables, search and CSV.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub(crate) fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
