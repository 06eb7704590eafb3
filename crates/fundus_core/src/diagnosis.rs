use crate::config::SimulationConfig;
use crate::error::{FundusError, Result};
use crate::model::{CombinedImage, DiagnosisResult, Disease, EyeImagePair};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Mutex;
use std::thread;

pub const MIN_SIMULATED_CONFIDENCE: f32 = 0.70;
pub const MAX_SIMULATED_CONFIDENCE: f32 = 0.99;

/// Stitching and classification backend.
///
/// Calls may block for a long time; run them off the UI thread.
pub trait DiagnosisService: Send + Sync {
    /// Combine the two eye images into one artifact.
    fn combine(&self, pair: &EyeImagePair) -> Result<CombinedImage>;

    /// Classify one pair. Exactly one result per call.
    fn diagnose_one(&self, left: &Path, right: &Path) -> Result<DiagnosisResult>;

    /// Diagnose `pairs` in order, reporting the completed fraction after each.
    fn diagnose_batch(
        &self,
        pairs: &[EyeImagePair],
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<Vec<DiagnosisResult>> {
        let total = pairs.len();
        let mut results = Vec::with_capacity(total);
        for (idx, pair) in pairs.iter().enumerate() {
            results.push(self.diagnose_one(&pair.left.path, &pair.right.path)?);
            on_progress((idx + 1) as f32 / total as f32);
        }
        Ok(results)
    }
}

/// Stand-in backend: sleeps, then returns a random label and confidence.
pub struct SimulatedDiagnosis {
    config: SimulationConfig,
    rng: Mutex<StdRng>,
}

impl SimulatedDiagnosis {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    fn random_result(&self) -> Result<DiagnosisResult> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| FundusError::Simulation("random source poisoned".into()))?;
        let disease = Disease::ALL[rng.gen_range(0..Disease::ALL.len())];
        let confidence = rng.gen_range(MIN_SIMULATED_CONFIDENCE..MAX_SIMULATED_CONFIDENCE);
        Ok(DiagnosisResult {
            disease,
            confidence,
            diagnosed_at: Utc::now(),
        })
    }
}

impl DiagnosisService for SimulatedDiagnosis {
    fn combine(&self, pair: &EyeImagePair) -> Result<CombinedImage> {
        thread::sleep(self.config.stitch_delay());
        // Placeholder artifact: no real stitching happens.
        Ok(CombinedImage {
            path: pair.right.path.clone(),
        })
    }

    fn diagnose_one(&self, left: &Path, right: &Path) -> Result<DiagnosisResult> {
        thread::sleep(self.config.diagnose_delay());
        let result = self.random_result()?;
        tracing::debug!(
            "Simulated diagnosis for {} / {}: {} ({})",
            left.display(),
            right.display(),
            result.disease,
            result.confidence_percent()
        );
        Ok(result)
    }
}
