use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration, read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub history: HistoryConfig,
}

/// Timing and randomness of the simulated diagnosis backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub stitch_delay_ms: u64,
    pub diagnose_delay_ms: u64,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            stitch_delay_ms: 600,
            diagnose_delay_ms: 500,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// No delays, fixed seed.
    pub fn instant(seed: u64) -> Self {
        Self {
            stitch_delay_ms: 0,
            diagnose_delay_ms: 0,
            seed: Some(seed),
        }
    }

    pub fn stitch_delay(&self) -> Duration {
        Duration::from_millis(self.stitch_delay_ms)
    }

    pub fn diagnose_delay(&self) -> Duration {
        Duration::from_millis(self.diagnose_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub page_size: usize,
    /// Number of demo records seeded into the history view on start.
    pub demo_records: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            demo_records: 20,
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::info!("Config saved to {}", path.display());
        Ok(())
    }

    /// Like [`AppConfig::load`], but falls back to defaults when the file is
    /// missing or malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(cfg) => {
                tracing::info!("Config loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                tracing::warn!("Failed to load config {}: {e}. Using defaults.", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[simulation]\nstitch_delay_ms = 5\nseed = 7\n\n[history]\npage_size = 25\n",
        )?;

        let cfg = AppConfig::load(&path)?;
        assert_eq!(cfg.simulation.stitch_delay_ms, 5);
        assert_eq!(cfg.simulation.diagnose_delay_ms, 500);
        assert_eq!(cfg.simulation.seed, Some(7));
        assert_eq!(cfg.history.page_size, 25);
        assert_eq!(cfg.history.demo_records, 20);
        Ok(())
    }

    #[test]
    fn save_then_load_preserves_settings() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.simulation.diagnose_delay_ms = 0;
        cfg.history.page_size = 5;
        cfg.save(&path)?;

        assert_eq!(AppConfig::load(&path)?, cfg);
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_defaults() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let cfg = AppConfig::load_or_default(dir.path().join("absent.toml"));
        assert_eq!(cfg, AppConfig::default());
        Ok(())
    }

    #[test]
    fn malformed_file_is_an_error_but_load_or_default_recovers() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "[history]\npage_size = \"ten\"\n")?;

        assert!(matches!(
            AppConfig::load(&path),
            Err(crate::FundusError::Config(_))
        ));
        assert_eq!(AppConfig::load_or_default(&path), AppConfig::default());
        Ok(())
    }
}
