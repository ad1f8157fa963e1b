//! Persistent settings.
//!
//! Settings live in `<config_dir>/pipesmith/config.json`. Every field has a
//! default, so a partial file (or no file at all) is valid.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides [`Settings::registry_path`].
pub const REGISTRY_ENV_VAR: &str = "PIPESMITH_REGISTRY";

pub const DEFAULT_REGISTRY_FILE: &str = "pipesmith_registry.json";

/// Thresholds and tuning knobs for the profiling and recommendation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Null percentage above which a column gets a median fill directive
    pub null_threshold_pct: f64,
    /// Duplicate percentage above which deduplication is recommended
    pub duplicate_threshold_pct: f64,
    /// Absolute Pearson coefficient above which a pair is reported
    pub correlation_threshold: f64,
    /// Anomaly percentage above which outlier handling is recommended
    pub anomaly_threshold_pct: f64,
    pub cluster_count: usize,
    pub contamination: f64,
    /// Anomaly detection needs strictly more rows than this
    pub min_anomaly_rows: usize,
    /// Number of non-null values inspected by the semantic classifier
    pub semantic_sample_size: usize,
    pub seed: u64,
    /// Date columns whose newest value is at most this old count as fresh
    pub freshness_window_days: i64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            null_threshold_pct: 20.0,
            duplicate_threshold_pct: 10.0,
            correlation_threshold: 0.7,
            anomaly_threshold_pct: 5.0,
            cluster_count: 5,
            contamination: 0.1,
            min_anomaly_rows: 10,
            semantic_sample_size: 10,
            seed: 42,
            freshness_window_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// JSON file holding every registered pipeline
    pub registry_path: PathBuf,
    pub analysis: AnalysisSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from(DEFAULT_REGISTRY_FILE),
            analysis: AnalysisSettings::default(),
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("pipesmith").join("config.json"))
    }

    /// Load settings from `path`, or from [`Settings::config_path`] when `None`.
    ///
    /// A missing file yields defaults. [`REGISTRY_ENV_VAR`] is applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let mut settings = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings JSON in {}", path.display()))?
        } else {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(registry) = std::env::var(REGISTRY_ENV_VAR)
            && !registry.trim().is_empty()
        {
            settings.registry_path = PathBuf::from(registry);
        }

        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() -> Result<()> {
        let settings: Settings =
            serde_json::from_str(r#"{ "analysis": { "null_threshold_pct": 35.0 } }"#)?;
        assert_eq!(settings.analysis.null_threshold_pct, 35.0);
        assert_eq!(settings.analysis.cluster_count, 5);
        assert_eq!(settings.registry_path, PathBuf::from(DEFAULT_REGISTRY_FILE));
        Ok(())
    }

    #[test]
    fn test_save_and_load_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("config.json");

        let mut settings = Settings::default();
        settings.analysis.seed = 7;
        settings.save(&path)?;

        let loaded = Settings::load(Some(&path))?;
        assert_eq!(loaded.analysis.seed, 7);
        Ok(())
    }

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let loaded = Settings::load(Some(&dir.path().join("absent.json")))?;
        assert_eq!(loaded.analysis, AnalysisSettings::default());
        Ok(())
    }
}
