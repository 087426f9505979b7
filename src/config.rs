//! Pipeline configuration with serialization for run reproducibility.
//!
//! One struct tree covering the feature-side knobs (window sizes, lead-in
//! padding, label horizon and truncation policy) plus optional run
//! metadata. Batch-side knobs (batch size, worker count, error mode) live
//! in [`crate::batch::BatchConfig`] and are not serialized with the
//! pipeline config.
//!
//! Configurations validate before any batch starts; an invalid parameter is
//! fatal to the whole run. Save/load round-trips through TOML or JSON so a
//! feature export is reproducible from a checked-in file.
//!
//! # Example
//!
//! ```ignore
//! use stockout_features::PipelineConfig;
//!
//! let config = PipelineConfig::default();
//! config.validate()?;
//! config.save_toml("export_config.toml")?;
//! let loaded = PipelineConfig::load_toml("export_config.toml")?;
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};
use crate::labeling::TruncationPolicy;

/// Trailing window sizes in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub window_7d: u32,
    pub window_14d: u32,
    pub window_30d: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_7d: 7,
            window_14d: 14,
            window_30d: 30,
        }
    }
}

/// Label horizon and truncated-window handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Forward window length H: demand is summed over `(D, D+H]`.
    pub horizon_days: u32,

    /// What to do with rows whose forward window passes the end of loaded
    /// data.
    pub truncation: TruncationPolicy,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            horizon_days: 14,
            truncation: TruncationPolicy::Tag,
        }
    }
}

/// Optional metadata carried alongside a saved configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Feature-side pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rolling window sizes.
    pub windows: WindowConfig,

    /// Lead-in days before the first snapshot so it still sees a full long
    /// window.
    pub padding_days: u32,

    /// Label generation parameters.
    pub label: LabelConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RunMetadata>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            windows: WindowConfig::default(),
            padding_days: 29,
            label: LabelConfig::default(),
            metadata: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_windows(mut self, windows: WindowConfig) -> Self {
        self.windows = windows;
        self
    }

    pub fn with_padding_days(mut self, padding_days: u32) -> Self {
        self.padding_days = padding_days;
        self
    }

    pub fn with_label(mut self, label: LabelConfig) -> Self {
        self.label = label;
        self
    }

    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.label.truncation = truncation;
        self
    }

    pub fn with_metadata(mut self, metadata: RunMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Check all parameters. Runs before any batch starts; a failure here
    /// aborts the run.
    pub fn validate(&self) -> Result<()> {
        let w = &self.windows;
        if w.window_7d == 0 {
            return Err(FeatureError::InvalidConfig(
                "window_7d must be > 0".to_string(),
            ));
        }
        if w.window_7d >= w.window_14d {
            return Err(FeatureError::InvalidConfig(format!(
                "window_7d ({}) must be < window_14d ({})",
                w.window_7d, w.window_14d
            )));
        }
        if w.window_14d >= w.window_30d {
            return Err(FeatureError::InvalidConfig(format!(
                "window_14d ({}) must be < window_30d ({})",
                w.window_14d, w.window_30d
            )));
        }
        // The first snapshot sees padding_days + 1 days of history.
        if self.padding_days + 1 < w.window_30d {
            return Err(FeatureError::InvalidConfig(format!(
                "padding_days ({}) too small for a full {}-day window on the first snapshot",
                self.padding_days, w.window_30d
            )));
        }
        if self.label.horizon_days == 0 {
            return Err(FeatureError::InvalidConfig(
                "label horizon_days must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Save to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Load and validate from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let rendered = serde_json::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Load and validate from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.windows.window_7d, 7);
        assert_eq!(config.windows.window_14d, 14);
        assert_eq!(config.windows.window_30d, 30);
        assert_eq!(config.padding_days, 29);
        assert_eq!(config.label.horizon_days, 14);
        assert_eq!(config.label.truncation, TruncationPolicy::Tag);
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = PipelineConfig::default().with_windows(WindowConfig {
            window_7d: 0,
            window_14d: 14,
            window_30d: 30,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_increasing_windows_rejected() {
        let config = PipelineConfig::default().with_windows(WindowConfig {
            window_7d: 14,
            window_14d: 14,
            window_30d: 30,
        });
        assert!(config.validate().is_err());

        let config = PipelineConfig::default().with_windows(WindowConfig {
            window_7d: 7,
            window_14d: 30,
            window_30d: 30,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_padding_must_cover_long_window() {
        let config = PipelineConfig::default().with_padding_days(28);
        assert!(config.validate().is_err());

        // padding 29 + the snapshot day itself = a full 30-day window.
        let config = PipelineConfig::default().with_padding_days(29);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let config = PipelineConfig::default().with_label(LabelConfig {
            horizon_days: 0,
            truncation: TruncationPolicy::Tag,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = PipelineConfig::default()
            .with_truncation(TruncationPolicy::Exclude)
            .with_metadata(RunMetadata {
                name: "march-export".to_string(),
                description: Some("test round trip".to_string()),
                created_at: None,
                version: Some("0.1.0".to_string()),
                tags: Some(vec!["test".to_string()]),
            });

        config.save_toml(&path).unwrap();
        let loaded = PipelineConfig::load_toml(&path).unwrap();

        assert_eq!(loaded.windows, config.windows);
        assert_eq!(loaded.padding_days, config.padding_days);
        assert_eq!(loaded.label.truncation, TruncationPolicy::Exclude);
        assert_eq!(loaded.metadata.unwrap().name, "march-export");
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = PipelineConfig::default();
        config.save_json(&path).unwrap();
        let loaded = PipelineConfig::load_json(&path).unwrap();
        assert_eq!(loaded.windows, config.windows);
        assert_eq!(loaded.label.horizon_days, 14);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        let mut config = PipelineConfig::default();
        config.padding_days = 3;
        // save_toml does not validate; load_toml must reject.
        config.save_toml(&path).unwrap();
        assert!(PipelineConfig::load_toml(&path).is_err());
    }
}
