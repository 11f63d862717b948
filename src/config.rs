//! Detector configuration.
//!
//! Settings come from three layers, highest precedence first: command-line
//! flags (or their `TILEWATCH_*` environment variables), an optional YAML
//! file, and the built-in defaults. This module owns the file layer and the
//! defaults; the CLI applies its overrides on top of a loaded
//! [`DetectorConfig`].
//!
//! ```yaml
//! segment_size: 640
//! overlap_portion: 0.5
//! confidence_threshold: 0.25
//! tiling: true
//! backend:
//!   command: python3
//!   args: [detect.py, --weights, best.pt]
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{CommandBackend, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::error::TilewatchError;
use crate::orchestrator::Detector;
use crate::tiling::{TilingOptions, DEFAULT_OVERLAP_PORTION, DEFAULT_SEGMENT_SIZE};

/// Everything needed to build a [`Detector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    pub segment_size: u32,
    pub overlap_portion: f64,
    pub confidence_threshold: f64,
    /// Split images into tiles before inference.
    pub tiling: bool,
    pub backend: BackendConfig,
}

/// The external detector program.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub command: Option<String>,
    pub args: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            segment_size: DEFAULT_SEGMENT_SIZE,
            overlap_portion: DEFAULT_OVERLAP_PORTION,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            tiling: true,
            backend: BackendConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Loads a config file. Keys that are absent keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, TilewatchError> {
        let text = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&text).map_err(|source| TilewatchError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses config from a YAML string. An empty document yields the defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn tiling_options(&self) -> TilingOptions {
        TilingOptions::new(self.segment_size, self.overlap_portion)
    }

    pub fn validate(&self) -> Result<(), TilewatchError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(TilewatchError::Configuration(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.tiling {
            self.tiling_options().stride()?;
        }
        Ok(())
    }

    /// Builds the detector described by this config.
    ///
    /// # Errors
    /// [`TilewatchError::MissingBackend`] when no backend command is set,
    /// [`TilewatchError::Configuration`] for out-of-range values.
    pub fn build_detector(&self) -> Result<Detector, TilewatchError> {
        self.validate()?;
        let command = self
            .backend
            .command
            .as_deref()
            .ok_or(TilewatchError::MissingBackend)?;

        let backend = CommandBackend::new(command)
            .with_args(&self.backend.args)
            .with_confidence_threshold(self.confidence_threshold);
        log::debug!(
            "backend '{}' with {} arg(s), threshold {}",
            command,
            self.backend.args.len(),
            self.confidence_threshold
        );

        if self.tiling {
            Detector::tiled(Arc::new(backend), self.tiling_options())
        } else {
            Ok(Detector::untiled(Arc::new(backend)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectorConfig::default();
        assert_eq!(config.segment_size, 640);
        assert_eq!(config.overlap_portion, 0.5);
        assert_eq!(config.confidence_threshold, 0.5);
        assert!(config.tiling);
        assert!(config.backend.command.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = DetectorConfig::from_yaml_str("segment_size: 1024\n").expect("parse");
        assert_eq!(config.segment_size, 1024);
        assert_eq!(config.overlap_portion, 0.5);
        assert!(config.tiling);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = DetectorConfig::from_yaml_str("  \n").expect("parse");
        assert_eq!(config, DetectorConfig::default());
    }

    #[test]
    fn test_backend_section() {
        let yaml = "tiling: false\nbackend:\n  command: python3\n  args: [detect.py, --fast]\n";
        let config = DetectorConfig::from_yaml_str(yaml).expect("parse");

        assert!(!config.tiling);
        assert_eq!(config.backend.command.as_deref(), Some("python3"));
        assert_eq!(config.backend.args, vec!["detect.py", "--fast"]);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(DetectorConfig::from_yaml_str("segment_sise: 640\n").is_err());
    }

    #[test]
    fn test_from_yaml_file_reports_path() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("tilewatch.yaml");
        std::fs::write(&path, "overlap_portion: [1, 2]\n").expect("write config");

        match DetectorConfig::from_yaml_file(&path) {
            Err(TilewatchError::ConfigParse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected ConfigParse, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_backend() {
        let err = DetectorConfig::default().build_detector().unwrap_err();
        assert!(matches!(err, TilewatchError::MissingBackend));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let config = DetectorConfig {
            confidence_threshold: 1.5,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TilewatchError::Configuration(_))
        ));
    }

    #[test]
    fn test_bad_overlap_ignored_when_untiled() {
        let mut config = DetectorConfig {
            overlap_portion: 1.0,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());

        config.tiling = false;
        config.backend.command = Some("true".to_string());
        let detector = config.build_detector().expect("untiled detector");
        assert!(detector.tiling().is_none());
    }

    #[test]
    fn test_build_tiled_detector() {
        let config = DetectorConfig {
            segment_size: 320,
            backend: BackendConfig {
                command: Some("detector".to_string()),
                args: vec![],
            },
            ..DetectorConfig::default()
        };

        let detector = config.build_detector().expect("build");
        assert_eq!(detector.tiling(), Some(&TilingOptions::new(320, 0.5)));
        assert_eq!(detector.backend_name(), "detector");
    }
}
