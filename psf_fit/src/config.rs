//! Fit configuration: per-call options and solver settings.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::lm_optimizer::LmConfig;

/// Per-fit options chosen by the caller alongside the initial parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Lowest FWHM a free fit may return. A fit at or below it is redone
    /// with FWHM pinned to this value. Useful for heavily binned data.
    pub fwhm_min: f64,
    /// Keep FWHM fixed at its initial value.
    pub fwhm_fix: bool,
    /// Rejection threshold in units of the RMS normalised residual.
    pub reject_threshold: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            fwhm_min: 1.5,
            fwhm_fix: false,
            reject_threshold: 4.0,
        }
    }
}

impl FitOptions {
    pub fn validate(&self) {
        assert!(
            self.fwhm_min >= 0.0,
            "fwhm_min must be non-negative, got {}",
            self.fwhm_min
        );
        assert!(
            self.reject_threshold > 0.0,
            "reject_threshold must be positive, got {}",
            self.reject_threshold
        );
    }
}

/// Solver settings shared by every fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub lm: LmConfig,
    /// Cap on rejection passes. `None` iterates until no new pixel is rejected.
    pub max_rejection_passes: Option<usize>,
}

impl FitConfig {
    /// Panics if values are out of range.
    pub fn validate(&self) {
        self.lm.validate();
        if let Some(passes) = self.max_rejection_passes {
            assert!(passes > 0, "max_rejection_passes must be at least 1");
        }
    }

    /// Parse from YAML. Missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: FitConfig = serde_yml::from_str(yaml).context("Failed to parse fit config")?;
        config.validate();
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fit config: {}", path.display()))?;
        Self::from_yaml(&yaml)
    }

    pub fn to_yaml(&self) -> String {
        serde_yml::to_string(self).expect("Failed to serialize fit config to YAML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FitConfig::default();
        assert_eq!(config.lm, LmConfig::default());
        assert_eq!(config.max_rejection_passes, None);
        config.validate();
        FitOptions::default().validate();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "lm:\n  max_iterations: 50\n  ftol: 1.0e-10\nmax_rejection_passes: 8\n";
        let config = FitConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.lm.max_iterations, 50);
        assert_eq!(config.lm.ftol, 1.0e-10);
        assert_eq!(config.lm.xtol, LmConfig::default().xtol);
        assert_eq!(config.max_rejection_passes, Some(8));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = FitConfig {
            max_rejection_passes: Some(3),
            ..FitConfig::default()
        };
        let back = FitConfig::from_yaml(&config.to_yaml()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        let err = FitConfig::from_yaml("lm: [1, 2").unwrap_err();
        assert!(err.to_string().contains("fit config"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = FitConfig::from_yaml_file("/nonexistent/psf_fit.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/psf_fit.yaml"));
    }

    #[test]
    #[should_panic(expected = "max_lambda must exceed initial_lambda")]
    fn test_yaml_nan_max_lambda_panics() {
        let _ = FitConfig::from_yaml("lm:\n  max_lambda: .nan\n");
    }

    #[test]
    #[should_panic(expected = "max_rejection_passes must be at least 1")]
    fn test_zero_rejection_passes_panics() {
        FitConfig {
            max_rejection_passes: Some(0),
            ..FitConfig::default()
        }
        .validate();
    }

    #[test]
    #[should_panic(expected = "reject_threshold must be positive")]
    fn test_non_positive_threshold_panics() {
        FitOptions {
            reject_threshold: 0.0,
            ..FitOptions::default()
        }
        .validate();
    }
}
