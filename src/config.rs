//! Planner configuration.
//!
//! All thresholds have defaults matching the conventions organizers are used
//! to; a TOML document only needs to name the values it changes:
//!
//! ```toml
//! capacity_warning_margin = 10
//! reject_stale_input = false
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Document is not valid TOML for [`PlannerConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables of the constraint engine and the solver exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Capacity below `interest + margin` is a warning.
    pub capacity_warning_margin: u32,
    /// Capacity below `interest * ratio` is a warning.
    pub capacity_warning_ratio: f64,
    /// Tolerance (hours) for slot counts and imported durations.
    pub duration_epsilon: f64,
    /// Reject solver results whose embedded input differs from a fresh export.
    pub reject_stale_input: bool,
    /// Default for [`ExportOptions::scheduled_as_fixed`](crate::solver::ExportOptions).
    pub export_scheduled_as_fixed: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            capacity_warning_margin: 5,
            capacity_warning_ratio: 1.25,
            duration_epsilon: 1e-4,
            reject_stale_input: true,
            export_scheduled_as_fixed: false,
        }
    }
}

impl PlannerConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Sets the capacity warning margin.
    pub fn with_capacity_warning_margin(mut self, margin: u32) -> Self {
        self.capacity_warning_margin = margin;
        self
    }

    /// Sets the capacity warning ratio.
    pub fn with_capacity_warning_ratio(mut self, ratio: f64) -> Self {
        self.capacity_warning_ratio = ratio;
        self
    }

    /// Sets the duration tolerance.
    pub fn with_duration_epsilon(mut self, epsilon: f64) -> Self {
        self.duration_epsilon = epsilon;
        self
    }

    /// Enables or disables the stale-input guard.
    pub fn with_reject_stale_input(mut self, reject: bool) -> Self {
        self.reject_stale_input = reject;
        self
    }

    /// Sets the export default for scheduled slots.
    pub fn with_export_scheduled_as_fixed(mut self, fixed: bool) -> Self {
        self.export_scheduled_as_fixed = fixed;
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.capacity_warning_ratio.is_finite() && self.capacity_warning_ratio >= 1.0) {
            return Err(ConfigError::Invalid {
                field: "capacity_warning_ratio",
                reason: format!("must be a finite value >= 1, got {}", self.capacity_warning_ratio),
            });
        }
        if !(self.duration_epsilon.is_finite() && self.duration_epsilon >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "duration_epsilon",
                reason: format!("must be a finite value >= 0, got {}", self.duration_epsilon),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.capacity_warning_margin, 5);
        assert!((config.capacity_warning_ratio - 1.25).abs() < 1e-12);
        assert!(config.reject_stale_input);
        assert!(!config.export_scheduled_as_fixed);
    }

    #[test]
    fn test_partial_toml() {
        let config = PlannerConfig::from_toml_str(
            "capacity_warning_margin = 10\nreject_stale_input = false\n",
        )
        .unwrap();
        assert_eq!(config.capacity_warning_margin, 10);
        assert!(!config.reject_stale_input);
        assert!((config.duration_epsilon - 1e-4).abs() < 1e-12);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(PlannerConfig::from_toml_str("").unwrap(), PlannerConfig::default());
    }

    #[test]
    fn test_rejects_invalid_ratio() {
        let err = PlannerConfig::from_toml_str("capacity_warning_ratio = 0.5").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "capacity_warning_ratio",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            PlannerConfig::from_toml_str("capacity_warning_margin = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
