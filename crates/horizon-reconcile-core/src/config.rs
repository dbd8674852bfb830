//! Reconciler configuration.
//!
//! Configuration can be built in code or loaded from TOML:
//!
//! ```
//! use horizon_reconcile_core::ReconcileConfig;
//!
//! let config = ReconcileConfig::from_toml_str(
//!     r#"
//!     strict_consistency = true
//!     max_passes_per_drain = 4
//!     "#,
//! )
//! .unwrap();
//!
//! assert!(config.strict_consistency);
//! assert_eq!(config.max_passes_per_drain, 4);
//! assert!(!config.log_edits);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables shared by a composite and its segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Panic on diff inconsistencies instead of logging and dropping the edit.
    pub strict_consistency: bool,
    /// Upper bound on back-to-back passes run by one drain.
    ///
    /// Requests raised while a pass runs trigger another pass; this bound
    /// stops a sink that schedules on every pass from spinning forever.
    pub max_passes_per_drain: usize,
    /// Trace every emitted edit at `trace` level.
    pub log_edits: bool,
    /// Present list sections that have no visible items.
    pub show_empty_sections: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            strict_consistency: false,
            max_passes_per_drain: 8,
            log_edits: false,
            show_empty_sections: false,
        }
    }
}

impl ReconcileConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration used by tests: inconsistencies panic.
    pub fn strict() -> Self {
        Self {
            strict_consistency: true,
            ..Default::default()
        }
    }

    /// Sets strict consistency checking.
    pub fn with_strict_consistency(mut self, strict: bool) -> Self {
        self.strict_consistency = strict;
        self
    }

    /// Sets the pass bound for one drain.
    pub fn with_max_passes_per_drain(mut self, passes: usize) -> Self {
        self.max_passes_per_drain = passes;
        self
    }

    /// Enables or disables edit tracing.
    pub fn with_log_edits(mut self, log_edits: bool) -> Self {
        self.log_edits = log_edits;
        self
    }

    /// Sets whether empty list sections are presented.
    pub fn with_show_empty_sections(mut self, show: bool) -> Self {
        self.show_empty_sections = show;
        self
    }

    /// Parses a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_passes_per_drain == 0 {
            return Err(ConfigError::invalid_value(
                "max_passes_per_drain",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ReconcileConfig::default();
        assert!(!config.strict_consistency);
        assert_eq!(config.max_passes_per_drain, 8);
        assert!(!config.show_empty_sections);
    }

    #[test]
    fn test_builder_setters() {
        let config = ReconcileConfig::new()
            .with_strict_consistency(true)
            .with_log_edits(true)
            .with_show_empty_sections(true)
            .with_max_passes_per_drain(2);
        assert!(config.strict_consistency);
        assert!(config.log_edits);
        assert!(config.show_empty_sections);
        assert_eq!(config.max_passes_per_drain, 2);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = ReconcileConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReconcileConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ReconcileConfig::from_toml_str("max_passes = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_passes_rejected() {
        let err = ReconcileConfig::from_toml_str("max_passes_per_drain = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_edits = true").unwrap();
        writeln!(file, "show_empty_sections = true").unwrap();

        let config = ReconcileConfig::load(file.path()).unwrap();
        assert!(config.log_edits);
        assert!(config.show_empty_sections);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ReconcileConfig::load("/nonexistent/reconcile.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
