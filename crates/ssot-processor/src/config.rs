//! Processor configuration

use crate::error::ProcessorError;
use serde::{Deserialize, Serialize};
use ssot_model::SSOTUpdateConfig;
use std::path::Path;

/// Processor configuration
///
/// `update` is the policy used when a request carries no `config` of its
/// own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Default update policy
    pub update: SSOTUpdateConfig,
    /// Raise an alert for valid changes that carry warnings
    pub alert_on_warnings: bool,
    /// Largest accepted plan (number of validated changes)
    pub max_changes_per_plan: usize,
}

impl ProcessorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With default update policy
    #[inline]
    #[must_use]
    pub fn with_update(mut self, update: SSOTUpdateConfig) -> Self {
        self.update = update;
        self
    }

    /// With warning alerts on or off
    #[inline]
    #[must_use]
    pub fn with_alert_on_warnings(mut self, enabled: bool) -> Self {
        self.alert_on_warnings = enabled;
        self
    }

    /// With plan size limit
    #[inline]
    #[must_use]
    pub fn with_max_changes(mut self, max: usize) -> Self {
        self.max_changes_per_plan = max;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns [`ProcessorError::Config`] when the text is not valid TOML
    /// for this type.
    pub fn from_toml_str(text: &str) -> Result<Self, ProcessorError> {
        toml::from_str(text).map_err(|e| ProcessorError::Config(e.to_string()))
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`ProcessorError::Config`] when the file cannot be read or
    /// parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProcessorError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ProcessorError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            update: SSOTUpdateConfig::default(),
            alert_on_warnings: true,
            max_changes_per_plan: 500,
        }
    }
}
