//! Validation outcome of a single change

use serde::{Deserialize, Serialize};

/// How an error affects persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Malformed id/path/level/action, schema-only violation: nothing is persisted
    Structural,
    /// Rule violation given the flags and live structure: recorded as invalid
    Semantic,
}

/// One blocking validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Persistence effect
    pub class: ErrorClass,
    /// Human-readable message
    pub message: String,
}

/// Result of validating one change
///
/// Errors block the change; warnings let it proceed but flag it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Blocking errors
    pub errors: Vec<ValidationIssue>,
    /// Non-blocking warnings
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create empty (valid) result
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a structural error
    #[inline]
    pub fn structural(&mut self, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            class: ErrorClass::Structural,
            message: message.into(),
        });
    }

    /// Record a semantic error
    #[inline]
    pub fn semantic(&mut self, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            class: ErrorClass::Semantic,
            message: message.into(),
        });
    }

    /// Record a warning
    #[inline]
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// No blocking errors
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// At least one structural error (record must not be persisted)
    #[inline]
    #[must_use]
    pub fn has_structural_errors(&self) -> bool {
        self.errors.iter().any(|e| e.class == ErrorClass::Structural)
    }

    /// Carries warnings
    #[inline]
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Error messages in order
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }
}
