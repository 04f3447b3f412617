//! Identifiers
//!
//! - [`ChangeId`]: plan-scoped change identifier in `CHG-NNN` form
//! - [`PendingChangeId`]: durable record identifier
//! - [`AlertId`]: identifier linking a record to an operator alert

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Prefix every change identifier carries
pub const CHANGE_ID_PREFIX: &str = "CHG-";

/// Minimum number of digits after the prefix
pub const CHANGE_ID_MIN_DIGITS: usize = 3;

/// Change identifier (`CHG-001`, `CHG-042`, ...)
///
/// Deserialization is lenient so that a malformed id coming from an upstream
/// agent surfaces as a validation error on that change instead of failing the
/// whole request. Use [`ChangeId::parse`] or [`ChangeId::is_well_formed`] to
/// check the format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(String);

impl ChangeId {
    /// Wrap a raw identifier without checking its format
    #[inline]
    #[must_use]
    pub fn new_unchecked(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Parse and validate a `CHG-NNN` identifier
    pub fn parse(raw: &str) -> Result<Self, ChangeIdError> {
        let id = Self(raw.to_string());
        id.sequence()?;
        Ok(id)
    }

    /// Build the identifier for a sequence number (`7` → `CHG-007`)
    #[inline]
    #[must_use]
    pub fn from_sequence(seq: u32) -> Self {
        Self(format!("{CHANGE_ID_PREFIX}{seq:03}"))
    }

    /// Numeric part of the identifier
    pub fn sequence(&self) -> Result<u32, ChangeIdError> {
        let digits = self
            .0
            .strip_prefix(CHANGE_ID_PREFIX)
            .ok_or_else(|| ChangeIdError::MissingPrefix(self.0.clone()))?;

        if digits.len() < CHANGE_ID_MIN_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ChangeIdError::InvalidDigits(self.0.clone()));
        }

        digits
            .parse::<u32>()
            .map_err(|_| ChangeIdError::InvalidDigits(self.0.clone()))
    }

    /// Check the `CHG-NNN` format
    #[inline]
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.sequence().is_ok()
    }

    /// Raw string form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChangeId {
    type Err = ChangeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Change identifier format errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChangeIdError {
    /// Identifier does not start with `CHG-`
    #[error("change id '{0}' must start with 'CHG-'")]
    MissingPrefix(String),

    /// Numeric part is missing, too short or not numeric
    #[error("change id '{0}' must end with at least 3 digits")]
    InvalidDigits(String),
}

/// Identifier of a persisted pending-change record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingChangeId(pub Uuid);

impl PendingChangeId {
    /// Generate new record ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PendingChangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PendingChangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an operator alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub Uuid);

impl AlertId {
    /// Generate new alert ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AlertId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
