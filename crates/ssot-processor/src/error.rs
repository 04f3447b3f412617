//! Error types for the SSOT processor
//!
//! Covers the failures that are not validation outcomes:
//! - Collaborator store failures
//! - Alert delivery failures
//! - Unrecoverable plan failures
//! - Review transitions that cannot be applied

use ssot_model::{PendingChangeId, TransitionError};

/// Failure of a structure or pending-change store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Backend cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Write conflicts with stored state
    #[error("conflict at {path}: {reason}")]
    Conflict {
        /// Address of the conflict
        path: String,
        /// What conflicted
        reason: String,
    },

    /// Record or field does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored data could not be (de)serialized
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Failure to deliver an alert
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertError {
    /// Sink rejected or dropped the alert
    #[error("alert delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Unrecoverable processor failure
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Owning company could not be determined
    #[error("company could not be resolved: {0}")]
    CompanyResolution(String),

    /// Plan exceeds the configured size limit
    #[error("plan has {count} changes, limit is {limit}")]
    PlanTooLarge {
        /// Number of changes in the plan
        count: usize,
        /// Configured limit
        limit: usize,
    },

    /// Collaborator store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Auto-approved change could not be applied
    #[error("auto-approval of {change_id} not applied: {source}")]
    AutoApproval {
        /// Change that stayed pending
        change_id: String,
        /// Underlying store failure
        source: StoreError,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProcessorError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) | Self::AutoApproval { source: err, .. } => err.is_retryable(),
            Self::CompanyResolution(_) | Self::PlanTooLarge { .. } | Self::Config(_) => false,
        }
    }
}

/// Review transition failure
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// No record with that id
    #[error("pending change {0} not found")]
    NotFound(PendingChangeId),

    /// Transition refused by the lifecycle rules
    #[error("transition refused: {0}")]
    Transition(#[from] TransitionError),

    /// Collaborator store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for processor operations
pub type Result<T> = std::result::Result<T, ProcessorError>;
