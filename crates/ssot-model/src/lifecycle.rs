//! Pending-change state machine
//!
//! Two independent axes:
//! - validation: `pending → valid | invalid`
//! - review: `pending → approved | rejected`
//!
//! Both end states are terminal.

use crate::pending::{ReviewStatus, ValidationStatus};

/// Validate a review transition
pub fn validate_transition(from: ReviewStatus, to: ReviewStatus) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::IllegalReview { from, to })
    }
}

/// Review states reachable from `from`
pub fn allowed_transitions(from: ReviewStatus) -> Vec<ReviewStatus> {
    use ReviewStatus::*;
    match from {
        Pending => vec![Approved, Rejected],
        Approved => vec![],
        Rejected => vec![],
    }
}

/// Validate a validation-status transition
pub fn validate_validation_transition(
    from: ValidationStatus,
    to: ValidationStatus,
) -> Result<(), TransitionError> {
    if allowed_validation_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::IllegalValidation { from, to })
    }
}

/// Validation states reachable from `from`
pub fn allowed_validation_transitions(from: ValidationStatus) -> Vec<ValidationStatus> {
    use ValidationStatus::*;
    match from {
        Pending => vec![Valid, Invalid],
        Valid => vec![],
        Invalid => vec![],
    }
}

/// Lifecycle violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Review transition not allowed
    #[error("illegal review transition {from} -> {to}")]
    IllegalReview {
        /// Current status
        from: ReviewStatus,
        /// Requested status
        to: ReviewStatus,
    },

    /// Validation transition not allowed
    #[error("illegal validation transition {from} -> {to}")]
    IllegalValidation {
        /// Current status
        from: ValidationStatus,
        /// Requested status
        to: ValidationStatus,
    },

    /// Only valid records can be approved
    #[error("record with validation status {0} cannot be approved; correct and resubmit under a new change id")]
    NotApprovable(ValidationStatus),

    /// Record carries warnings the reviewer did not acknowledge
    #[error("record has {0} warning(s) that must be acknowledged before approval")]
    UnacknowledgedWarnings(usize),

    /// Rejection without a reason
    #[error("rejection requires a non-empty reason")]
    MissingRejectionReason,

    /// Reviewer identity missing
    #[error("reviewer identity must not be empty")]
    MissingReviewer,
}
