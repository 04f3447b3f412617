//! Durable, reviewable pending-change records
//!
//! An [`SSOTPendingChange`] is derived one-to-one from an accepted
//! [`SSOTChange`]. It is created by the processor, mutated only through the
//! review transitions below, and never deleted.

use crate::change::{ChangeAction, DataType, Provenance, SSOTChange};
use crate::ids::{AlertId, ChangeId, PendingChangeId};
use crate::lifecycle::{self, TransitionError};
use crate::path::{TargetLevel, TargetPath};
use crate::validation::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Validation axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Not validated yet
    Pending,
    /// Passed validation (possibly with warnings)
    Valid,
    /// Failed validation
    Invalid,
}

impl Display for ValidationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Valid => "valid",
            ValidationStatus::Invalid => "invalid",
        })
    }
}

/// Review axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Awaiting review
    Pending,
    /// Approved (by a reviewer or automatically)
    Approved,
    /// Rejected by a reviewer
    Rejected,
}

impl Display for ReviewStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        })
    }
}

/// Execution context a record is scoped to
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingChangeScope {
    /// Owning company
    pub company_id: String,
    /// Triggering workflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Triggering workflow node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Triggering execution run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_run_id: Option<String>,
}

impl PendingChangeScope {
    /// Scope for a company with no execution context
    #[inline]
    #[must_use]
    pub fn company(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            ..Self::default()
        }
    }

    /// Idempotency key of `change_id` within this scope
    #[must_use]
    pub fn key(&self, change_id: &ChangeId) -> PendingChangeKey {
        PendingChangeKey {
            company_id: self.company_id.clone(),
            workflow_id: self.workflow_id.clone(),
            execution_run_id: self.execution_run_id.clone(),
            change_id: change_id.clone(),
        }
    }
}

/// Idempotency key: `change_id` scoped to company, workflow and run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PendingChangeKey {
    /// Owning company
    pub company_id: String,
    /// Triggering workflow
    pub workflow_id: Option<String>,
    /// Triggering execution run
    pub execution_run_id: Option<String>,
    /// Plan-scoped change id
    pub change_id: ChangeId,
}

impl Display for PendingChangeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.company_id,
            self.workflow_id.as_deref().unwrap_or("-"),
            self.execution_run_id.as_deref().unwrap_or("-"),
            self.change_id
        )
    }
}

/// Reviewable record of one proposed change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SSOTPendingChange {
    /// Record identifier
    pub id: PendingChangeId,
    /// Owning company
    pub company_id: String,
    /// Triggering workflow
    pub workflow_id: Option<String>,
    /// Triggering workflow node
    pub node_id: Option<String>,
    /// Triggering execution run
    pub execution_run_id: Option<String>,
    /// Plan-scoped change id
    pub change_id: ChangeId,
    /// Resolved address
    pub target_path: TargetPath,
    /// Kind of write
    pub action: ChangeAction,
    /// Semantic kind of the value
    pub data_type: DataType,
    /// Whether the field is scored
    pub is_scored: bool,
    /// Evaluation method for scored fields
    pub evaluation_method: Option<String>,
    /// Value proposed by the change
    pub value_to_write: Value,
    /// Value the proposer believed was live
    pub current_value: Option<Value>,
    /// Value the target holds once this change is applied after the
    /// earlier changes of the same plan
    pub proposed_value: Option<Value>,
    /// Origin of the value
    pub provenance: Provenance,
    /// Free-text notes
    pub notes: Option<String>,
    /// Validation axis
    pub validation_status: ValidationStatus,
    /// Blocking validation errors
    pub validation_errors: Vec<String>,
    /// Non-blocking validation warnings
    pub validation_warnings: Vec<String>,
    /// Review axis
    pub status: ReviewStatus,
    /// Approved without a human step
    pub auto_approved: bool,
    /// Reviewer identity
    pub reviewed_by: Option<String>,
    /// Review time
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Reason given on rejection
    pub rejection_reason: Option<String>,
    /// Linked operator alert
    pub alert_id: Option<AlertId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl SSOTPendingChange {
    /// Derive a record from a validated change
    #[must_use]
    pub fn from_change(
        change: &SSOTChange,
        target_path: TargetPath,
        scope: &PendingChangeScope,
        validation: &ValidationResult,
        proposed_value: Option<Value>,
    ) -> Self {
        let now = Utc::now();
        let validation_status = if validation.is_valid() {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        };

        Self {
            id: PendingChangeId::new(),
            company_id: scope.company_id.clone(),
            workflow_id: scope.workflow_id.clone(),
            node_id: scope.node_id.clone(),
            execution_run_id: scope.execution_run_id.clone(),
            change_id: change.change_id.clone(),
            target_path,
            action: change.action,
            data_type: change.data_type.clone(),
            is_scored: change.is_scored,
            evaluation_method: change.evaluation_method.clone(),
            value_to_write: change.value_to_write.clone(),
            current_value: change.current_value.clone(),
            proposed_value,
            provenance: change.provenance.clone(),
            notes: change.notes.clone(),
            validation_status,
            validation_errors: validation.error_messages(),
            validation_warnings: validation.warnings.clone(),
            status: ReviewStatus::Pending,
            auto_approved: false,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            alert_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Keep the identity of an earlier record for the same key
    #[inline]
    #[must_use]
    pub fn with_identity(mut self, previous: &SSOTPendingChange) -> Self {
        self.id = previous.id;
        self.created_at = previous.created_at;
        self
    }

    /// Link an operator alert
    #[inline]
    #[must_use]
    pub fn with_alert(mut self, alert_id: AlertId) -> Self {
        self.alert_id = Some(alert_id);
        self
    }

    /// Idempotency key
    #[must_use]
    pub fn key(&self) -> PendingChangeKey {
        PendingChangeKey {
            company_id: self.company_id.clone(),
            workflow_id: self.workflow_id.clone(),
            execution_run_id: self.execution_run_id.clone(),
            change_id: self.change_id.clone(),
        }
    }

    /// Address depth
    #[inline]
    #[must_use]
    pub fn target_level(&self) -> TargetLevel {
        self.target_path.level()
    }

    /// Review finished (approved or rejected)
    #[inline]
    #[must_use]
    pub fn is_reviewed(&self) -> bool {
        self.status != ReviewStatus::Pending
    }

    /// Approve on behalf of a reviewer
    ///
    /// # Errors
    /// - [`TransitionError::MissingReviewer`] for a blank reviewer
    /// - [`TransitionError::NotApprovable`] unless validation passed
    /// - [`TransitionError::UnacknowledgedWarnings`] when warnings exist and
    ///   `acknowledge_warnings` is false
    /// - [`TransitionError::IllegalReview`] when already reviewed
    pub fn approve(
        &mut self,
        reviewer: &str,
        acknowledge_warnings: bool,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if reviewer.trim().is_empty() {
            return Err(TransitionError::MissingReviewer);
        }
        self.check_approvable(acknowledge_warnings)?;

        self.status = ReviewStatus::Approved;
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Approve without a human step
    ///
    /// # Errors
    /// Same rules as [`SSOTPendingChange::approve`] with warnings acknowledged
    /// by policy.
    pub fn auto_approve(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.check_approvable(true)?;
        self.status = ReviewStatus::Approved;
        self.auto_approved = true;
        self.updated_at = at;
        Ok(())
    }

    /// Check whether an approval would be accepted
    pub fn check_approvable(&self, acknowledge_warnings: bool) -> Result<(), TransitionError> {
        if self.validation_status != ValidationStatus::Valid {
            return Err(TransitionError::NotApprovable(self.validation_status));
        }
        if !acknowledge_warnings && !self.validation_warnings.is_empty() {
            return Err(TransitionError::UnacknowledgedWarnings(
                self.validation_warnings.len(),
            ));
        }
        lifecycle::validate_transition(self.status, ReviewStatus::Approved)
    }

    /// Reject on behalf of a reviewer
    ///
    /// # Errors
    /// - [`TransitionError::MissingReviewer`] for a blank reviewer
    /// - [`TransitionError::MissingRejectionReason`] for a blank reason
    /// - [`TransitionError::IllegalReview`] when already reviewed
    pub fn reject(
        &mut self,
        reviewer: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if reviewer.trim().is_empty() {
            return Err(TransitionError::MissingReviewer);
        }
        if reason.trim().is_empty() {
            return Err(TransitionError::MissingRejectionReason);
        }
        lifecycle::validate_transition(self.status, ReviewStatus::Rejected)?;

        self.status = ReviewStatus::Rejected;
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(at);
        self.rejection_reason = Some(reason.to_string());
        self.updated_at = at;
        Ok(())
    }
}
