//! Request/response contracts of plan execution

use crate::config::SSOTUpdateConfig;
use crate::ids::{AlertId, ChangeId, PendingChangeId};
use crate::pending::{PendingChangeScope, ReviewStatus, SSOTPendingChange, ValidationStatus};
use crate::plan::SSOTChangePlan;
use crate::validation::ValidationResult;
use serde::{Deserialize, Serialize};

/// Execute one change plan for a workflow node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteSSOTChangesRequest {
    /// Company named by the caller
    #[serde(default)]
    pub company_id: String,
    /// Triggering workflow
    pub workflow_id: String,
    /// Triggering workflow node
    pub node_id: String,
    /// Triggering execution run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_run_id: Option<String>,
    /// The plan
    pub plan: SSOTChangePlan,
    /// Policy override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SSOTUpdateConfig>,
}

impl ExecuteSSOTChangesRequest {
    /// Create request without run id or policy override
    #[must_use]
    pub fn new(
        company_id: impl Into<String>,
        workflow_id: impl Into<String>,
        node_id: impl Into<String>,
        plan: SSOTChangePlan,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            workflow_id: workflow_id.into(),
            node_id: node_id.into(),
            execution_run_id: None,
            plan,
            config: None,
        }
    }

    /// With execution run id
    #[inline]
    #[must_use]
    pub fn with_run(mut self, execution_run_id: impl Into<String>) -> Self {
        self.execution_run_id = Some(execution_run_id.into());
        self
    }

    /// With policy override
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: SSOTUpdateConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Record scope for a resolved company
    #[must_use]
    pub fn scope(&self, company_id: impl Into<String>) -> PendingChangeScope {
        PendingChangeScope {
            company_id: company_id.into(),
            workflow_id: Some(self.workflow_id.clone()),
            node_id: Some(self.node_id.clone()),
            execution_run_id: self.execution_run_id.clone(),
        }
    }
}

/// Outcome for one change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessChangeResult {
    /// Change the outcome belongs to
    pub change_id: ChangeId,
    /// Validation axis
    pub validation_status: ValidationStatus,
    /// Blocking errors
    pub errors: Vec<String>,
    /// Non-blocking warnings
    pub warnings: Vec<String>,
    /// Persisted record, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_change_id: Option<PendingChangeId>,
    /// Review axis of the persisted record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReviewStatus>,
    /// Approved without a human step
    #[serde(default)]
    pub auto_approved: bool,
    /// Linked operator alert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<AlertId>,
    /// A record was written for this change
    #[serde(default)]
    pub persisted: bool,
    /// Outcome replayed from an already-reviewed record
    #[serde(default)]
    pub replayed: bool,
}

impl ProcessChangeResult {
    /// Outcome mirroring a persisted record
    #[must_use]
    pub fn from_record(record: &SSOTPendingChange) -> Self {
        Self {
            change_id: record.change_id.clone(),
            validation_status: record.validation_status,
            errors: record.validation_errors.clone(),
            warnings: record.validation_warnings.clone(),
            pending_change_id: Some(record.id),
            status: Some(record.status),
            auto_approved: record.auto_approved,
            alert_id: record.alert_id,
            persisted: true,
            replayed: false,
        }
    }

    /// Outcome of a change rejected before persistence
    #[must_use]
    pub fn rejected(
        change_id: ChangeId,
        errors: Vec<String>,
        warnings: Vec<String>,
        alert_id: Option<AlertId>,
    ) -> Self {
        Self {
            change_id,
            validation_status: ValidationStatus::Invalid,
            errors,
            warnings,
            pending_change_id: None,
            status: None,
            auto_approved: false,
            alert_id,
            persisted: false,
            replayed: false,
        }
    }

    /// Outcome of a dry run that persists nothing
    #[must_use]
    pub fn preview(change_id: ChangeId, validation: &ValidationResult) -> Self {
        let validation_status = if validation.is_valid() {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        };
        Self {
            validation_status,
            ..Self::rejected(
                change_id,
                validation.error_messages(),
                validation.warnings.clone(),
                None,
            )
        }
    }

    /// Mark as replayed
    #[inline]
    #[must_use]
    pub fn replayed(mut self) -> Self {
        self.replayed = true;
        self
    }
}

/// How a structure addition was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionOutcome {
    /// New field created
    Created,
    /// Identical field already present (no-op)
    AlreadyExists,
    /// Addition refused
    Rejected,
    /// Valid, but not committed because another addition was refused
    Skipped,
}

/// Per-addition outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureAdditionResult {
    /// Address of the field (display form)
    pub path: String,
    /// Key of the field
    pub field_key: String,
    /// Outcome
    pub outcome: AdditionOutcome,
    /// Why it was refused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of executing one change plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteSSOTChangesResponse {
    /// False only when an unrecoverable (non-validation) failure occurred
    pub success: bool,
    /// Number of changes that produced a result
    pub changes_processed: usize,
    /// Per-change outcomes, in plan order
    pub results: Vec<ProcessChangeResult>,
    /// Plan-level and system errors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Plan-level warnings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Structure pre-pass outcomes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structure_additions: Vec<StructureAdditionResult>,
    /// Plan exceptions routed to triage
    #[serde(default)]
    pub exceptions_recorded: usize,
}

impl ExecuteSSOTChangesResponse {
    /// Response for a plan that could not be started
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![error.into()],
            ..Self::default()
        }
    }

    /// Outcome for a change id
    #[must_use]
    pub fn result_for(&self, change_id: &ChangeId) -> Option<&ProcessChangeResult> {
        self.results.iter().find(|r| &r.change_id == change_id)
    }
}
