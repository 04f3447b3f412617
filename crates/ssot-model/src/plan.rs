//! Change plans
//!
//! An [`SSOTChangePlan`] is the batch an upstream agent produces: validated
//! changes, schema additions they depend on, and the proposals it could not
//! resolve.

use crate::change::SSOTChange;
use crate::ids::ChangeId;
use crate::path::{PathError, RawTargetPath, TargetLevel, TargetPath};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

/// Schema definition of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Human-readable name
    pub display_name: String,
    /// Declared value type
    pub field_type: String,
    /// Whether values are scored
    #[serde(default)]
    pub is_scored: bool,
    /// Weight in the parent's score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_weight: Option<f64>,
}

impl FieldDefinition {
    /// Create an unscored definition
    #[inline]
    #[must_use]
    pub fn new(display_name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            field_type: field_type.into(),
            is_scored: false,
            score_weight: None,
        }
    }

    /// Definition used for fields created implicitly by a value write
    #[inline]
    #[must_use]
    pub fn implicit(key: &str) -> Self {
        Self::new(key, "any")
    }
}

/// New L2/L3 field co-proposed with a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAddition {
    /// Address of the parent (depth = `level` - 1)
    pub parent_path: RawTargetPath,
    /// Level of the new field (L2 or L3)
    pub level: TargetLevel,
    /// Key unique within the parent
    pub field_key: String,
    /// Human-readable name
    pub display_name: String,
    /// Declared value type
    pub field_type: String,
    /// Whether values are scored
    #[serde(default)]
    pub is_scored: bool,
    /// Weight in the parent's score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_weight: Option<f64>,
}

impl StructureAddition {
    /// Create an unscored addition
    #[must_use]
    pub fn new(
        parent_path: RawTargetPath,
        level: TargetLevel,
        field_key: impl Into<String>,
        display_name: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        Self {
            parent_path,
            level,
            field_key: field_key.into(),
            display_name: display_name.into(),
            field_type: field_type.into(),
            is_scored: false,
            score_weight: None,
        }
    }

    /// Mark as scored
    #[inline]
    #[must_use]
    pub fn scored(mut self, weight: Option<f64>) -> Self {
        self.is_scored = true;
        self.score_weight = weight;
        self
    }

    /// Address of the field this addition creates
    ///
    /// # Errors
    /// Returns [`AdditionError`] when the level is not L2/L3, the parent
    /// path does not resolve one level above, the key is blank or the
    /// score weight is outside `0.0..=1.0`.
    pub fn resolve(&self) -> Result<TargetPath, AdditionError> {
        let parent_level = match self.level {
            TargetLevel::L2 => TargetLevel::L1C,
            TargetLevel::L3 => TargetLevel::L2,
            other => return Err(AdditionError::UnsupportedLevel(other)),
        };

        let key = self.field_key.trim();
        if key.is_empty() {
            return Err(AdditionError::BlankKey);
        }

        if let Some(weight) = self.score_weight {
            if !(0.0..=1.0).contains(&weight) {
                return Err(AdditionError::WeightOutOfRange(weight));
            }
        }

        let parent = TargetPath::resolve(&self.parent_path, parent_level)?;
        parent
            .child(key)
            .ok_or(AdditionError::UnsupportedLevel(self.level))
    }

    /// Field definition carried by this addition
    #[must_use]
    pub fn definition(&self) -> FieldDefinition {
        FieldDefinition {
            display_name: self.display_name.clone(),
            field_type: self.field_type.clone(),
            is_scored: self.is_scored,
            score_weight: self.score_weight,
        }
    }
}

/// Structure addition errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdditionError {
    /// Only L2 and L3 fields can be added
    #[error("structure additions must target L2 or L3, got {0}")]
    UnsupportedLevel(TargetLevel),

    /// Empty `field_key`
    #[error("field_key must not be empty")]
    BlankKey,

    /// `score_weight` outside `0.0..=1.0`
    #[error("score_weight {0} must be between 0 and 1")]
    WeightOutOfRange(f64),

    /// Parent path does not resolve
    #[error("invalid parent_path: {0}")]
    InvalidParent(#[from] PathError),
}

/// Downstream handling of an unresolved proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionDisposition {
    /// Send back to the consensus step
    ReturnToConsensus,
    /// Propose an update to the agent context instead
    ProposeContextUpdate,
    /// Ask a human for clarification
    RequestClarification,
}

impl Display for ExceptionDisposition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExceptionDisposition::ReturnToConsensus => "return_to_consensus",
            ExceptionDisposition::ProposeContextUpdate => "propose_context_update",
            ExceptionDisposition::RequestClarification => "request_clarification",
        })
    }
}

/// Proposal the upstream agent could not validate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanException {
    /// Change the exception refers to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_id: Option<ChangeId>,
    /// Downstream handling
    pub disposition: ExceptionDisposition,
    /// Why it could not be resolved
    pub reason: String,
}

/// Batch of proposed changes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SSOTChangePlan {
    /// Human-readable summary lines
    #[serde(default)]
    pub summary: Vec<String>,
    /// Changes to process, in order
    #[serde(default)]
    pub validated_changes: Vec<SSOTChange>,
    /// Schema fields to create first
    #[serde(default)]
    pub new_structure_additions: Vec<StructureAddition>,
    /// Proposals routed to triage
    #[serde(default)]
    pub plan_exceptions: Vec<PlanException>,
    /// Company named by the upstream input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
}

impl SSOTChangePlan {
    /// Create empty plan
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a change appended
    #[inline]
    #[must_use]
    pub fn with_change(mut self, change: SSOTChange) -> Self {
        self.validated_changes.push(change);
        self
    }

    /// With a structure addition appended
    #[inline]
    #[must_use]
    pub fn with_addition(mut self, addition: StructureAddition) -> Self {
        self.new_structure_additions.push(addition);
        self
    }

    /// With an exception appended
    #[inline]
    #[must_use]
    pub fn with_exception(mut self, exception: PlanException) -> Self {
        self.plan_exceptions.push(exception);
        self
    }

    /// Check that exceptions and validated changes partition the proposal
    ///
    /// Reports every validated change that repeats an earlier `change_id` or
    /// is also listed as an exception. The offending entries should not be
    /// processed.
    #[must_use]
    pub fn check_partition(&self) -> Vec<PartitionViolation> {
        let excepted: HashSet<&ChangeId> = self
            .plan_exceptions
            .iter()
            .filter_map(|e| e.change_id.as_ref())
            .collect();

        let mut seen = HashSet::new();
        let mut violations = Vec::new();

        for (index, change) in self.validated_changes.iter().enumerate() {
            if excepted.contains(&change.change_id) {
                violations.push(PartitionViolation::ExceptionOverlap {
                    change_id: change.change_id.clone(),
                    index,
                });
            } else if !seen.insert(&change.change_id) {
                violations.push(PartitionViolation::DuplicateChange {
                    change_id: change.change_id.clone(),
                    index,
                });
            }
        }

        violations
    }

    /// Change ids that do not increase over their predecessor
    #[must_use]
    pub fn non_monotonic_ids(&self) -> Vec<ChangeId> {
        let mut last: Option<u32> = None;
        let mut out = Vec::new();

        for change in &self.validated_changes {
            let Ok(seq) = change.change_id.sequence() else {
                continue;
            };
            if last.is_some_and(|prev| seq <= prev) {
                out.push(change.change_id.clone());
            }
            last = Some(seq);
        }

        out
    }
}

/// Plan partition violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartitionViolation {
    /// `change_id` listed twice among validated changes
    #[error("change {change_id} appears more than once in validated_changes")]
    DuplicateChange {
        /// Repeated id
        change_id: ChangeId,
        /// Index of the repeated entry
        index: usize,
    },

    /// `change_id` listed both as validated change and as exception
    #[error("change {change_id} is listed both as a validated change and as a plan exception")]
    ExceptionOverlap {
        /// Overlapping id
        change_id: ChangeId,
        /// Index in `validated_changes`
        index: usize,
    },
}

impl PartitionViolation {
    /// Index of the offending entry in `validated_changes`
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::DuplicateChange { index, .. } | Self::ExceptionOverlap { index, .. } => *index,
        }
    }
}
