//! Per-change validation
//!
//! Pure function of the change, the update policy and a structure snapshot.
//! Errors are accumulated; the checks that need a resolved address are
//! skipped when the address does not resolve.

use crate::structure::StructureSnapshot;
use serde_json::Value;
use ssot_model::{ChangeAction, SSOTChange, SSOTUpdateConfig, ValidationResult};

/// Validates proposed changes against policy and structure
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeValidator;

impl ChangeValidator {
    /// Create new validator instance
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate one change
    ///
    /// Structural errors (malformed id, unresolvable address, schema-only
    /// violation) mean the change must not be persisted. Semantic errors
    /// (conflicting create, missing target, scoring, provenance) are
    /// recorded on an invalid record.
    #[must_use]
    pub fn validate(
        &self,
        change: &SSOTChange,
        config: &SSOTUpdateConfig,
        snapshot: &StructureSnapshot,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Err(err) = change.change_id.sequence() {
            result.structural(err.to_string());
        }

        let path = match change.resolve_path() {
            Ok(path) => Some(path),
            Err(err) => {
                result.structural(format!("invalid target path: {err}"));
                None
            }
        };

        if config.schema_only && change.action != ChangeAction::CreateField {
            result.structural(format!(
                "schema_only mode allows only create_field, got {}",
                change.action.name()
            ));
        }

        if let Some(path) = &path {
            let exists = snapshot.contains(path);
            match change.action {
                ChangeAction::CreateField if exists => {
                    result.semantic(format!("create_field conflicts with existing field {path}"));
                }
                ChangeAction::CreateField => {
                    if let Some(parent) = path.parent().filter(|p| !snapshot.contains(p)) {
                        result.warn(format!(
                            "parent {parent} does not exist and will be created with the field"
                        ));
                    }
                }
                ChangeAction::Overwrite | ChangeAction::Append if !exists => {
                    result.semantic(format!(
                        "{} targets missing field {path}",
                        change.action.name()
                    ));
                }
                ChangeAction::Overwrite | ChangeAction::Append => {}
            }
        }

        if change.is_scored
            && change
                .evaluation_method
                .as_deref()
                .map_or(true, |m| m.trim().is_empty())
        {
            result.semantic("is_scored is set but evaluation_method is missing");
        }

        if let (Some(path), Some(expected)) = (&path, &change.current_value) {
            let live = snapshot.value(path).unwrap_or(&Value::Null);
            if expected != live {
                result.warn(format!(
                    "current_value is stale at {path}: expected {expected}, live value is {live}"
                ));
            }
        }

        if change.provenance.source.trim().is_empty() {
            result.semantic("provenance source is blank");
        }

        let blank = change
            .preconditions
            .iter()
            .filter(|p| p.trim().is_empty())
            .count();
        if blank > 0 {
            result.warn(format!("{blank} blank precondition(s) ignored"));
        }

        result
    }
}

/// Validate one change with the default validator
#[must_use]
pub fn validate_change(
    change: &SSOTChange,
    config: &SSOTUpdateConfig,
    snapshot: &StructureSnapshot,
) -> ValidationResult {
    ChangeValidator::new().validate(change, config, snapshot)
}
