//! Structure-addition pre-pass
//!
//! Additions are staged on a working snapshot before any change is
//! validated, L2 before L3 so a plan can add a sub-domain and a field under
//! it together. The pass is all-or-nothing: one refused addition leaves the
//! snapshot untouched.

use crate::structure::StructureSnapshot;
use ssot_model::{
    AdditionOutcome, FieldDefinition, StructureAddition, StructureAdditionResult, TargetPath,
};

/// Outcome of staging a plan's structure additions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrePass {
    /// Per-addition outcomes, in plan order
    pub results: Vec<StructureAdditionResult>,
    /// Fields to create in the live structure, in staging order
    pub created: Vec<(TargetPath, FieldDefinition)>,
}

impl PrePass {
    /// At least one addition was refused
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.outcome == AdditionOutcome::Rejected)
    }

    /// Reasons of refused additions
    #[must_use]
    pub fn rejections(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| r.outcome == AdditionOutcome::Rejected)
            .map(|r| {
                format!(
                    "structure addition {} rejected: {}",
                    r.path,
                    r.reason.as_deref().unwrap_or("unknown reason")
                )
            })
            .collect()
    }
}

/// Stage additions on `snapshot`
///
/// On rejection the snapshot is left as it was, nothing is returned in
/// `created` and every addition that would have been created is reported
/// as skipped.
pub fn stage_additions(
    snapshot: &mut StructureSnapshot,
    additions: &[StructureAddition],
) -> PrePass {
    let mut order: Vec<usize> = (0..additions.len()).collect();
    order.sort_by_key(|&i| additions[i].level.depth());

    let mut working = snapshot.clone();
    let mut results: Vec<Option<StructureAdditionResult>> = vec![None; additions.len()];
    let mut created = Vec::new();

    for index in order {
        let addition = &additions[index];
        let result = match stage_one(&mut working, addition) {
            Ok((path, outcome)) => {
                if outcome == AdditionOutcome::Created {
                    created.push((path.clone(), addition.definition()));
                }
                StructureAdditionResult {
                    path: path.to_string(),
                    field_key: addition.field_key.clone(),
                    outcome,
                    reason: None,
                }
            }
            Err((path, reason)) => StructureAdditionResult {
                path,
                field_key: addition.field_key.clone(),
                outcome: AdditionOutcome::Rejected,
                reason: Some(reason),
            },
        };
        results[index] = Some(result);
    }

    let mut pass = PrePass {
        results: results.into_iter().flatten().collect(),
        created,
    };

    if pass.is_rejected() {
        pass.created.clear();
        for result in &mut pass.results {
            if result.outcome == AdditionOutcome::Created {
                result.outcome = AdditionOutcome::Skipped;
                result.reason = Some("another structure addition was rejected".to_string());
            }
        }
    } else {
        *snapshot = working;
    }

    pass
}

fn stage_one(
    working: &mut StructureSnapshot,
    addition: &StructureAddition,
) -> Result<(TargetPath, AdditionOutcome), (String, String)> {
    let path = addition.resolve().map_err(|err| {
        let parent = &addition.parent_path;
        let shown = std::iter::once(parent.l1.as_str())
            .chain(parent.l2.as_deref())
            .chain(std::iter::once(addition.field_key.as_str()))
            .collect::<Vec<_>>()
            .join(" / ");
        (shown, err.to_string())
    })?;

    let parent_exists = path.parent().is_some_and(|p| working.contains(&p));
    if !parent_exists {
        return Err((path.to_string(), "parent does not exist".to_string()));
    }

    let definition = addition.definition();
    match working.get(&path).and_then(|e| e.definition.as_ref()) {
        Some(existing) if *existing == definition => Ok((path, AdditionOutcome::AlreadyExists)),
        Some(_) => Err((
            path.to_string(),
            "field exists with a different definition".to_string(),
        )),
        None => {
            working.define(path.clone(), definition);
            Ok((path, AdditionOutcome::Created))
        }
    }
}
