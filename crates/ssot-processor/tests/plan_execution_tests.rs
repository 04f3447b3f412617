//! Functional tests for change plan execution.
//!
//! These tests drive ChangePlanProcessor::execute_change_plan end to end over
//! in-memory collaborators:
//! - validation outcomes and what gets persisted for each error class
//! - idempotent re-execution and replay of reviewed records
//! - plan-order staging (append ordering, later changes seeing earlier ones)
//! - auto-approval policy and schema-only mode
//! - structure pre-pass, plan exceptions and failure isolation

use pretty_assertions::assert_eq;
use serde_json::json;
use ssot_model::{
    AdditionOutcome, ChangeId, ExceptionDisposition, PlanException, ReviewStatus,
    SSOTChangePlan, SSOTUpdateConfig, TargetCompanySource, ValidationStatus,
};
use ssot_processor::{
    AlertKind, ChangePlanProcessor, InMemoryAlertSink, InMemoryPendingChangeStore,
    PendingChangeStore, ProcessorConfig, StructureStore,
};
use ssot_test_utils::{
    addition, append, create, funded_structure, overwrite, plan_of, request, setup_harness,
    target, FailingAlertSink, FlakyPendingStore, FlakyStructureStore, Harness, COMPANY,
};
use std::sync::Arc;

const LEAD: &[&str] = &["Financials", "Funding", "Rounds", "Lead Investors"];
const ROUNDS: &[&str] = &["Financials", "Funding", "Rounds"];
const TOTAL: &[&str] = &["Financials", "Funding", "Total", "USD"];

fn auto_l4() -> SSOTUpdateConfig {
    SSOTUpdateConfig::new().with_auto_approve_l4(true)
}

/// Tenet: a create_field on an empty structure is valid, clean and counted.
#[tokio::test]
async fn create_on_empty_structure() {
    let harness = Harness::new(ProcessorConfig::new());
    let plan = plan_of(vec![create(1, &["Financials"], json!("Series A"))]);

    let response = harness.processor.execute_change_plan(&request(plan)).await;

    assert!(response.success);
    assert_eq!(response.changes_processed, 1);
    let result = &response.results[0];
    assert_eq!(result.change_id, ChangeId::parse("CHG-001").unwrap());
    assert_eq!(result.validation_status, ValidationStatus::Valid);
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
    assert!(result.persisted);
    assert_eq!(result.status, Some(ReviewStatus::Pending));
}

/// Tenet: creating a field that already exists is invalid, but recorded
/// for review with a linked alert.
#[tokio::test]
async fn conflicting_create_is_recorded_invalid() {
    let harness = setup_harness();
    let plan = plan_of(vec![create(1, &["Financials", "Funding"], json!({}))]);

    let response = harness.processor.execute_change_plan(&request(plan)).await;

    assert!(response.success, "validation failures are not system failures");
    let result = &response.results[0];
    assert_eq!(result.validation_status, ValidationStatus::Invalid);
    assert!(result.persisted);
    assert_eq!(result.status, Some(ReviewStatus::Pending));

    let alert_id = result.alert_id.expect("invalid change raises an alert");
    let alert = harness.alerts.get(alert_id).unwrap();
    assert_eq!(alert.kind, AlertKind::InvalidChange);
    assert_eq!(alert.pending_change_id, result.pending_change_id);

    let record = harness.record(result.pending_change_id.unwrap()).await;
    assert_eq!(record.alert_id, Some(alert_id));
}

/// Tenet: a scored change without an evaluation method fails validation.
#[tokio::test]
async fn scored_change_needs_evaluation_method() {
    let harness = setup_harness();
    let mut change = overwrite(1, &["Team", "Founders", "Count"], json!(3));
    change.is_scored = true;

    let response = harness
        .processor
        .execute_change_plan(&request(plan_of(vec![change])))
        .await;

    let result = &response.results[0];
    assert_eq!(result.validation_status, ValidationStatus::Invalid);
    assert!(result.errors[0].contains("evaluation_method"));
}

/// Tenet: executing the same request twice yields one record per change id.
#[tokio::test]
async fn re_execution_is_idempotent() {
    let harness = setup_harness();
    let plan = plan_of(vec![
        overwrite(1, &["Team", "Founders", "Count"], json!(3)),
        append(2, ROUNDS, json!("series-a")),
    ]);
    let request = request(plan);

    let first = harness.processor.execute_change_plan(&request).await;
    let second = harness.processor.execute_change_plan(&request).await;

    assert_eq!(harness.pending.len(), 2);
    for (a, b) in first.results.iter().zip(&second.results) {
        assert_eq!(a.pending_change_id, b.pending_change_id);
    }
    assert!(second.results.iter().all(|r| !r.replayed));
}

/// Tenet: a change already reviewed is replayed, not re-applied.
#[tokio::test]
async fn reviewed_change_is_replayed() {
    let harness = setup_harness();
    let request = request(plan_of(vec![append(1, LEAD, json!("Beta Capital"))])).with_config(auto_l4());

    let first = harness.processor.execute_change_plan(&request).await;
    assert_eq!(first.results[0].status, Some(ReviewStatus::Approved));

    let second = harness.processor.execute_change_plan(&request).await;
    let replay = &second.results[0];
    assert!(replay.replayed);
    assert!(replay.auto_approved);
    assert_eq!(replay.pending_change_id, first.results[0].pending_change_id);
    assert_eq!(
        harness.value(LEAD).await,
        Some(json!(["Acme Ventures", "Beta Capital"]))
    );
}

/// Tenet: appends to one target are staged in plan order.
#[tokio::test]
async fn appends_follow_plan_order() {
    let harness = setup_harness();
    let plan = plan_of(vec![
        append(1, ROUNDS, json!("series-a")),
        append(2, ROUNDS, json!("series-b")),
    ]);

    let response = harness.processor.execute_change_plan(&request(plan)).await;

    let first = harness.record(response.results[0].pending_change_id.unwrap()).await;
    let second = harness.record(response.results[1].pending_change_id.unwrap()).await;
    assert_eq!(first.proposed_value, Some(json!(["seed", "series-a"])));
    assert_eq!(second.proposed_value, Some(json!(["seed", "series-a", "series-b"])));

    // Nothing applied until review
    assert_eq!(harness.value(ROUNDS).await, Some(json!(["seed"])));
}

/// Tenet: auto-approved appends reach the live structure in plan order.
#[tokio::test]
async fn auto_approved_appends_apply_in_order() {
    let harness = setup_harness();
    let plan = plan_of(vec![
        append(1, LEAD, json!("Beta Capital")),
        append(2, LEAD, json!(["Gamma Partners", "Delta Fund"])),
    ]);

    harness
        .processor
        .execute_change_plan(&request(plan).with_config(auto_l4()))
        .await;

    assert_eq!(
        harness.value(LEAD).await,
        Some(json!(["Acme Ventures", "Beta Capital", "Gamma Partners", "Delta Fund"]))
    );
}

/// Tenet: auto_approve_l4 approves valid L4 changes only.
#[tokio::test]
async fn auto_approval_is_limited_to_l4() {
    let harness = setup_harness();
    let plan = plan_of(vec![
        overwrite(1, TOTAL, json!(4_000_000)),
        overwrite(2, &["Financials", "Funding"], json!("Raised through Series A")),
    ]);

    let response = harness
        .processor
        .execute_change_plan(&request(plan).with_config(auto_l4()))
        .await;

    let l4 = &response.results[0];
    assert_eq!(l4.status, Some(ReviewStatus::Approved));
    assert!(l4.auto_approved);
    assert_eq!(harness.value(TOTAL).await, Some(json!(4_000_000)));

    let l2 = &response.results[1];
    assert_eq!(l2.validation_status, ValidationStatus::Valid);
    assert_eq!(l2.status, Some(ReviewStatus::Pending));
    assert!(!l2.auto_approved);
}

/// Tenet: require_approval_create keeps L4 field creation in review.
#[tokio::test]
async fn require_approval_create_overrides_auto_approval() {
    let harness = setup_harness();
    let plan = plan_of(vec![create(1, &["Financials", "Funding", "Total", "EUR"], json!(1_400_000))]);
    let config = auto_l4().with_require_approval_create(true);

    let response = harness
        .processor
        .execute_change_plan(&request(plan).with_config(config))
        .await;

    assert_eq!(response.results[0].status, Some(ReviewStatus::Pending));
    assert!(harness.value(&["Financials", "Funding", "Total", "EUR"]).await.is_none());
}

/// Tenet: schema_only rejects value writes structurally; nothing persisted.
#[tokio::test]
async fn schema_only_rejects_overwrite() {
    let harness = setup_harness();
    let plan = plan_of(vec![
        overwrite(1, TOTAL, json!(2_000_000)),
        create(2, &["Market"], json!({})),
    ]);
    let config = SSOTUpdateConfig::new().with_schema_only(true);

    let response = harness
        .processor
        .execute_change_plan(&request(plan).with_config(config))
        .await;

    let rejected = &response.results[0];
    assert_eq!(rejected.validation_status, ValidationStatus::Invalid);
    assert!(!rejected.persisted);
    assert!(rejected.pending_change_id.is_none());
    assert!(rejected.alert_id.is_some());

    assert_eq!(response.results[1].validation_status, ValidationStatus::Valid);
    assert_eq!(harness.pending.len(), 1);
}

/// Tenet: malformed ids never produce a record.
#[tokio::test]
async fn malformed_change_id_is_not_persisted() {
    let harness = setup_harness();
    let mut change = create(1, &["Market"], json!({}));
    change.change_id = ChangeId::new_unchecked("CHG-X1");

    let response = harness
        .processor
        .execute_change_plan(&request(plan_of(vec![change])))
        .await;

    assert!(response.success);
    assert!(!response.results[0].persisted);
    assert!(harness.pending.is_empty());
    assert_eq!(harness.alerts.count(AlertKind::InvalidChange), 1);
}

/// Tenet: stale reads are warnings that flag, not block, the change.
#[tokio::test]
async fn stale_current_value_warns() {
    let harness = setup_harness();
    let change = overwrite(1, TOTAL, json!(2_000_000)).with_current_value(json!(1_000_000));

    let response = harness
        .processor
        .execute_change_plan(&request(plan_of(vec![change])))
        .await;

    let result = &response.results[0];
    assert_eq!(result.validation_status, ValidationStatus::Valid);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(harness.alerts.count(AlertKind::ChangeWarnings), 1);
}

/// Tenet: warning alerts can be switched off.
#[tokio::test]
async fn warning_alerts_are_optional() {
    let harness = Harness::new(ProcessorConfig::new().with_alert_on_warnings(false))
        .with_structure(funded_structure());
    let change = overwrite(1, TOTAL, json!(2_000_000)).with_current_value(json!(0));

    let response = harness
        .processor
        .execute_change_plan(&request(plan_of(vec![change])))
        .await;

    assert!(response.results[0].alert_id.is_none());
    assert!(harness.alerts.alerts().is_empty());
}

/// Tenet: later changes validate against earlier ones in the same plan.
#[tokio::test]
async fn later_changes_see_earlier_ones() {
    let harness = setup_harness();
    let plan = plan_of(vec![
        create(1, &["Market"], json!({})),
        create(2, &["Market", "Size"], json!("large")),
        overwrite(3, &["Market", "Size"], json!("very large")),
        create(4, &["Market"], json!({})),
    ]);

    let response = harness.processor.execute_change_plan(&request(plan)).await;

    let statuses: Vec<_> = response.results.iter().map(|r| r.validation_status).collect();
    assert_eq!(
        statuses,
        vec![
            ValidationStatus::Valid,
            ValidationStatus::Valid,
            ValidationStatus::Valid,
            ValidationStatus::Invalid,
        ]
    );
    assert!(response.results[1].warnings.is_empty(), "parent was staged");
}

/// Tenet: structure additions are committed before changes that use them.
#[tokio::test]
async fn structure_additions_precede_changes() {
    let harness = setup_harness();
    let plan = plan_of(vec![overwrite(1, &["Financials", "Runway", "Months"], json!(18))])
        .with_addition(addition(&["Financials", "Runway"], "Months", "number"))
        .with_addition(addition(&["Financials"], "Runway", "section"));

    let response = harness.processor.execute_change_plan(&request(plan)).await;

    let outcomes: Vec<_> = response.structure_additions.iter().map(|r| r.outcome).collect();
    assert_eq!(outcomes, vec![AdditionOutcome::Created, AdditionOutcome::Created]);
    assert_eq!(response.results[0].validation_status, ValidationStatus::Valid);

    let snapshot = harness.structure.snapshot(COMPANY).await.unwrap();
    let months = ssot_test_utils::target(&["Financials", "Runway", "Months"]);
    assert!(snapshot.get(&months).unwrap().definition.is_some());
}

/// Tenet: one rejected structure addition prevents every addition commit.
#[tokio::test]
async fn rejected_addition_blocks_all_additions() {
    let harness = setup_harness();
    let plan = plan_of(vec![overwrite(1, &["Financials", "Runway"], json!("18 months"))])
        .with_addition(addition(&["Financials"], "Runway", "section"))
        .with_addition(addition(&["Legal", "Entities"], "Jurisdiction", "text"));

    let response = harness.processor.execute_change_plan(&request(plan)).await;

    assert!(response.success);
    assert_eq!(response.structure_additions[0].outcome, AdditionOutcome::Skipped);
    assert_eq!(response.structure_additions[1].outcome, AdditionOutcome::Rejected);
    assert_eq!(response.errors.len(), 1);

    let snapshot = harness.structure.snapshot(COMPANY).await.unwrap();
    assert!(!snapshot.contains(&ssot_test_utils::target(&["Financials", "Runway"])));
    assert_eq!(response.results[0].validation_status, ValidationStatus::Invalid);
}

/// Tenet: plan exceptions go to triage and never become records; changes
/// overlapping an exception are skipped.
#[tokio::test]
async fn plan_exceptions_are_triaged() {
    let harness = setup_harness();
    let plan = plan_of(vec![
        overwrite(1, TOTAL, json!(2_000_000)),
        overwrite(2, &["Team", "Founders", "Count"], json!(4)),
    ])
    .with_exception(PlanException {
        change_id: Some(ChangeId::from_sequence(2)),
        disposition: ExceptionDisposition::RequestClarification,
        reason: "sources disagree on founder count".into(),
    })
    .with_exception(PlanException {
        change_id: None,
        disposition: ExceptionDisposition::ProposeContextUpdate,
        reason: "headquarters moved".into(),
    });

    let response = harness.processor.execute_change_plan(&request(plan)).await;

    assert!(response.success);
    assert_eq!(response.changes_processed, 1);
    assert_eq!(response.exceptions_recorded, 2);
    assert!(response.errors[0].contains("CHG-002"));
    assert_eq!(harness.pending.len(), 1);
    assert_eq!(harness.alerts.count(AlertKind::PlanException), 2);
}

/// Tenet: duplicate change ids are processed once.
#[tokio::test]
async fn duplicate_change_id_is_skipped() {
    let harness = setup_harness();
    let plan = plan_of(vec![
        overwrite(1, TOTAL, json!(2_000_000)),
        overwrite(1, TOTAL, json!(3_000_000)),
    ]);

    let response = harness.processor.execute_change_plan(&request(plan)).await;

    assert_eq!(response.changes_processed, 1);
    assert_eq!(response.errors.len(), 1);
    let record = harness.record(response.results[0].pending_change_id.unwrap()).await;
    assert_eq!(record.value_to_write, json!(2_000_000));
}

/// Tenet: out-of-order ids are reported but still processed.
#[tokio::test]
async fn non_monotonic_ids_warn() {
    let harness = setup_harness();
    let plan = plan_of(vec![
        overwrite(5, TOTAL, json!(2_000_000)),
        overwrite(3, &["Team", "Founders", "Count"], json!(4)),
    ]);

    let response = harness.processor.execute_change_plan(&request(plan)).await;

    assert_eq!(response.changes_processed, 2);
    assert_eq!(response.warnings.len(), 1);
    assert!(response.warnings[0].contains("CHG-003"));
}

/// Tenet: an unresolvable company is an unrecoverable failure.
#[tokio::test]
async fn missing_upstream_company_fails_plan() {
    let harness = setup_harness();
    let config = SSOTUpdateConfig::new().with_company_source(TargetCompanySource::UpstreamInput);
    let plan = plan_of(vec![overwrite(1, TOTAL, json!(2_000_000))]);

    let response = harness
        .processor
        .execute_change_plan(&request(plan).with_config(config))
        .await;

    assert!(!response.success);
    assert_eq!(response.changes_processed, 0);
    assert!(harness.pending.is_empty());
}

/// Tenet: the upstream company id is used when configured.
#[tokio::test]
async fn upstream_company_is_used() {
    let harness = Harness::new(ProcessorConfig::new());
    let config = SSOTUpdateConfig::new().with_company_source(TargetCompanySource::UpstreamInput);
    let mut plan = plan_of(vec![create(1, &["Market"], json!({}))]);
    plan.company_id = Some("globex".into());

    let response = harness
        .processor
        .execute_change_plan(&request(plan).with_config(config))
        .await;

    assert!(response.success);
    let record = harness.record(response.results[0].pending_change_id.unwrap()).await;
    assert_eq!(record.company_id, "globex");
}

/// Tenet: a persistence failure on one change leaves the others intact.
#[tokio::test]
async fn persistence_failure_is_isolated() {
    let pending = Arc::new(FlakyPendingStore::failing_on([ChangeId::from_sequence(2)]));
    let structure = Arc::new(FlakyStructureStore::default());
    structure.inner.insert_snapshot(COMPANY, funded_structure());
    let processor = ChangePlanProcessor::new(
        ProcessorConfig::new(),
        structure,
        pending.clone(),
        Arc::new(InMemoryAlertSink::new()),
    );
    let plan = plan_of(vec![
        overwrite(1, TOTAL, json!(2_000_000)),
        overwrite(2, &["Team", "Founders", "Count"], json!(4)),
        append(3, ROUNDS, json!("series-a")),
    ]);

    let response = processor.execute_change_plan(&request(plan)).await;

    assert!(!response.success);
    assert_eq!(response.changes_processed, 2);
    assert!(response.errors[0].starts_with("CHG-002"));
    assert_eq!(pending.inner.len(), 2);
    assert!(response.result_for(&ChangeId::from_sequence(1)).unwrap().persisted);
    assert!(response.result_for(&ChangeId::from_sequence(3)).unwrap().persisted);
}

/// Tenet: an auto-approval that cannot be applied leaves the record pending.
#[tokio::test]
async fn failed_auto_approval_stays_pending() {
    let pending = Arc::new(InMemoryPendingChangeStore::new());
    let structure = Arc::new(FlakyStructureStore::default());
    structure.inner.insert_snapshot(COMPANY, funded_structure());
    structure.set_fail_writes(true);
    let processor = ChangePlanProcessor::new(
        ProcessorConfig::new(),
        structure.clone(),
        pending.clone(),
        Arc::new(InMemoryAlertSink::new()),
    );
    let plan = plan_of(vec![overwrite(1, TOTAL, json!(2_000_000))]);
    let request = request(plan).with_config(auto_l4());

    let response = processor.execute_change_plan(&request).await;

    assert!(!response.success);
    assert!(response.results.is_empty());
    let records = pending.list_for_company(COMPANY).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ReviewStatus::Pending);

    // Retrying once the store recovers approves the same record
    structure.set_fail_writes(false);
    let retry = processor.execute_change_plan(&request).await;
    assert!(retry.success);
    assert_eq!(retry.results[0].pending_change_id, Some(records[0].id));
    assert_eq!(retry.results[0].status, Some(ReviewStatus::Approved));
}

/// Tenet: re-running a plan whose approvals could not be saved commits each
/// change exactly once.
#[tokio::test]
async fn retry_after_failed_approval_save_applies_once() {
    let pending = Arc::new(FlakyPendingStore::default());
    let structure = Arc::new(FlakyStructureStore::default());
    structure.inner.insert_snapshot(COMPANY, funded_structure());
    let processor = ChangePlanProcessor::new(
        ProcessorConfig::new(),
        structure.clone(),
        pending.clone(),
        Arc::new(InMemoryAlertSink::new()),
    );
    let eur = &["Financials", "Funding", "Total", "EUR"];
    let plan = plan_of(vec![
        append(1, LEAD, json!("Beta Capital")),
        create(2, eur, json!(1_380_000)),
    ]);
    let request = request(plan).with_config(auto_l4());

    pending.set_fail_approvals(true);
    let first = processor.execute_change_plan(&request).await;

    assert!(!first.success);
    assert_eq!(first.errors.len(), 2);
    let records = pending.list_for_company(COMPANY).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.status == ReviewStatus::Pending));

    pending.set_fail_approvals(false);
    let retry = processor.execute_change_plan(&request).await;

    assert!(retry.success, "{:?}", retry.errors);
    for result in &retry.results {
        assert_eq!(result.validation_status, ValidationStatus::Valid);
        assert_eq!(result.status, Some(ReviewStatus::Approved));
        assert!(result.auto_approved);
        assert!(records.iter().any(|r| Some(r.id) == result.pending_change_id));
    }
    assert_eq!(
        structure.inner.read_value(COMPANY, &target(LEAD)).await.unwrap(),
        Some(json!(["Acme Ventures", "Beta Capital"]))
    );
    assert_eq!(
        structure.inner.read_value(COMPANY, &target(eur)).await.unwrap(),
        Some(json!(1_380_000))
    );

    let replay = processor.execute_change_plan(&request).await;
    assert!(replay.results.iter().all(|r| r.replayed));
    assert_eq!(
        structure.inner.read_value(COMPANY, &target(LEAD)).await.unwrap(),
        Some(json!(["Acme Ventures", "Beta Capital"]))
    );
}

/// Tenet: a structure snapshot failure stops the plan before any record.
#[tokio::test]
async fn snapshot_failure_fails_plan() {
    let pending = Arc::new(InMemoryPendingChangeStore::new());
    let structure = Arc::new(FlakyStructureStore::default());
    structure.set_fail_snapshot(true);
    let processor = ChangePlanProcessor::new(
        ProcessorConfig::new(),
        structure,
        pending.clone(),
        Arc::new(InMemoryAlertSink::new()),
    );

    let plan = plan_of(vec![create(1, &["Market"], json!({}))]);
    let response = processor.execute_change_plan(&request(plan)).await;

    assert!(!response.success);
    assert!(pending.is_empty());
}

/// Tenet: alert delivery failures never fail a plan.
#[tokio::test]
async fn alert_failures_are_not_fatal() {
    let structure = Arc::new(FlakyStructureStore::default());
    structure.inner.insert_snapshot(COMPANY, funded_structure());
    let pending = Arc::new(InMemoryPendingChangeStore::new());
    let processor = ChangePlanProcessor::new(
        ProcessorConfig::new(),
        structure,
        pending.clone(),
        Arc::new(FailingAlertSink),
    );
    let plan = plan_of(vec![create(1, &["Financials"], json!({}))]).with_exception(PlanException {
        change_id: None,
        disposition: ExceptionDisposition::ReturnToConsensus,
        reason: "conflicting sources".into(),
    });

    let response = processor.execute_change_plan(&request(plan)).await;

    assert!(response.success);
    assert_eq!(response.results[0].validation_status, ValidationStatus::Invalid);
    assert!(response.results[0].persisted);
    assert_eq!(response.exceptions_recorded, 0);
    assert_eq!(response.warnings.len(), 1);
}

/// Tenet: separate execution runs keep separate records.
#[tokio::test]
async fn runs_are_scoped_separately() {
    let harness = setup_harness();
    let plan = plan_of(vec![overwrite(1, TOTAL, json!(2_000_000))]);

    harness.processor.execute_change_plan(&request(plan.clone())).await;
    harness
        .processor
        .execute_change_plan(&request(plan).with_run("run-2"))
        .await;

    assert_eq!(harness.pending.len(), 2);
}

/// Tenet: a dry run reports outcomes without touching any store.
#[tokio::test]
async fn preview_persists_nothing() {
    let harness = setup_harness();
    let plan = plan_of(vec![
        append(1, ROUNDS, json!("series-a")),
        create(2, &["Financials"], json!({})),
    ]);

    let response = harness
        .processor
        .preview_plan(&request(plan), funded_structure());

    assert!(response.success);
    assert_eq!(response.results[0].validation_status, ValidationStatus::Valid);
    assert_eq!(response.results[1].validation_status, ValidationStatus::Invalid);
    assert!(response.results.iter().all(|r| !r.persisted));
    assert!(harness.pending.is_empty());
    assert!(harness.alerts.alerts().is_empty());
}

#[tokio::test]
async fn empty_plan_is_a_no_op() {
    let harness = setup_harness();
    let response = harness
        .processor
        .execute_change_plan(&request(SSOTChangePlan::new()))
        .await;
    assert!(response.success);
    assert_eq!(response.changes_processed, 0);
    assert!(harness.pending.is_empty());
}
