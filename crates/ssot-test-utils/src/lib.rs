//! Testing utilities for SSOT workspace
//!
//! Shared test helpers, fixtures, and failing collaborators.

#![allow(missing_docs)]

use async_trait::async_trait;
use serde_json::{json, Value};
use ssot_model::{
    ChangeAction, ChangeId, DataType, ExecuteSSOTChangesRequest, FieldDefinition,
    PendingChangeId, PendingChangeKey, Provenance, RawTargetPath, ReviewStatus, SSOTChange,
    SSOTChangePlan, SSOTPendingChange, StructureAddition, TargetLevel, TargetPath,
};
use ssot_processor::{
    Alert, AlertError, AlertSink, ChangePlanProcessor, InMemoryAlertSink,
    InMemoryPendingChangeStore, InMemoryStructureStore, PendingChangeStore, ProcessorConfig,
    ReviewService, StoreError, StructureSnapshot, StructureStore,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const COMPANY: &str = "acme";
pub const WORKFLOW: &str = "wf-onboarding";
pub const NODE: &str = "node-ssot";
pub const RUN: &str = "run-1";

pub fn raw_path(segments: &[&str]) -> RawTargetPath {
    let mut it = segments.iter();
    let mut raw = RawTargetPath::domain(it.next().copied().unwrap_or_default());
    raw.l2 = it.next().map(|s| (*s).to_string());
    raw.l3 = it.next().map(|s| (*s).to_string());
    raw.l4 = it.next().map(|s| (*s).to_string());
    raw
}

pub fn target(segments: &[&str]) -> TargetPath {
    TargetPath::from_segments(segments.iter().map(|s| (*s).to_string()).collect()).unwrap()
}

/// Change whose level matches the number of segments
pub fn change(seq: u32, segments: &[&str], action: ChangeAction, value: Value) -> SSOTChange {
    let level = TargetLevel::from_depth(segments.len()).unwrap_or(TargetLevel::L1C);
    SSOTChange::new(
        ChangeId::from_sequence(seq),
        raw_path(segments),
        level,
        action,
        DataType::AttributeFact,
        value,
        Provenance::new("research-agent"),
    )
}

pub fn create(seq: u32, segments: &[&str], value: Value) -> SSOTChange {
    change(seq, segments, ChangeAction::CreateField, value)
}

pub fn overwrite(seq: u32, segments: &[&str], value: Value) -> SSOTChange {
    change(seq, segments, ChangeAction::Overwrite, value)
}

pub fn append(seq: u32, segments: &[&str], value: Value) -> SSOTChange {
    change(seq, segments, ChangeAction::Append, value)
}

pub fn addition(parent: &[&str], key: &str, field_type: &str) -> StructureAddition {
    let level = TargetLevel::from_depth(parent.len() + 1).unwrap_or(TargetLevel::L2);
    StructureAddition::new(raw_path(parent), level, key, key, field_type)
}

pub fn request(plan: SSOTChangePlan) -> ExecuteSSOTChangesRequest {
    ExecuteSSOTChangesRequest::new(COMPANY, WORKFLOW, NODE, plan).with_run(RUN)
}

pub fn plan_of(changes: Vec<SSOTChange>) -> SSOTChangePlan {
    changes
        .into_iter()
        .fold(SSOTChangePlan::new(), SSOTChangePlan::with_change)
}

/// Financials / Funding (rounds, lead investors, total) and Team / Founders
pub fn funded_structure() -> StructureSnapshot {
    StructureSnapshot::new(COMPANY)
        .with_field(
            target(&["Financials"]),
            FieldDefinition::new("Financials", "section"),
        )
        .with_field(
            target(&["Financials", "Funding"]),
            FieldDefinition::new("Funding", "section"),
        )
        .with_value(target(&["Financials", "Funding", "Rounds"]), json!(["seed"]))
        .with_value(
            target(&["Financials", "Funding", "Rounds", "Lead Investors"]),
            json!(["Acme Ventures"]),
        )
        .with_value(
            target(&["Financials", "Funding", "Total", "USD"]),
            json!(1_500_000),
        )
        .with_value(target(&["Team", "Founders", "Count"]), json!(2))
}

/// Processor wired to in-memory collaborators the test can inspect
#[derive(Debug, Clone)]
pub struct Harness {
    pub processor: ChangePlanProcessor,
    pub structure: Arc<InMemoryStructureStore>,
    pub pending: Arc<InMemoryPendingChangeStore>,
    pub alerts: Arc<InMemoryAlertSink>,
}

impl Harness {
    pub fn new(config: ProcessorConfig) -> Self {
        let structure = Arc::new(InMemoryStructureStore::new());
        let pending = Arc::new(InMemoryPendingChangeStore::new());
        let alerts = Arc::new(InMemoryAlertSink::new());
        let processor = ChangePlanProcessor::new(
            config,
            structure.clone(),
            pending.clone(),
            alerts.clone(),
        );
        Self {
            processor,
            structure,
            pending,
            alerts,
        }
    }

    pub fn with_structure(self, snapshot: StructureSnapshot) -> Self {
        self.structure.insert_snapshot(COMPANY, snapshot);
        self
    }

    pub fn review(&self) -> ReviewService {
        ReviewService::new(self.pending.clone(), self.structure.clone())
    }

    pub async fn value(&self, segments: &[&str]) -> Option<Value> {
        self.structure
            .read_value(COMPANY, &target(segments))
            .await
            .unwrap()
    }

    pub async fn record(&self, id: PendingChangeId) -> SSOTPendingChange {
        self.pending.get_by_id(id).await.unwrap().unwrap()
    }
}

pub fn setup_harness() -> Harness {
    Harness::new(ProcessorConfig::new()).with_structure(funded_structure())
}

/// Pending store whose upserts fail for selected changes, or for every
/// approved record while `fail_approvals` is set
#[derive(Debug, Default)]
pub struct FlakyPendingStore {
    pub inner: InMemoryPendingChangeStore,
    pub fail_on: HashSet<ChangeId>,
    pub fail_approvals: AtomicBool,
}

impl FlakyPendingStore {
    pub fn failing_on(ids: impl IntoIterator<Item = ChangeId>) -> Self {
        Self {
            fail_on: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn set_fail_approvals(&self, fail: bool) {
        self.fail_approvals.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PendingChangeStore for FlakyPendingStore {
    async fn get(&self, key: &PendingChangeKey) -> Result<Option<SSOTPendingChange>, StoreError> {
        self.inner.get(key).await
    }

    async fn get_by_id(
        &self,
        id: PendingChangeId,
    ) -> Result<Option<SSOTPendingChange>, StoreError> {
        self.inner.get_by_id(id).await
    }

    async fn upsert(&self, record: SSOTPendingChange) -> Result<SSOTPendingChange, StoreError> {
        if self.fail_on.contains(&record.change_id) {
            return Err(StoreError::Unavailable(format!(
                "write of {} timed out",
                record.change_id
            )));
        }
        if record.status == ReviewStatus::Approved && self.fail_approvals.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "approval of {} timed out",
                record.change_id
            )));
        }
        self.inner.upsert(record).await
    }

    async fn list_for_company(
        &self,
        company_id: &str,
    ) -> Result<Vec<SSOTPendingChange>, StoreError> {
        self.inner.list_for_company(company_id).await
    }
}

/// Structure store whose value writes can be switched off
#[derive(Debug, Default)]
pub struct FlakyStructureStore {
    pub inner: InMemoryStructureStore,
    pub fail_writes: AtomicBool,
    pub fail_snapshot: AtomicBool,
}

impl FlakyStructureStore {
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_snapshot(&self, fail: bool) {
        self.fail_snapshot.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StructureStore for FlakyStructureStore {
    async fn snapshot(&self, company_id: &str) -> Result<StructureSnapshot, StoreError> {
        if self.fail_snapshot.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("structure backend down".into()));
        }
        self.inner.snapshot(company_id).await
    }

    async fn read_value(
        &self,
        company_id: &str,
        path: &TargetPath,
    ) -> Result<Option<Value>, StoreError> {
        self.inner.read_value(company_id, path).await
    }

    async fn create_field(
        &self,
        company_id: &str,
        path: &TargetPath,
        definition: &FieldDefinition,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("structure backend read-only".into()));
        }
        self.inner.create_field(company_id, path, definition).await
    }

    async fn write_value(
        &self,
        company_id: &str,
        path: &TargetPath,
        value: Value,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("structure backend read-only".into()));
        }
        self.inner.write_value(company_id, path, value).await
    }

    async fn apply(
        &self,
        company_id: &str,
        change: PendingChangeId,
        path: &TargetPath,
        action: ChangeAction,
        value: &Value,
    ) -> Result<Value, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("structure backend read-only".into()));
        }
        self.inner.apply(company_id, change, path, action, value).await
    }
}

/// Sink that drops every alert
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingAlertSink;

#[async_trait]
impl AlertSink for FailingAlertSink {
    async fn notify(&self, alert: Alert) -> Result<(), AlertError> {
        Err(AlertError::DeliveryFailed(format!("alert {} dropped", alert.id)))
    }
}
