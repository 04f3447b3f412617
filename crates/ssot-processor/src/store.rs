//! Pending-change persistence
//!
//! Records are keyed by [`PendingChangeKey`] so a re-run of the same
//! execution updates its records instead of duplicating them.

use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use ssot_model::{PendingChangeId, PendingChangeKey, ReviewStatus, SSOTPendingChange};
use std::fmt;

/// Durable store of pending changes
#[async_trait]
pub trait PendingChangeStore: Send + Sync + fmt::Debug {
    /// Record for an idempotency key
    async fn get(&self, key: &PendingChangeKey) -> Result<Option<SSOTPendingChange>, StoreError>;

    /// Record by id
    async fn get_by_id(&self, id: PendingChangeId)
        -> Result<Option<SSOTPendingChange>, StoreError>;

    /// Insert or replace the record for `record.key()`
    ///
    /// A replaced record keeps its id and creation time. Returns the record
    /// as stored.
    async fn upsert(&self, record: SSOTPendingChange) -> Result<SSOTPendingChange, StoreError>;

    /// All records of a company
    async fn list_for_company(&self, company_id: &str)
        -> Result<Vec<SSOTPendingChange>, StoreError>;
}

/// In-memory pending-change store
#[derive(Debug, Default)]
pub struct InMemoryPendingChangeStore {
    records: DashMap<PendingChangeKey, SSOTPendingChange>,
}

impl InMemoryPendingChangeStore {
    /// Create empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records still awaiting review
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == ReviewStatus::Pending)
            .count()
    }
}

#[async_trait]
impl PendingChangeStore for InMemoryPendingChangeStore {
    async fn get(&self, key: &PendingChangeKey) -> Result<Option<SSOTPendingChange>, StoreError> {
        Ok(self.records.get(key).map(|r| r.clone()))
    }

    async fn get_by_id(
        &self,
        id: PendingChangeId,
    ) -> Result<Option<SSOTPendingChange>, StoreError> {
        Ok(self
            .records
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.value().clone()))
    }

    async fn upsert(&self, record: SSOTPendingChange) -> Result<SSOTPendingChange, StoreError> {
        let key = record.key();
        let mut slot = self.records.entry(key).or_insert_with(|| record.clone());
        let stored = record.with_identity(&slot);
        *slot = stored.clone();
        Ok(stored)
    }

    async fn list_for_company(
        &self,
        company_id: &str,
    ) -> Result<Vec<SSOTPendingChange>, StoreError> {
        let mut out: Vec<_> = self
            .records
            .iter()
            .filter(|r| r.company_id == company_id)
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.change_id.cmp(&b.change_id))
        });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ssot_model::{
        ChangeAction, ChangeId, DataType, PendingChangeScope, Provenance, RawTargetPath,
        SSOTChange, TargetLevel, ValidationResult,
    };

    fn record(scope: &PendingChangeScope, seq: u32) -> SSOTPendingChange {
        let change = SSOTChange::new(
            ChangeId::from_sequence(seq),
            RawTargetPath::domain("Financials"),
            TargetLevel::L1C,
            ChangeAction::CreateField,
            DataType::AttributeFact,
            json!({}),
            Provenance::new("analyst"),
        );
        let path = change.resolve_path().unwrap();
        SSOTPendingChange::from_change(&change, path, scope, &ValidationResult::new(), None)
    }

    #[tokio::test]
    async fn upsert_keeps_identity() {
        let store = InMemoryPendingChangeStore::new();
        let scope = PendingChangeScope::company("acme");

        let first = store.upsert(record(&scope, 1)).await.unwrap();
        let mut again = record(&scope, 1);
        again.notes = Some("second run".into());
        let second = store.upsert(again).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.notes.as_deref(), Some("second run"));
    }

    #[tokio::test]
    async fn keys_are_scoped_by_run() {
        let store = InMemoryPendingChangeStore::new();
        let mut run_a = PendingChangeScope::company("acme");
        run_a.execution_run_id = Some("run-a".into());
        let mut run_b = run_a.clone();
        run_b.execution_run_id = Some("run-b".into());

        store.upsert(record(&run_a, 1)).await.unwrap();
        store.upsert(record(&run_b, 1)).await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.get(&run_a.key(&ChangeId::from_sequence(1))).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_filters_company() {
        let store = InMemoryPendingChangeStore::new();
        let acme = PendingChangeScope::company("acme");
        let other = PendingChangeScope::company("other");

        store.upsert(record(&acme, 1)).await.unwrap();
        store.upsert(record(&acme, 2)).await.unwrap();
        let foreign = store.upsert(record(&other, 1)).await.unwrap();

        let listed = store.list_for_company("acme").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|r| r.company_id == "acme"));

        let found = store.get_by_id(foreign.id).await.unwrap().unwrap();
        assert_eq!(found.company_id, "other");
        assert_eq!(store.pending_count(), 3);
    }
}
