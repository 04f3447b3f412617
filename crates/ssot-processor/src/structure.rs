//! Company structure: the hierarchical record changes are applied to
//!
//! - [`StructureSnapshot`]: point-in-time copy used for validation and staging
//! - [`apply_action`]: how overwrite / append / create produce the new value
//! - [`StructureStore`]: the live record behind an async seam
//! - [`InMemoryStructureStore`]: DashMap-backed store for tests and the CLI

use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ssot_model::{ChangeAction, FieldDefinition, PendingChangeId, TargetPath};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Compute the value a target holds after an action
///
/// - `overwrite` / `create_field`: the written value
/// - `append` onto nothing: the written value
/// - `append` onto an array: extended by an array, pushed otherwise
/// - `append` text onto text: joined with a newline
/// - any other `append`: a two-element array `[current, value]`
#[must_use]
pub fn apply_action(current: Option<&Value>, action: ChangeAction, value: &Value) -> Value {
    match action {
        ChangeAction::Overwrite | ChangeAction::CreateField => value.clone(),
        ChangeAction::Append => match current {
            None | Some(Value::Null) => value.clone(),
            Some(Value::Array(items)) => {
                let mut items = items.clone();
                match value {
                    Value::Array(more) => items.extend(more.iter().cloned()),
                    other => items.push(other.clone()),
                }
                Value::Array(items)
            }
            Some(Value::String(text)) => match value {
                Value::String(more) => Value::String(format!("{text}\n{more}")),
                other => Value::Array(vec![Value::String(text.clone()), other.clone()]),
            },
            Some(other) => Value::Array(vec![other.clone(), value.clone()]),
        },
    }
}

/// One node of the structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureEntry {
    /// Declared definition (none for nodes created implicitly)
    pub definition: Option<FieldDefinition>,
    /// Current value
    pub value: Option<Value>,
}

/// Point-in-time copy of one company's structure
///
/// Every node's ancestors are present, so existence is a key lookup.
/// Approved changes already committed are tracked by record id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotDocument", into = "SnapshotDocument")]
pub struct StructureSnapshot {
    company_id: String,
    entries: BTreeMap<TargetPath, StructureEntry>,
    applied: BTreeSet<PendingChangeId>,
}

impl StructureSnapshot {
    /// Create empty snapshot
    #[must_use]
    pub fn new(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            entries: BTreeMap::new(),
            applied: BTreeSet::new(),
        }
    }

    /// Owning company
    #[inline]
    #[must_use]
    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    /// Re-own the snapshot
    #[inline]
    #[must_use]
    pub fn with_company(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = company_id.into();
        self
    }

    /// With a declared field
    #[must_use]
    pub fn with_field(mut self, path: TargetPath, definition: FieldDefinition) -> Self {
        self.define(path, definition);
        self
    }

    /// With a value at a path
    #[must_use]
    pub fn with_value(mut self, path: TargetPath, value: Value) -> Self {
        self.set_value(path, value);
        self
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a node exists at a path
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &TargetPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Node at a path
    #[must_use]
    pub fn get(&self, path: &TargetPath) -> Option<&StructureEntry> {
        self.entries.get(path)
    }

    /// Value at a path
    #[must_use]
    pub fn value(&self, path: &TargetPath) -> Option<&Value> {
        self.entries.get(path).and_then(|e| e.value.as_ref())
    }

    /// All nodes in path order
    pub fn fields(&self) -> impl Iterator<Item = (&TargetPath, &StructureEntry)> {
        self.entries.iter()
    }

    /// Declare a field, creating missing ancestors
    ///
    /// An existing value is kept.
    pub fn define(&mut self, path: TargetPath, definition: FieldDefinition) {
        self.ensure_ancestors(&path);
        self.entries.entry(path).or_default().definition = Some(definition);
    }

    /// Replace the value at a path, creating missing nodes
    pub fn set_value(&mut self, path: TargetPath, value: Value) {
        self.ensure_ancestors(&path);
        self.entries.entry(path).or_default().value = Some(value);
    }

    /// Value the path would hold after an action, without changing anything
    #[must_use]
    pub fn preview(&self, path: &TargetPath, action: ChangeAction, value: &Value) -> Value {
        apply_action(self.value(path), action, value)
    }

    /// Apply an action in place and return the new value
    pub fn stage(&mut self, path: &TargetPath, action: ChangeAction, value: &Value) -> Value {
        let next = self.preview(path, action, value);
        self.set_value(path.clone(), next.clone());
        next
    }

    /// Check if the change recorded under `change` was already committed
    #[inline]
    #[must_use]
    pub fn is_applied(&self, change: PendingChangeId) -> bool {
        self.applied.contains(&change)
    }

    /// Apply an approved change once
    ///
    /// Committing the same record again leaves the tree untouched and
    /// returns the current value.
    pub fn commit(
        &mut self,
        change: PendingChangeId,
        path: &TargetPath,
        action: ChangeAction,
        value: &Value,
    ) -> Value {
        if self.applied.insert(change) {
            self.stage(path, action, value)
        } else {
            self.value(path).cloned().unwrap_or(Value::Null)
        }
    }

    fn ensure_ancestors(&mut self, path: &TargetPath) {
        for ancestor in path.ancestors() {
            self.entries.entry(ancestor).or_default();
        }
    }
}

/// File form of a snapshot: a flat list of nodes addressed by segments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    company_id: String,
    #[serde(default)]
    fields: Vec<SnapshotField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    applied: Vec<PendingChangeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotField {
    path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    definition: Option<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

impl TryFrom<SnapshotDocument> for StructureSnapshot {
    type Error = String;

    fn try_from(doc: SnapshotDocument) -> Result<Self, Self::Error> {
        let mut snapshot = Self::new(doc.company_id);
        snapshot.applied.extend(doc.applied);
        for field in doc.fields {
            if field.path.iter().any(|s| s.trim().is_empty()) {
                return Err(format!("blank segment in path {:?}", field.path));
            }
            let shown = field.path.join(" / ");
            let path = TargetPath::from_segments(field.path)
                .ok_or_else(|| format!("path must have 1 to 4 segments: {shown}"))?;
            snapshot.ensure_ancestors(&path);
            let entry = snapshot.entries.entry(path).or_default();
            if field.definition.is_some() {
                entry.definition = field.definition;
            }
            if field.value.is_some() {
                entry.value = field.value;
            }
        }
        Ok(snapshot)
    }
}

impl From<StructureSnapshot> for SnapshotDocument {
    fn from(snapshot: StructureSnapshot) -> Self {
        let fields = snapshot
            .entries
            .into_iter()
            .map(|(path, entry)| SnapshotField {
                path: path.segments().into_iter().map(str::to_string).collect(),
                definition: entry.definition,
                value: entry.value,
            })
            .collect();
        Self {
            company_id: snapshot.company_id,
            fields,
            applied: snapshot.applied.into_iter().collect(),
        }
    }
}

/// Live company structure
#[async_trait]
pub trait StructureStore: Send + Sync + fmt::Debug {
    /// Point-in-time copy of a company's structure
    async fn snapshot(&self, company_id: &str) -> Result<StructureSnapshot, StoreError>;

    /// Current value at a path
    async fn read_value(
        &self,
        company_id: &str,
        path: &TargetPath,
    ) -> Result<Option<Value>, StoreError>;

    /// Declare a field
    ///
    /// Declaring an identical field again is a no-op; a differing
    /// definition is a [`StoreError::Conflict`].
    async fn create_field(
        &self,
        company_id: &str,
        path: &TargetPath,
        definition: &FieldDefinition,
    ) -> Result<(), StoreError>;

    /// Replace the value at a path, creating missing nodes
    async fn write_value(
        &self,
        company_id: &str,
        path: &TargetPath,
        value: Value,
    ) -> Result<(), StoreError>;

    /// Apply an approved change against the live value and return the new
    /// value
    ///
    /// Keyed by the pending-change record: applying the same record again
    /// must not change the structure. The write and the applied marker land
    /// together.
    async fn apply(
        &self,
        company_id: &str,
        change: PendingChangeId,
        path: &TargetPath,
        action: ChangeAction,
        value: &Value,
    ) -> Result<Value, StoreError>;
}

/// In-memory structure store
#[derive(Debug, Default)]
pub struct InMemoryStructureStore {
    companies: DashMap<String, StructureSnapshot>,
}

impl InMemoryStructureStore {
    /// Create empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a company's structure, re-owned by `company_id`
    pub fn insert_snapshot(&self, company_id: impl Into<String>, snapshot: StructureSnapshot) {
        let company_id = company_id.into();
        self.companies
            .insert(company_id.clone(), snapshot.with_company(company_id));
    }
}

#[async_trait]
impl StructureStore for InMemoryStructureStore {
    async fn snapshot(&self, company_id: &str) -> Result<StructureSnapshot, StoreError> {
        Ok(self
            .companies
            .get(company_id)
            .map_or_else(|| StructureSnapshot::new(company_id), |s| s.value().clone()))
    }

    async fn read_value(
        &self,
        company_id: &str,
        path: &TargetPath,
    ) -> Result<Option<Value>, StoreError> {
        Ok(self
            .companies
            .get(company_id)
            .and_then(|s| StructureSnapshot::value(&s, path).cloned()))
    }

    async fn create_field(
        &self,
        company_id: &str,
        path: &TargetPath,
        definition: &FieldDefinition,
    ) -> Result<(), StoreError> {
        let mut snapshot = self
            .companies
            .entry(company_id.to_string())
            .or_insert_with(|| StructureSnapshot::new(company_id));

        if let Some(existing) = snapshot.get(path).and_then(|e| e.definition.as_ref()) {
            if existing == definition {
                return Ok(());
            }
            return Err(StoreError::Conflict {
                path: path.to_string(),
                reason: "field already declared with a different definition".to_string(),
            });
        }

        snapshot.define(path.clone(), definition.clone());
        Ok(())
    }

    async fn write_value(
        &self,
        company_id: &str,
        path: &TargetPath,
        value: Value,
    ) -> Result<(), StoreError> {
        self.companies
            .entry(company_id.to_string())
            .or_insert_with(|| StructureSnapshot::new(company_id))
            .set_value(path.clone(), value);
        Ok(())
    }

    async fn apply(
        &self,
        company_id: &str,
        change: PendingChangeId,
        path: &TargetPath,
        action: ChangeAction,
        value: &Value,
    ) -> Result<Value, StoreError> {
        // Read, write and mark under one shard lock
        Ok(self
            .companies
            .entry(company_id.to_string())
            .or_insert_with(|| StructureSnapshot::new(company_id))
            .commit(change, path, action, value))
    }
}
