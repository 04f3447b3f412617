//! Proposed mutations
//!
//! An [`SSOTChange`] is one field-level write proposed by an upstream agent.

use crate::ids::ChangeId;
use crate::path::{PathError, RawTargetPath, TargetLevel, TargetPath};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Kind of write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Replace the value of an existing field
    Overwrite,
    /// Add to the value of an existing field
    Append,
    /// Create a field that does not exist yet
    CreateField,
}

impl ChangeAction {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ChangeAction::Overwrite => "overwrite",
            ChangeAction::Append => "append",
            ChangeAction::CreateField => "create_field",
        }
    }

    /// Whether the target must already exist
    #[inline]
    #[must_use]
    pub fn requires_existing_target(&self) -> bool {
        !matches!(self, ChangeAction::CreateField)
    }
}

impl Display for ChangeAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic kind of the written value
///
/// Unknown names are kept as [`DataType::Other`] so new upstream vocabulary
/// still parses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    /// Single factual attribute ("founded 2019")
    AttributeFact,
    /// Numeric measurement
    Metric,
    /// Free-form prose
    Narrative,
    /// List of items
    List,
    /// Evaluated score
    Score,
    /// Pointer to an external document or record
    Reference,
    /// Anything else
    Other(String),
}

impl DataType {
    /// Wire name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            DataType::AttributeFact => "attribute_fact",
            DataType::Metric => "metric",
            DataType::Narrative => "narrative",
            DataType::List => "list",
            DataType::Score => "score",
            DataType::Reference => "reference",
            DataType::Other(name) => name,
        }
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "attribute_fact" => DataType::AttributeFact,
            "metric" => DataType::Metric,
            "narrative" => DataType::Narrative,
            "list" => DataType::List,
            "score" => DataType::Score,
            "reference" => DataType::Reference,
            _ => DataType::Other(value),
        }
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        match value {
            DataType::Other(name) => name,
            known => known.name().to_string(),
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a proposed value came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Source identifier (document, URL, agent name)
    pub source: String,
    /// When the source was observed
    pub timestamp: DateTime<Utc>,
    /// Optional author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Provenance {
    /// Create provenance stamped now
    #[inline]
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timestamp: Utc::now(),
            author: None,
        }
    }

    /// With author
    #[inline]
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// With explicit timestamp
    #[inline]
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// One proposed mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SSOTChange {
    /// Plan-scoped identifier
    pub change_id: ChangeId,
    /// Address being written
    pub target_path: RawTargetPath,
    /// Declared depth of `target_path`
    pub target_level: TargetLevel,
    /// Kind of write
    pub action: ChangeAction,
    /// Semantic kind of the value
    pub data_type: DataType,
    /// Whether the field is scored
    #[serde(default)]
    pub is_scored: bool,
    /// Required when `is_scored`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_method: Option<String>,
    /// Value to write
    pub value_to_write: Value,
    /// Value the proposer believes is live (stale-read detection)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Value>,
    /// Origin of the value
    pub provenance: Provenance,
    /// Free-text notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Textual guards evaluated before acceptance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<String>,
}

impl SSOTChange {
    /// Create an unscored change
    #[must_use]
    pub fn new(
        change_id: ChangeId,
        target_path: RawTargetPath,
        target_level: TargetLevel,
        action: ChangeAction,
        data_type: DataType,
        value_to_write: Value,
        provenance: Provenance,
    ) -> Self {
        Self {
            change_id,
            target_path,
            target_level,
            action,
            data_type,
            is_scored: false,
            evaluation_method: None,
            value_to_write,
            current_value: None,
            provenance,
            notes: None,
            preconditions: Vec::new(),
        }
    }

    /// Mark as scored with an evaluation method
    #[inline]
    #[must_use]
    pub fn scored(mut self, evaluation_method: impl Into<String>) -> Self {
        self.is_scored = true;
        self.evaluation_method = Some(evaluation_method.into());
        self
    }

    /// With the value the proposer read
    #[inline]
    #[must_use]
    pub fn with_current_value(mut self, value: Value) -> Self {
        self.current_value = Some(value);
        self
    }

    /// With notes
    #[inline]
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// With preconditions
    #[inline]
    #[must_use]
    pub fn with_preconditions(mut self, preconditions: Vec<String>) -> Self {
        self.preconditions = preconditions;
        self
    }

    /// Resolve `target_path` against `target_level`
    pub fn resolve_path(&self) -> Result<TargetPath, PathError> {
        TargetPath::resolve(&self.target_path, self.target_level)
    }
}
