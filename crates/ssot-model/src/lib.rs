//! SSOT Model - Change plans and pending changes
//!
//! Typed records for the SSOT change pipeline:
//! - Hierarchical L1–L4 addresses resolved into per-level variants
//! - Proposed changes, structure additions and plan exceptions
//! - Pending-change records and their review lifecycle
//! - Update policy and request/response contracts
//!
//! # Example
//!
//! ```rust
//! use ssot_model::{RawTargetPath, TargetLevel, TargetPath};
//!
//! let raw = RawTargetPath::domain("Financials").with_l2("Funding");
//! let path = TargetPath::resolve(&raw, TargetLevel::L2).unwrap();
//! assert_eq!(path.leaf_key(), "Funding");
//! assert!(TargetPath::resolve(&raw, TargetLevel::L3).is_err());
//! ```

#![warn(unreachable_pub)]

pub mod api;
pub mod change;
pub mod config;
pub mod ids;
pub mod lifecycle;
pub mod path;
pub mod pending;
pub mod plan;
pub mod validation;

pub use api::{
    AdditionOutcome, ExecuteSSOTChangesRequest, ExecuteSSOTChangesResponse, ProcessChangeResult,
    StructureAdditionResult,
};
pub use change::{ChangeAction, DataType, Provenance, SSOTChange};
pub use config::{SSOTUpdateConfig, TargetCompanySource};
pub use ids::{AlertId, ChangeId, ChangeIdError, PendingChangeId};
pub use lifecycle::TransitionError;
pub use path::{PathError, RawTargetPath, TargetLevel, TargetPath};
pub use pending::{
    PendingChangeKey, PendingChangeScope, ReviewStatus, SSOTPendingChange, ValidationStatus,
};
pub use plan::{
    AdditionError, ExceptionDisposition, FieldDefinition, PartitionViolation, PlanException,
    SSOTChangePlan, StructureAddition,
};
pub use validation::{ErrorClass, ValidationIssue, ValidationResult};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
