//! SSOT Processor - Change Plan Processor
//!
//! Validates and records proposed changes to a company's hierarchical record:
//! - Validates each change against policy and the live structure
//! - Stages structure additions before any change
//! - Persists one reviewable pending change per accepted change
//! - Auto-approves L4 changes when the policy allows
//! - Routes invalid changes, warnings and plan exceptions to operators
//!
//! # Example
//!
//! ```rust,ignore
//! use ssot_processor::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(request: ExecuteSSOTChangesRequest) {
//! let processor = ChangePlanProcessor::new(
//!     ProcessorConfig::new(),
//!     Arc::new(InMemoryStructureStore::new()),
//!     Arc::new(InMemoryPendingChangeStore::new()),
//!     Arc::new(TracingAlertSink),
//! );
//!
//! let response = processor.execute_change_plan(&request).await;
//! println!("Processed {} changes", response.changes_processed);
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod additions;
pub mod alert;
pub mod config;
pub mod error;
pub mod processor;
pub mod review;
pub mod store;
pub mod structure;
pub mod validator;

// Re-exports for convenience
pub use additions::{stage_additions, PrePass};
pub use alert::{Alert, AlertKind, AlertSeverity, AlertSink, InMemoryAlertSink, TracingAlertSink};
pub use config::ProcessorConfig;
pub use error::{AlertError, ProcessorError, ReviewError, StoreError};
pub use processor::{ChangePlanProcessor, PlanContext};
pub use review::ReviewService;
pub use store::{InMemoryPendingChangeStore, PendingChangeStore};
pub use structure::{
    apply_action, InMemoryStructureStore, StructureEntry, StructureSnapshot, StructureStore,
};
pub use validator::{validate_change, ChangeValidator};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the processor
    pub use crate::{
        ChangePlanProcessor, InMemoryAlertSink, InMemoryPendingChangeStore,
        InMemoryStructureStore, ProcessorConfig, ReviewService, StructureSnapshot,
        TracingAlertSink,
    };
    pub use ssot_model::{
        ExecuteSSOTChangesRequest, ExecuteSSOTChangesResponse, SSOTChange, SSOTChangePlan,
        SSOTUpdateConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
