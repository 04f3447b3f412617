//! Per-invocation update policy

use crate::change::ChangeAction;
use crate::path::TargetLevel;
use serde::{Deserialize, Serialize};

/// Where the owning company is taken from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCompanySource {
    /// `company_id` of the request
    #[default]
    Request,
    /// `company_id` carried by the upstream plan
    UpstreamInput,
}

/// Update policy for one plan execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SSOTUpdateConfig {
    /// Company resolution
    pub target_company_source: TargetCompanySource,
    /// Skip human review for valid L4 changes
    pub auto_approve_l4: bool,
    /// Force review of `create_field` even when otherwise auto-approvable
    pub require_approval_create: bool,
    /// Reject every action except `create_field`
    pub schema_only: bool,
}

impl SSOTUpdateConfig {
    /// Create default policy (everything reviewed, company from request)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With company source
    #[inline]
    #[must_use]
    pub fn with_company_source(mut self, source: TargetCompanySource) -> Self {
        self.target_company_source = source;
        self
    }

    /// With L4 auto-approval
    #[inline]
    #[must_use]
    pub fn with_auto_approve_l4(mut self, enabled: bool) -> Self {
        self.auto_approve_l4 = enabled;
        self
    }

    /// With forced review of field creation
    #[inline]
    #[must_use]
    pub fn with_require_approval_create(mut self, enabled: bool) -> Self {
        self.require_approval_create = enabled;
        self
    }

    /// With schema-only mode
    #[inline]
    #[must_use]
    pub fn with_schema_only(mut self, enabled: bool) -> Self {
        self.schema_only = enabled;
        self
    }

    /// Whether a valid change at `level` doing `action` skips human review
    ///
    /// `require_approval_create` takes precedence over `auto_approve_l4`.
    #[inline]
    #[must_use]
    pub fn auto_approves(&self, level: TargetLevel, action: ChangeAction) -> bool {
        self.auto_approve_l4
            && level == TargetLevel::L4
            && !(self.require_approval_create && action == ChangeAction::CreateField)
    }
}
