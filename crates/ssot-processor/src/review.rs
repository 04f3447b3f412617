//! Reviewer transitions on pending changes
//!
//! Approval applies the change to the live structure before the record is
//! marked approved. The structure write is keyed by the record, so retrying
//! an approval whose save failed does not apply the change twice. The
//! processor never rejects; rejection is a reviewer action only.

use crate::error::ReviewError;
use crate::store::PendingChangeStore;
use crate::structure::StructureStore;
use chrono::Utc;
use ssot_model::{PendingChangeId, ReviewStatus, SSOTPendingChange};
use std::sync::Arc;

/// Review service
#[derive(Debug, Clone)]
pub struct ReviewService {
    pending: Arc<dyn PendingChangeStore>,
    structure: Arc<dyn StructureStore>,
}

impl ReviewService {
    /// Create review service
    #[must_use]
    pub fn new(pending: Arc<dyn PendingChangeStore>, structure: Arc<dyn StructureStore>) -> Self {
        Self { pending, structure }
    }

    /// Approve a valid record and apply it
    ///
    /// The action is re-applied against the live value (last writer wins).
    ///
    /// # Errors
    /// - [`ReviewError::NotFound`] for an unknown id
    /// - [`ReviewError::Transition`] when the record is invalid, already
    ///   reviewed, carries unacknowledged warnings or the reviewer is blank
    /// - [`ReviewError::Store`] when applying or saving fails; the record
    ///   then stays pending and approving it again is safe
    pub async fn approve(
        &self,
        id: PendingChangeId,
        reviewer: &str,
        acknowledge_warnings: bool,
    ) -> Result<SSOTPendingChange, ReviewError> {
        let mut record = self.load(id).await?;
        record.approve(reviewer, acknowledge_warnings, Utc::now())?;

        let applied = self
            .structure
            .apply(
                &record.company_id,
                record.id,
                &record.target_path,
                record.action,
                &record.value_to_write,
            )
            .await?;
        tracing::info!(
            "Change {} approved by {}: {} now {}",
            record.change_id,
            reviewer,
            record.target_path,
            applied
        );

        Ok(self.pending.upsert(record).await?)
    }

    /// Reject a pending record
    ///
    /// # Errors
    /// - [`ReviewError::NotFound`] for an unknown id
    /// - [`ReviewError::Transition`] when the reason or reviewer is blank or
    ///   the record is already reviewed
    /// - [`ReviewError::Store`] when saving fails
    pub async fn reject(
        &self,
        id: PendingChangeId,
        reviewer: &str,
        reason: &str,
    ) -> Result<SSOTPendingChange, ReviewError> {
        let mut record = self.load(id).await?;
        record.reject(reviewer, reason, Utc::now())?;
        tracing::info!("Change {} rejected by {}: {}", record.change_id, reviewer, reason);
        Ok(self.pending.upsert(record).await?)
    }

    /// Records of a company awaiting review, oldest first
    ///
    /// # Errors
    /// Returns [`ReviewError::Store`] when listing fails.
    pub async fn list_pending(&self, company_id: &str) -> Result<Vec<SSOTPendingChange>, ReviewError> {
        let mut records = self.pending.list_for_company(company_id).await?;
        records.retain(|r| r.status == ReviewStatus::Pending);
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn load(&self, id: PendingChangeId) -> Result<SSOTPendingChange, ReviewError> {
        self.pending
            .get_by_id(id)
            .await?
            .ok_or(ReviewError::NotFound(id))
    }
}
