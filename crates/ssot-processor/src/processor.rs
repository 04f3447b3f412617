//! Change Plan Processor
//!
//! Turns an [`ExecuteSSOTChangesRequest`] into an
//! [`ExecuteSSOTChangesResponse`]:
//! - Resolves the owning company and checks the plan partition
//! - Stages structure additions before any change (all-or-nothing)
//! - Validates and persists each change in plan order on a working snapshot
//! - Auto-approves L4 changes when the policy allows
//! - Routes invalid changes, warnings and plan exceptions to the alert sink
//!
//! Processing within one plan is sequential. A record already reviewed for
//! the same scoped key is replayed instead of reprocessed, so re-running a
//! plan is safe.

use crate::additions::stage_additions;
use crate::alert::{Alert, AlertKind, AlertSink};
use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::store::PendingChangeStore;
use crate::structure::{StructureSnapshot, StructureStore};
use crate::validator::ChangeValidator;
use chrono::Utc;
use ssot_model::{
    ExecuteSSOTChangesRequest, ExecuteSSOTChangesResponse, FieldDefinition, PendingChangeScope,
    PlanException, ProcessChangeResult, SSOTChange, SSOTPendingChange, SSOTUpdateConfig,
    TargetCompanySource, TargetPath,
};
use std::collections::HashSet;
use std::sync::Arc;

/// State of one plan execution
///
/// Holds the record scope, the effective policy and the working snapshot
/// that additions and accepted changes are staged on.
#[derive(Debug, Clone)]
pub struct PlanContext {
    scope: PendingChangeScope,
    config: SSOTUpdateConfig,
    working: StructureSnapshot,
}

impl PlanContext {
    /// Create context over a loaded snapshot
    #[must_use]
    pub fn new(
        scope: PendingChangeScope,
        config: SSOTUpdateConfig,
        working: StructureSnapshot,
    ) -> Self {
        Self {
            scope,
            config,
            working,
        }
    }

    /// Record scope
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &PendingChangeScope {
        &self.scope
    }

    /// Effective policy
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SSOTUpdateConfig {
        &self.config
    }

    /// Working snapshot
    #[inline]
    #[must_use]
    pub fn working(&self) -> &StructureSnapshot {
        &self.working
    }
}

/// Checks shared by execution and dry runs
#[derive(Debug)]
struct Preamble {
    company_id: String,
    config: SSOTUpdateConfig,
    skip: HashSet<usize>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// The change plan processor
#[derive(Debug, Clone)]
pub struct ChangePlanProcessor {
    /// Configuration
    config: ProcessorConfig,
    /// Live company structure
    structure: Arc<dyn StructureStore>,
    /// Pending-change records
    pending: Arc<dyn PendingChangeStore>,
    /// Operator alerts
    alerts: Arc<dyn AlertSink>,
    /// Per-change rules
    validator: ChangeValidator,
}

impl ChangePlanProcessor {
    /// Create processor over its collaborators
    #[must_use]
    pub fn new(
        config: ProcessorConfig,
        structure: Arc<dyn StructureStore>,
        pending: Arc<dyn PendingChangeStore>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            config,
            structure,
            pending,
            alerts,
            validator: ChangeValidator::new(),
        }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Determine the owning company of a request
    ///
    /// # Errors
    /// Returns [`ProcessorError::CompanyResolution`] when the selected
    /// source carries no non-blank company id.
    pub fn resolve_company(
        request: &ExecuteSSOTChangesRequest,
        config: &SSOTUpdateConfig,
    ) -> Result<String> {
        let (source, company) = match config.target_company_source {
            TargetCompanySource::Request => ("request", Some(request.company_id.as_str())),
            TargetCompanySource::UpstreamInput => {
                ("upstream input", request.plan.company_id.as_deref())
            }
        };

        match company.map(str::trim) {
            Some(company) if !company.is_empty() => Ok(company.to_string()),
            _ => Err(ProcessorError::CompanyResolution(format!(
                "no company_id in {source}"
            ))),
        }
    }

    /// Start a plan execution by loading the company's structure
    ///
    /// # Errors
    /// Returns [`ProcessorError::Store`] when the snapshot cannot be loaded.
    pub async fn begin(
        &self,
        scope: PendingChangeScope,
        config: SSOTUpdateConfig,
    ) -> Result<PlanContext> {
        let working = self.structure.snapshot(&scope.company_id).await?;
        tracing::debug!(
            "Loaded structure for {}: {} nodes",
            scope.company_id,
            working.len()
        );
        Ok(PlanContext::new(scope, config, working))
    }

    /// Process one change within a plan
    ///
    /// Structural errors persist nothing. Semantic errors persist an
    /// invalid record. Valid changes are persisted, staged on the working
    /// snapshot and, when the policy allows, applied and auto-approved.
    ///
    /// # Errors
    /// Returns [`ProcessorError`] when the pending-change store fails or an
    /// auto-approved change cannot be applied. The record then stays
    /// pending and earlier changes are unaffected.
    pub async fn process_change(
        &self,
        change: &SSOTChange,
        ctx: &mut PlanContext,
    ) -> Result<ProcessChangeResult> {
        let key = ctx.scope.key(&change.change_id);
        let existing = self.pending.get(&key).await?;

        if let Some(record) = existing.as_ref().filter(|r| r.is_reviewed()) {
            tracing::debug!(
                "Replaying {} for {}: already {}",
                change.change_id,
                key,
                record.status
            );
            return Ok(ProcessChangeResult::from_record(record).replayed());
        }

        // The structure write of an earlier attempt landed; only the
        // approval is missing.
        if let Some(record) = existing.as_ref().filter(|r| ctx.working.is_applied(r.id)) {
            tracing::debug!("Change {} already applied at {}", change.change_id, record.target_path);
            if !ctx.config.auto_approves(record.target_level(), record.action) {
                return Ok(ProcessChangeResult::from_record(record));
            }
            let record = self.mark_auto_approved(record.clone()).await?;
            return Ok(ProcessChangeResult::from_record(&record));
        }

        let validation = self.validator.validate(change, &ctx.config, &ctx.working);

        let path = match change.resolve_path() {
            Ok(path) if !validation.has_structural_errors() => path,
            _ => {
                let errors = validation.error_messages();
                tracing::warn!("Change {} rejected: {}", change.change_id, errors.join("; "));
                let alert = Alert::new(
                    AlertKind::InvalidChange,
                    &ctx.scope.company_id,
                    format!("change {} rejected before persistence", change.change_id),
                )
                .with_change(change.change_id.clone())
                .with_details(errors.clone());
                let alert_id = alert.id;
                self.raise(alert).await;
                return Ok(ProcessChangeResult::rejected(
                    change.change_id.clone(),
                    errors,
                    validation.warnings,
                    Some(alert_id),
                ));
            }
        };

        let proposed = validation
            .is_valid()
            .then(|| ctx.working.preview(&path, change.action, &change.value_to_write));

        let mut record =
            SSOTPendingChange::from_change(change, path.clone(), &ctx.scope, &validation, proposed);
        if let Some(previous) = &existing {
            record = record.with_identity(previous);
        }

        let alert = self.alert_for(&record);
        if let Some(alert) = &alert {
            record = record.with_alert(alert.id);
        }

        let record = self.pending.upsert(record).await?;
        if let Some(alert) = alert {
            self.raise(alert.with_pending_change(record.id)).await;
        }

        if !validation.is_valid() {
            tracing::debug!(
                "Change {} recorded as invalid: {}",
                change.change_id,
                record.validation_errors.join("; ")
            );
            return Ok(ProcessChangeResult::from_record(&record));
        }

        ctx.working
            .stage(&path, change.action, &change.value_to_write);

        if !ctx.config.auto_approves(path.level(), change.action) {
            tracing::debug!("Change {} awaiting review at {}", change.change_id, path);
            return Ok(ProcessChangeResult::from_record(&record));
        }

        let record = self.auto_approve(record).await?;
        Ok(ProcessChangeResult::from_record(&record))
    }

    /// Execute a full change plan
    ///
    /// Never fails outright: unrecoverable problems set `success = false`
    /// and are listed in `errors`. Per-change validation failures only
    /// appear in `results`.
    pub async fn execute_change_plan(
        &self,
        request: &ExecuteSSOTChangesRequest,
    ) -> ExecuteSSOTChangesResponse {
        tracing::info!(
            "Executing change plan for workflow {} node {} ({} changes)",
            request.workflow_id,
            request.node_id,
            request.plan.validated_changes.len()
        );

        let preamble = match self.preamble(request) {
            Ok(preamble) => preamble,
            Err(e) => {
                tracing::error!("Change plan not started: {}", e);
                return ExecuteSSOTChangesResponse::failed(e.to_string());
            }
        };

        let mut response = ExecuteSSOTChangesResponse {
            success: true,
            errors: preamble.errors,
            warnings: preamble.warnings,
            ..ExecuteSSOTChangesResponse::default()
        };

        let scope = request.scope(preamble.company_id.clone());
        let mut ctx = match self.begin(scope, preamble.config).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::error!("Structure for {} not loaded: {}", preamble.company_id, e);
                response.success = false;
                response.errors.push(e.to_string());
                return response;
            }
        };

        let pass = stage_additions(&mut ctx.working, &request.plan.new_structure_additions);
        response.errors.extend(pass.rejections());
        response.structure_additions = pass.results;

        if let Err(e) = self.commit_additions(&preamble.company_id, &pass.created).await {
            tracing::error!("Structure additions not committed: {}", e);
            response.success = false;
            response.errors.push(e.to_string());
            return response;
        }

        for (index, change) in request.plan.validated_changes.iter().enumerate() {
            if preamble.skip.contains(&index) {
                continue;
            }
            match self.process_change(change, &mut ctx).await {
                Ok(result) => response.results.push(result),
                Err(e) => {
                    tracing::error!("Change {} failed: {}", change.change_id, e);
                    response.success = false;
                    response.errors.push(format!("{}: {e}", change.change_id));
                }
            }
        }

        response.exceptions_recorded = self
            .record_exceptions(
                &preamble.company_id,
                &request.plan.plan_exceptions,
                &mut response.warnings,
            )
            .await;
        response.changes_processed = response.results.len();

        tracing::info!(
            "Change plan for {} done: {} processed, {} exceptions, success={}",
            preamble.company_id,
            response.changes_processed,
            response.exceptions_recorded,
            response.success
        );
        response
    }

    /// Validate a plan against a snapshot without persisting or alerting
    ///
    /// Runs the same pipeline as [`Self::execute_change_plan`] up to
    /// persistence: company resolution, partition check, structure pre-pass
    /// and per-change validation with staging.
    #[must_use]
    pub fn preview_plan(
        &self,
        request: &ExecuteSSOTChangesRequest,
        snapshot: StructureSnapshot,
    ) -> ExecuteSSOTChangesResponse {
        let preamble = match self.preamble(request) {
            Ok(preamble) => preamble,
            Err(e) => return ExecuteSSOTChangesResponse::failed(e.to_string()),
        };

        let mut working = snapshot;
        let pass = stage_additions(&mut working, &request.plan.new_structure_additions);

        let mut results = Vec::new();
        for (index, change) in request.plan.validated_changes.iter().enumerate() {
            if preamble.skip.contains(&index) {
                continue;
            }
            let validation = self.validator.validate(change, &preamble.config, &working);
            if validation.is_valid() {
                if let Ok(path) = change.resolve_path() {
                    working.stage(&path, change.action, &change.value_to_write);
                }
            }
            results.push(ProcessChangeResult::preview(
                change.change_id.clone(),
                &validation,
            ));
        }

        let mut errors = preamble.errors;
        errors.extend(pass.rejections());

        ExecuteSSOTChangesResponse {
            success: true,
            changes_processed: results.len(),
            results,
            errors,
            warnings: preamble.warnings,
            structure_additions: pass.results,
            exceptions_recorded: 0,
        }
    }

    fn preamble(&self, request: &ExecuteSSOTChangesRequest) -> Result<Preamble> {
        let config = request.config.unwrap_or(self.config.update);
        let company_id = Self::resolve_company(request, &config)?;

        let count = request.plan.validated_changes.len();
        if count > self.config.max_changes_per_plan {
            return Err(ProcessorError::PlanTooLarge {
                count,
                limit: self.config.max_changes_per_plan,
            });
        }

        let violations = request.plan.check_partition();
        for violation in &violations {
            tracing::warn!("Skipping change: {}", violation);
        }

        let warnings = request
            .plan
            .non_monotonic_ids()
            .into_iter()
            .map(|id| {
                tracing::warn!("Change id {} does not increase over its predecessor", id);
                format!("change id {id} is not greater than the previous change id")
            })
            .collect();

        Ok(Preamble {
            company_id,
            config,
            skip: violations.iter().map(|v| v.index()).collect(),
            errors: violations.iter().map(ToString::to_string).collect(),
            warnings,
        })
    }

    async fn commit_additions(
        &self,
        company_id: &str,
        created: &[(TargetPath, FieldDefinition)],
    ) -> Result<()> {
        for (path, definition) in created {
            self.structure
                .create_field(company_id, path, definition)
                .await?;
            tracing::info!("Created field {} for {}", path, company_id);
        }
        Ok(())
    }

    /// Apply a valid pending record and mark it auto-approved
    ///
    /// The record is only marked approved once the structure store accepted
    /// the write. The write is keyed by the record, so a retry after a
    /// failed approval does not apply it twice.
    async fn auto_approve(&self, record: SSOTPendingChange) -> Result<SSOTPendingChange> {
        if let Err(e) = record.check_approvable(true) {
            tracing::warn!("Change {} not auto-approved: {}", record.change_id, e);
            return Ok(record);
        }

        self.structure
            .apply(
                &record.company_id,
                record.id,
                &record.target_path,
                record.action,
                &record.value_to_write,
            )
            .await
            .map_err(|source| ProcessorError::AutoApproval {
                change_id: record.change_id.to_string(),
                source,
            })?;

        self.mark_auto_approved(record).await
    }

    async fn mark_auto_approved(&self, record: SSOTPendingChange) -> Result<SSOTPendingChange> {
        let mut approved = record.clone();
        if let Err(e) = approved.auto_approve(Utc::now()) {
            tracing::warn!("Change {} not auto-approved: {}", record.change_id, e);
            return Ok(record);
        }

        let approved = self.pending.upsert(approved).await?;
        tracing::info!(
            "Change {} auto-approved at {}",
            approved.change_id,
            approved.target_path
        );
        Ok(approved)
    }

    fn alert_for(&self, record: &SSOTPendingChange) -> Option<Alert> {
        if !record.validation_errors.is_empty() {
            let mut details = record.validation_errors.clone();
            details.extend(record.validation_warnings.iter().cloned());
            return Some(
                Alert::new(
                    AlertKind::InvalidChange,
                    &record.company_id,
                    format!(
                        "change {} at {} is invalid",
                        record.change_id, record.target_path
                    ),
                )
                .with_change(record.change_id.clone())
                .with_details(details),
            );
        }

        if self.config.alert_on_warnings && !record.validation_warnings.is_empty() {
            return Some(
                Alert::new(
                    AlertKind::ChangeWarnings,
                    &record.company_id,
                    format!(
                        "change {} at {} has {} warning(s)",
                        record.change_id,
                        record.target_path,
                        record.validation_warnings.len()
                    ),
                )
                .with_change(record.change_id.clone())
                .with_details(record.validation_warnings.clone()),
            );
        }

        None
    }

    async fn record_exceptions(
        &self,
        company_id: &str,
        exceptions: &[PlanException],
        warnings: &mut Vec<String>,
    ) -> usize {
        let mut recorded = 0;
        for exception in exceptions {
            let mut alert = Alert::new(
                AlertKind::PlanException,
                company_id,
                format!("plan exception ({})", exception.disposition),
            )
            .with_disposition(exception.disposition)
            .with_details(vec![exception.reason.clone()]);
            if let Some(change_id) = &exception.change_id {
                alert = alert.with_change(change_id.clone());
            }

            match self.alerts.notify(alert).await {
                Ok(()) => recorded += 1,
                Err(e) => {
                    tracing::warn!("Plan exception not recorded: {}", e);
                    warnings.push(format!("plan exception not recorded: {e}"));
                }
            }
        }
        recorded
    }

    async fn raise(&self, alert: Alert) {
        let id = alert.id;
        if let Err(e) = self.alerts.notify(alert).await {
            tracing::warn!("Alert {} not delivered: {}", id, e);
        }
    }
}
