//! Operator alerts
//!
//! Invalid changes, warnings and plan exceptions are pushed to an
//! [`AlertSink`]. Delivery failures are logged by the caller and never fail
//! a plan.

use crate::error::AlertError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use ssot_model::{AlertId, ChangeId, ExceptionDisposition, PendingChangeId};
use std::fmt;

/// What an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Change failed validation
    InvalidChange,
    /// Change passed validation with warnings
    ChangeWarnings,
    /// Upstream agent could not resolve a proposal
    PlanException,
}

/// How urgent an alert is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Needs triage
    Info,
    /// Review should look closer
    Warning,
    /// Change cannot go through as proposed
    Error,
}

/// One operator alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert id, linked from pending-change records
    pub id: AlertId,
    /// Kind
    pub kind: AlertKind,
    /// Severity
    pub severity: AlertSeverity,
    /// Owning company
    pub company_id: String,
    /// Change concerned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_id: Option<ChangeId>,
    /// Record concerned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_change_id: Option<PendingChangeId>,
    /// Triage route of a plan exception
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<ExceptionDisposition>,
    /// Headline
    pub message: String,
    /// Individual errors, warnings or reasons
    #[serde(default)]
    pub details: Vec<String>,
    /// When it was raised
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    /// Create alert with a fresh id
    #[must_use]
    pub fn new(
        kind: AlertKind,
        company_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let severity = match kind {
            AlertKind::InvalidChange => AlertSeverity::Error,
            AlertKind::ChangeWarnings => AlertSeverity::Warning,
            AlertKind::PlanException => AlertSeverity::Info,
        };
        Self {
            id: AlertId::new(),
            kind,
            severity,
            company_id: company_id.into(),
            change_id: None,
            pending_change_id: None,
            disposition: None,
            message: message.into(),
            details: Vec::new(),
            raised_at: Utc::now(),
        }
    }

    /// With a pre-allocated id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: AlertId) -> Self {
        self.id = id;
        self
    }

    /// With the change concerned
    #[inline]
    #[must_use]
    pub fn with_change(mut self, change_id: ChangeId) -> Self {
        self.change_id = Some(change_id);
        self
    }

    /// With the record concerned
    #[inline]
    #[must_use]
    pub fn with_pending_change(mut self, id: PendingChangeId) -> Self {
        self.pending_change_id = Some(id);
        self
    }

    /// With triage route
    #[inline]
    #[must_use]
    pub fn with_disposition(mut self, disposition: ExceptionDisposition) -> Self {
        self.disposition = Some(disposition);
        self
    }

    /// With details
    #[inline]
    #[must_use]
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

/// Destination of operator alerts
#[async_trait]
pub trait AlertSink: Send + Sync + fmt::Debug {
    /// Deliver one alert
    async fn notify(&self, alert: Alert) -> Result<(), AlertError>;
}

/// Sink that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn notify(&self, alert: Alert) -> Result<(), AlertError> {
        match alert.severity {
            AlertSeverity::Error => tracing::error!(
                alert_id = %alert.id,
                company_id = %alert.company_id,
                change_id = ?alert.change_id,
                details = ?alert.details,
                "{}", alert.message
            ),
            AlertSeverity::Warning | AlertSeverity::Info => tracing::warn!(
                alert_id = %alert.id,
                company_id = %alert.company_id,
                change_id = ?alert.change_id,
                details = ?alert.details,
                "{}", alert.message
            ),
        }
        Ok(())
    }
}

/// Sink that keeps alerts in memory
#[derive(Debug, Default)]
pub struct InMemoryAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl InMemoryAlertSink {
    /// Create empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivered alerts, oldest first
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    /// Alert by id
    #[must_use]
    pub fn get(&self, id: AlertId) -> Option<Alert> {
        self.alerts.lock().iter().find(|a| a.id == id).cloned()
    }

    /// Number of delivered alerts of a kind
    #[must_use]
    pub fn count(&self, kind: AlertKind) -> usize {
        self.alerts.lock().iter().filter(|a| a.kind == kind).count()
    }
}

#[async_trait]
impl AlertSink for InMemoryAlertSink {
    async fn notify(&self, alert: Alert) -> Result<(), AlertError> {
        self.alerts.lock().push(alert);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_kind() {
        assert_eq!(
            Alert::new(AlertKind::InvalidChange, "acme", "bad").severity,
            AlertSeverity::Error
        );
        assert_eq!(
            Alert::new(AlertKind::PlanException, "acme", "triage").severity,
            AlertSeverity::Info
        );
    }

    #[tokio::test]
    async fn memory_sink_keeps_order() {
        let sink = InMemoryAlertSink::new();
        let first = Alert::new(AlertKind::ChangeWarnings, "acme", "stale")
            .with_change(ChangeId::from_sequence(1));
        let id = first.id;

        sink.notify(first).await.unwrap();
        sink.notify(Alert::new(AlertKind::PlanException, "acme", "unclear"))
            .await
            .unwrap();

        let alerts = sink.alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].id, id);
        assert_eq!(sink.count(AlertKind::PlanException), 1);
        assert!(sink.get(id).is_some());
    }

    #[tokio::test]
    async fn tracing_sink_accepts_everything() {
        let sink = TracingAlertSink;
        let alert = Alert::new(AlertKind::InvalidChange, "acme", "bad")
            .with_details(vec!["missing target".into()]);
        assert!(sink.notify(alert).await.is_ok());
    }
}
