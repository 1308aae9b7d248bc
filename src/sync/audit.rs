//! # Audit-sink contract.
//!
//! Every job lifecycle milestone emits one structured audit event to an
//! external sink. Payload details are free-form JSON; the action tag and
//! tenant id are fixed by the contract. Secrets never appear here; details
//! are built from redacted data only.

use async_trait::async_trait;
use serde::Serialize;

use super::store::SyncError;

/// Action tag of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    DownloadStarted,
    DownloadCompleted,
    DownloadFailed,
}

/// One audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// What happened.
    pub action: AuditAction,
    /// Tenant the job ran under.
    pub tenant_id: String,
    /// Free-form details payload (job id, content id, error label, ...).
    pub details: serde_json::Value,
}

/// External audit sink.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    /// Records one event.
    async fn record(&self, event: AuditEvent) -> Result<(), SyncError>;
}

/// Sink that drops every event.
pub struct NoopSink;

#[async_trait]
impl AuditSink for NoopSink {
    async fn record(&self, _event: AuditEvent) -> Result<(), SyncError> {
        Ok(())
    }
}
