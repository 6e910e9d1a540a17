use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::ClassId;

/// Outbound audit hook. Delivery is informational: a failing sink never fails the operation
/// that produced the event.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ClassCreated,
    ClassUpdated,
    ClassDeleted,
    StudentsEnrolled,
    StudentRemoved,
    JoinRequested,
    JoinApproved,
    JoinRejected,
    AttendanceDrafted,
    AttendanceSubmitted,
    AttendanceDeleted,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::ClassCreated => "class_created",
            AuditAction::ClassUpdated => "class_updated",
            AuditAction::ClassDeleted => "class_deleted",
            AuditAction::StudentsEnrolled => "students_enrolled",
            AuditAction::StudentRemoved => "student_removed",
            AuditAction::JoinRequested => "join_requested",
            AuditAction::JoinApproved => "join_approved",
            AuditAction::JoinRejected => "join_rejected",
            AuditAction::AttendanceDrafted => "attendance_drafted",
            AuditAction::AttendanceSubmitted => "attendance_submitted",
            AuditAction::AttendanceDeleted => "attendance_deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub class_id: ClassId,
    pub details: BTreeMap<String, String>,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, class_id: &ClassId) -> Self {
        Self {
            action,
            class_id: class_id.clone(),
            details: BTreeMap::new(),
            at: Utc::now(),
        }
    }

    pub fn detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit transport unavailable: {0}")]
    Transport(String),
}

/// Hand an event to the sink, logging instead of propagating failures.
pub(crate) fn emit(sink: &dyn AuditSink, event: AuditEvent) {
    let action = event.action.label();
    let class_id = event.class_id.clone();
    if let Err(err) = sink.record(event) {
        warn!(%class_id, action, error = %err, "audit sink rejected event");
    }
}

/// Sink that writes events to the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        info!(
            target: "academy::audit",
            action = event.action.label(),
            class_id = %event.class_id,
            details = ?event.details,
            "audit"
        );
        Ok(())
    }
}
