//! Audit entry schema.

use crate::invocation::InvocationNumber;
use crate::types::{now_millis, CourseId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operational action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CourseCreated,
    CourseCloned,
    CourseArchived,
    GatePassed,
    InvocationCompleted,
    InvocationFailed,
    ContentAccepted,
    ContentRevised,
    InvocationReset,
    ExportGenerated,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::CourseCreated => "COURSE_CREATED",
            AuditAction::CourseCloned => "COURSE_CLONED",
            AuditAction::CourseArchived => "COURSE_ARCHIVED",
            AuditAction::GatePassed => "GATE_PASSED",
            AuditAction::InvocationCompleted => "INVOCATION_COMPLETED",
            AuditAction::InvocationFailed => "INVOCATION_FAILED",
            AuditAction::ContentAccepted => "CONTENT_ACCEPTED",
            AuditAction::ContentRevised => "CONTENT_REVISED",
            AuditAction::InvocationReset => "INVOCATION_RESET",
            AuditAction::ExportGenerated => "EXPORT_GENERATED",
        }
    }
}

/// Which invocation an entry concerns, with the generation round-trip time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationDetail {
    pub number: InvocationNumber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Immutable once written; removed only by the retention purge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub action: AuditAction,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<CourseId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation: Option<InvocationDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp_ms: u64,
}

impl AuditLogEntry {
    pub fn new(action: AuditAction, user_id: UserId) -> Self {
        Self {
            action,
            user_id,
            course_id: None,
            invocation: None,
            metadata: None,
            success: true,
            error_message: None,
            timestamp_ms: now_millis(),
        }
    }

    pub fn course(mut self, course_id: CourseId) -> Self {
        self.course_id = Some(course_id);
        self
    }

    pub fn invocation(mut self, number: InvocationNumber, duration_ms: Option<u64>) -> Self {
        self.invocation = Some(InvocationDetail {
            number,
            duration_ms,
        });
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn failed(mut self, error_message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(error_message.into());
        self
    }

    /// Human-facing timestamp for trail listings.
    pub fn timestamp_rfc3339(&self) -> String {
        crate::types::rfc3339_millis(self.timestamp_ms)
    }
}
