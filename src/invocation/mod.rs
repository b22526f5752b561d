//! Invocation lifecycle: the five numbered generation stages and the typed
//! state machine each one moves through.
//!
//! Transitions are pure functions on [`InvocationRecord`] returning a new
//! record; illegal transitions are errors, not silent field writes.

pub mod engine;
pub mod merge;
pub mod payload;

pub use engine::{ExecuteOutcome, InvocationEngine};
pub use payload::InvocationPayload;

use crate::error::EngineError;
use crate::gateway::GenerationMetadata;
use crate::types::now_millis;
use crate::validate::ValidationReport;
use serde::{Deserialize, Serialize};

/// One of the five numbered generation stages in the authoring pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum InvocationNumber {
    /// Course description + assistance tier
    Description = 1,
    /// Learning objectives
    Objectives = 2,
    /// Topics / subtopics / lessons
    Structure = 3,
    /// Full course build with assessments
    FullBuild = 4,
    /// Template mapping (admin only)
    TemplateMapping = 5,
}

impl InvocationNumber {
    pub const COUNT: usize = 5;

    pub const ALL: [InvocationNumber; 5] = [
        InvocationNumber::Description,
        InvocationNumber::Objectives,
        InvocationNumber::Structure,
        InvocationNumber::FullBuild,
        InvocationNumber::TemplateMapping,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The invocation that must be `Complete` before this one may run.
    /// `Description` opens the pipeline; `TemplateMapping` is admin-gated
    /// instead of order-gated.
    pub fn prerequisite(self) -> Option<InvocationNumber> {
        match self {
            InvocationNumber::Description | InvocationNumber::TemplateMapping => None,
            InvocationNumber::Objectives => Some(InvocationNumber::Description),
            InvocationNumber::Structure => Some(InvocationNumber::Objectives),
            InvocationNumber::FullBuild => Some(InvocationNumber::Structure),
        }
    }

    pub fn next(self) -> Option<InvocationNumber> {
        InvocationNumber::try_from(self.as_u8() + 1).ok()
    }

    pub fn requires_admin(self) -> bool {
        matches!(self, InvocationNumber::TemplateMapping)
    }

    /// Display name used in summaries and revision entries.
    pub fn label(self) -> &'static str {
        match self {
            InvocationNumber::Description => "Course Description",
            InvocationNumber::Objectives => "Learning Objectives",
            InvocationNumber::Structure => "Course Structure",
            InvocationNumber::FullBuild => "Full Course Build",
            InvocationNumber::TemplateMapping => "Template Mapping",
        }
    }
}

impl From<InvocationNumber> for u8 {
    fn from(value: InvocationNumber) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for InvocationNumber {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(InvocationNumber::Description),
            2 => Ok(InvocationNumber::Objectives),
            3 => Ok(InvocationNumber::Structure),
            4 => Ok(InvocationNumber::FullBuild),
            5 => Ok(InvocationNumber::TemplateMapping),
            other => Err(format!("invocation number out of range: {other}")),
        }
    }
}

impl std::fmt::Display for InvocationNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Lifecycle state of one invocation on one course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    #[default]
    Pending,
    Generating,
    Review,
    Complete,
    Error,
}

impl InvocationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvocationStatus::Pending => "pending",
            InvocationStatus::Generating => "generating",
            InvocationStatus::Review => "review",
            InvocationStatus::Complete => "complete",
            InvocationStatus::Error => "error",
        }
    }
}

/// Reviewer decision recorded against an invocation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Accept,
    Revise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: ReviewAction,
    /// Reviser feedback, retained verbatim for audit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub timestamp_ms: u64,
}

/// A generated payload awaiting human review, with its advisory validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewedResult {
    pub payload: InvocationPayload,
    pub validation: ValidationReport,
    pub metadata: GenerationMetadata,
}

/// Per-(course, invocation) lifecycle record. Absent from the course map
/// means `Pending` with no result or history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationRecord {
    #[serde(default)]
    pub status: InvocationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ReviewedResult>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl InvocationRecord {
    fn invalid(
        &self,
        invocation: InvocationNumber,
        operation: &'static str,
    ) -> EngineError {
        EngineError::InvalidTransition {
            invocation,
            status: self.status.as_str().to_string(),
            operation,
        }
    }

    /// `pending → generating` (first execution).
    pub fn begin_execute(&self, invocation: InvocationNumber) -> Result<Self, EngineError> {
        if self.status != InvocationStatus::Pending {
            return Err(self.invalid(invocation, "execute"));
        }
        Ok(Self {
            status: InvocationStatus::Generating,
            error_message: None,
            ..self.clone()
        })
    }

    /// `error → generating` (explicit caller retry).
    pub fn begin_retry(&self, invocation: InvocationNumber) -> Result<Self, EngineError> {
        if self.status != InvocationStatus::Error {
            return Err(self.invalid(invocation, "retry"));
        }
        Ok(Self {
            status: InvocationStatus::Generating,
            error_message: None,
            ..self.clone()
        })
    }

    /// `review → generating`, retaining the feedback verbatim in history.
    pub fn begin_revise(
        &self,
        invocation: InvocationNumber,
        feedback: &str,
    ) -> Result<Self, EngineError> {
        if self.status != InvocationStatus::Review {
            return Err(self.invalid(invocation, "revise"));
        }
        let mut next = self.clone();
        next.status = InvocationStatus::Generating;
        next.history.push(HistoryEntry {
            action: ReviewAction::Revise,
            feedback: Some(feedback.to_string()),
            timestamp_ms: now_millis(),
        });
        Ok(next)
    }

    /// `generating → review`, storing the validated result.
    pub fn finish_review(
        &self,
        invocation: InvocationNumber,
        result: ReviewedResult,
    ) -> Result<Self, EngineError> {
        if self.status != InvocationStatus::Generating {
            return Err(self.invalid(invocation, "finish"));
        }
        Ok(Self {
            status: InvocationStatus::Review,
            result: Some(result),
            error_message: None,
            ..self.clone()
        })
    }

    /// `generating → error`, recording the failure message.
    pub fn fail(
        &self,
        invocation: InvocationNumber,
        message: &str,
    ) -> Result<Self, EngineError> {
        if self.status != InvocationStatus::Generating {
            return Err(self.invalid(invocation, "fail"));
        }
        Ok(Self {
            status: InvocationStatus::Error,
            error_message: Some(message.to_string()),
            ..self.clone()
        })
    }

    /// `review → complete`; the pending result is cleared because the merge
    /// into the course is now the source of truth.
    pub fn accept(&self, invocation: InvocationNumber) -> Result<Self, EngineError> {
        if self.status != InvocationStatus::Review {
            return Err(self.invalid(invocation, "accept"));
        }
        let mut next = self.clone();
        next.status = InvocationStatus::Complete;
        next.result = None;
        next.history.push(HistoryEntry {
            action: ReviewAction::Accept,
            feedback: None,
            timestamp_ms: now_millis(),
        });
        Ok(next)
    }

    /// Any state `→ pending`, clearing result and history.
    pub fn reset(&self) -> Self {
        Self::default()
    }
}
