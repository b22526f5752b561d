//! Error types for the course authoring workflow engine.

use crate::invocation::InvocationNumber;
use crate::types::CourseId;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Course not found: {0}")]
    CourseNotFound(CourseId),

    #[error("Stale document version for course {course_id}: expected {expected}, found {found}")]
    VersionConflict {
        course_id: CourseId,
        expected: u64,
        found: u64,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            err.to_string(),
        ))
    }
}

/// Engine-level errors surfaced to callers.
///
/// Gate, prerequisite, authorization, and not-found failures abort an operation
/// with no state mutation. `Generation` is the exception: it records the error
/// state on the invocation before surfacing.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Gate {gate} not passed: {reason}")]
    GateBlocked { gate: char, reason: String },

    #[error("Invocation {required} must be complete before invocation {requested} can run")]
    Prerequisite {
        required: InvocationNumber,
        requested: InvocationNumber,
    },

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Course not found: {0}")]
    NotFound(CourseId),

    #[error("Invocation {invocation} already in flight for course {course_id}")]
    ConcurrentInvocation {
        course_id: CourseId,
        invocation: InvocationNumber,
    },

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Invalid transition: invocation {invocation} is {status}, {operation} not permitted")]
    InvalidTransition {
        invocation: InvocationNumber,
        status: String,
        operation: &'static str,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}
