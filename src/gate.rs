//! Gate Evaluator
//!
//! Pure predicates over the course that decide whether a class of operations
//! is permitted. Gate A is existence plus access; Gate B is a committed title.

use crate::course::Course;
use crate::error::EngineError;
use crate::types::UserId;

/// Gate B predicate: the course has a committed, non-empty title.
pub fn can_pass_gate_b(course: &Course) -> bool {
    !course.title.trim().is_empty()
}

/// Halt an invocation request unless Gate B has passed.
pub fn require_gate_b(course: &Course) -> Result<(), EngineError> {
    if course.gates.gate_b && can_pass_gate_b(course) {
        Ok(())
    } else {
        Err(EngineError::GateBlocked {
            gate: 'B',
            reason: "course title must be saved before generation".to_string(),
        })
    }
}

/// Gate A: caller is the owner or a collaborator.
pub fn require_access(course: &Course, user: &UserId) -> Result<(), EngineError> {
    if course.has_access(user) {
        Ok(())
    } else {
        Err(EngineError::Authorization(format!(
            "user {} has no access to course {}",
            user, course.id
        )))
    }
}

/// Operations reserved to the course owner: gates, title, structure,
/// deletion, accept, and reset.
pub fn require_owner(course: &Course, user: &UserId) -> Result<(), EngineError> {
    if course.is_owner(user) {
        Ok(())
    } else {
        Err(EngineError::Authorization(format!(
            "only the owner of course {} may perform this operation",
            course.id
        )))
    }
}
