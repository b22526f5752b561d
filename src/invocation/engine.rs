//! Invocation engine: orchestrates gate checks, prerequisite ordering, the
//! generation round-trip, advisory validation, and the accept/revise/reset
//! review loop. Owns the at-most-one-in-flight guarantee per
//! (course, invocation) pair.

use crate::audit::{AuditAction, AuditLogEntry, AuditRecorder};
use crate::course::{Course, CourseStage, CourseStatus};
use crate::error::EngineError;
use crate::gate::{require_access, require_gate_b, require_owner};
use crate::gateway::{CourseSnapshot, GenerationGateway, GenerationMetadata, GenerationRequest};
use crate::invocation::{
    merge, InvocationNumber, InvocationPayload, InvocationRecord, InvocationStatus,
    ReviewAction, ReviewedResult,
};
use crate::store::CourseStore;
use crate::types::{Actor, CourseId};
use crate::validate::{validate_payload, ValidationReport};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a successful execute/revise round: the refreshed course plus the
/// generated payload and its advisory validation.
#[derive(Debug, Clone)]
pub struct ExecuteOutcome {
    pub course: Course,
    pub payload: InvocationPayload,
    pub validation: ValidationReport,
    pub metadata: GenerationMetadata,
}

/// Which lifecycle edge starts a generation round.
enum GenerationKind {
    Execute,
    Retry,
    Revise { feedback: String },
}

type InFlightSet = Arc<Mutex<HashSet<(CourseId, InvocationNumber)>>>;

/// Removes the in-flight marker when the generation round ends, on every
/// exit path.
struct InFlightGuard {
    key: (CourseId, InvocationNumber),
    set: InFlightSet,
}

impl InFlightGuard {
    fn acquire(
        set: &InFlightSet,
        course_id: &CourseId,
        invocation: InvocationNumber,
    ) -> Result<Self, EngineError> {
        let key = (course_id.clone(), invocation);
        let mut guard = set.lock();
        if !guard.insert(key.clone()) {
            return Err(EngineError::ConcurrentInvocation {
                course_id: course_id.clone(),
                invocation,
            });
        }
        Ok(Self {
            key,
            set: Arc::clone(set),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}

/// The workflow state machine over persisted courses.
pub struct InvocationEngine {
    store: Arc<dyn CourseStore>,
    gateway: Arc<dyn GenerationGateway>,
    audit: AuditRecorder,
    in_flight: InFlightSet,
}

impl InvocationEngine {
    pub fn new(
        store: Arc<dyn CourseStore>,
        gateway: Arc<dyn GenerationGateway>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            store,
            gateway,
            audit,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn load(&self, course_id: &CourseId) -> Result<Course, EngineError> {
        self.store
            .get(course_id)?
            .ok_or_else(|| EngineError::NotFound(course_id.clone()))
    }

    fn check_preconditions(
        &self,
        actor: &Actor,
        course: &Course,
        invocation: InvocationNumber,
    ) -> Result<(), EngineError> {
        require_access(course, &actor.user_id)?;
        require_gate_b(course)?;
        if invocation.requires_admin() && !actor.is_admin() {
            return Err(EngineError::Authorization(format!(
                "invocation {invocation} requires an administrator role"
            )));
        }
        // Fails closed: an absent or non-complete predecessor blocks execution.
        if let Some(required) = invocation.prerequisite() {
            if course.invocation(required).status != InvocationStatus::Complete {
                return Err(EngineError::Prerequisite {
                    required,
                    requested: invocation,
                });
            }
        }
        Ok(())
    }

    /// First execution of an invocation: `pending → generating → review | error`.
    pub async fn execute(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        invocation: InvocationNumber,
    ) -> Result<ExecuteOutcome, EngineError> {
        self.run_generation(actor, course_id, invocation, GenerationKind::Execute)
            .await
    }

    /// Explicit caller retry after a generation failure: `error → generating`.
    pub async fn retry(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        invocation: InvocationNumber,
    ) -> Result<ExecuteOutcome, EngineError> {
        self.run_generation(actor, course_id, invocation, GenerationKind::Retry)
            .await
    }

    /// Rework a result under review with reviewer feedback. The record passes
    /// transiently through `generating` and lands back in `review`.
    pub async fn revise(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        invocation: InvocationNumber,
        feedback: &str,
    ) -> Result<ExecuteOutcome, EngineError> {
        self.run_generation(
            actor,
            course_id,
            invocation,
            GenerationKind::Revise {
                feedback: feedback.to_string(),
            },
        )
        .await
    }

    async fn run_generation(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        invocation: InvocationNumber,
        kind: GenerationKind,
    ) -> Result<ExecuteOutcome, EngineError> {
        let mut course = self.load(course_id)?;
        self.check_preconditions(actor, &course, invocation)?;

        // Guard before the transition check so a concurrent caller sees the
        // in-flight collision, not a stale-status transition error.
        let _guard = InFlightGuard::acquire(&self.in_flight, course_id, invocation)?;

        let record = course.invocation(invocation);
        let generating = match &kind {
            GenerationKind::Execute => record.begin_execute(invocation)?,
            GenerationKind::Retry => record.begin_retry(invocation)?,
            GenerationKind::Revise { feedback } => record.begin_revise(invocation, feedback)?,
        };

        let prior_result = generating.result.as_ref().map(|r| r.payload.clone());
        let feedback: Vec<String> = generating
            .history
            .iter()
            .filter(|h| h.action == ReviewAction::Revise)
            .filter_map(|h| h.feedback.clone())
            .collect();

        if course.status == CourseStatus::Draft {
            course.status = CourseStatus::InProgress;
        }
        course.set_invocation(invocation, generating);
        let course = self.store.save(course)?;

        debug!(
            course_id = %course_id,
            invocation = %invocation,
            user_id = %actor.user_id,
            "Generation round started"
        );

        let request = GenerationRequest {
            invocation,
            course_id: course_id.clone(),
            prior_result,
            feedback,
            snapshot: CourseSnapshot::from(&course),
        };
        let start = Instant::now();
        let reply = self.gateway.generate(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        // Reload before the second write: other fields may have moved while
        // the gateway call was in flight.
        let mut course = self.load(course_id)?;
        let record = course.invocation(invocation);

        match reply {
            Ok(reply) => {
                if reply.payload.invocation() != invocation {
                    return Err(self.fail_generation(
                        actor,
                        course,
                        record,
                        invocation,
                        duration_ms,
                        "backend returned a payload for the wrong invocation",
                    ));
                }
                let validation = validate_payload(&reply.payload);
                let reviewed = ReviewedResult {
                    payload: reply.payload.clone(),
                    validation: validation.clone(),
                    metadata: reply.metadata.clone(),
                };
                course.set_invocation(invocation, record.finish_review(invocation, reviewed)?);
                let course = self.store.save(course)?;

                info!(
                    course_id = %course_id,
                    invocation = %invocation,
                    score = validation.score,
                    duration_ms,
                    "Generation round complete, awaiting review"
                );
                self.audit.record_invocation_completed(
                    actor.user_id.clone(),
                    course_id.clone(),
                    invocation,
                    duration_ms,
                    json!({
                        "model": reply.metadata.model,
                        "tokens_used": reply.metadata.tokens_used,
                        "score": validation.score,
                    }),
                );

                Ok(ExecuteOutcome {
                    course,
                    payload: reply.payload,
                    validation,
                    metadata: reply.metadata,
                })
            }
            Err(err) => Err(self.fail_generation(
                actor,
                course,
                record,
                invocation,
                duration_ms,
                &err.to_string(),
            )),
        }
    }

    /// Record a generation failure: `generating → error`, audited. Returns
    /// the error to surface to the caller.
    fn fail_generation(
        &self,
        actor: &Actor,
        mut course: Course,
        record: InvocationRecord,
        invocation: InvocationNumber,
        duration_ms: u64,
        message: &str,
    ) -> EngineError {
        warn!(
            course_id = %course.id,
            invocation = %invocation,
            error = %message,
            "Generation round failed"
        );
        let course_id = course.id.clone();
        let failed = match record.fail(invocation, message) {
            Ok(failed) => failed,
            Err(err) => return err,
        };
        course.set_invocation(invocation, failed);
        if let Err(err) = self.store.save(course) {
            return err.into();
        }
        self.audit.record_invocation_failed(
            actor.user_id.clone(),
            course_id,
            invocation,
            duration_ms,
            message,
        );
        EngineError::Generation(message.to_string())
    }

    /// Accept the result under review: merge it into the course, mark the
    /// invocation complete, and advance the current-invocation pointer.
    /// Owner-only.
    pub fn accept(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        invocation: InvocationNumber,
        payload: Option<InvocationPayload>,
    ) -> Result<Course, EngineError> {
        let mut course = self.load(course_id)?;
        require_owner(&course, &actor.user_id)?;

        let record = course.invocation(invocation);
        let payload = match payload.or_else(|| record.result.as_ref().map(|r| r.payload.clone()))
        {
            Some(payload) => payload,
            None => {
                return Err(EngineError::InvalidRequest(format!(
                    "no pending result to accept for invocation {invocation}"
                )))
            }
        };
        if payload.invocation() != invocation {
            return Err(EngineError::InvalidRequest(format!(
                "payload shape does not match invocation {invocation}"
            )));
        }

        let accepted = record.accept(invocation)?;
        course.set_invocation(invocation, accepted);
        merge::apply(&mut course, &payload);
        course.current_stage = stage_after_accept(invocation);
        if let Some(next) = invocation.next() {
            course.current_invocation = next;
        }
        course.push_revision(
            actor.user_id.clone(),
            crate::course::ChangeType::InvocationAccepted,
            format!("{} accepted", invocation.label()),
        );
        let course = self.store.save(course)?;

        info!(
            course_id = %course_id,
            invocation = %invocation,
            user_id = %actor.user_id,
            "Invocation accepted"
        );
        self.audit.record(
            AuditLogEntry::new(AuditAction::ContentAccepted, actor.user_id.clone())
                .course(course_id.clone())
                .invocation(invocation, None),
        );
        Ok(course)
    }

    /// Clear an invocation back to `pending`, discarding result and history.
    /// Owner-only; valid from any state; never calls the gateway.
    pub fn reset(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        invocation: InvocationNumber,
    ) -> Result<Course, EngineError> {
        let mut course = self.load(course_id)?;
        require_owner(&course, &actor.user_id)?;

        let record = course.invocation(invocation);
        course.set_invocation(invocation, record.reset());
        let course = self.store.save(course)?;

        self.audit.record(
            AuditLogEntry::new(AuditAction::InvocationReset, actor.user_id.clone())
                .course(course_id.clone())
                .invocation(invocation, None),
        );
        Ok(course)
    }

    /// Feedback retained for the reviser loop so far, oldest first.
    pub fn revision_feedback(
        &self,
        course_id: &CourseId,
        invocation: InvocationNumber,
    ) -> Result<Vec<String>, EngineError> {
        let course = self.load(course_id)?;
        Ok(course
            .invocation(invocation)
            .history
            .iter()
            .filter(|h| h.action == ReviewAction::Revise)
            .filter_map(|h| h.feedback.clone())
            .collect())
    }
}

/// Stage the authoring UI moves to once an invocation's output is accepted.
fn stage_after_accept(invocation: InvocationNumber) -> CourseStage {
    match invocation {
        InvocationNumber::Description | InvocationNumber::Objectives => CourseStage::Design,
        InvocationNumber::Structure => CourseStage::Build,
        InvocationNumber::FullBuild => CourseStage::Format,
        InvocationNumber::TemplateMapping => CourseStage::Generate,
    }
}
