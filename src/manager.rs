//! Course manager: the CRUD surface the invocation engine sits on.
//!
//! Owns creation, title commitment (Gate B), metadata edits, collaborators,
//! soft delete, cloning, and revision history access.

use crate::audit::{AuditAction, AuditLogEntry, AuditRecorder};
use crate::course::{
    ChangeType, Course, CourseMetadata, CourseStatus, LearningObjective, RevisionEntry, Topic,
};
use crate::error::EngineError;
use crate::gate::{require_access, require_owner};
use crate::store::{CourseQuery, CourseStore};
use crate::types::{Actor, CourseId, UserId};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Fields a course owner may edit directly outside the generation pipeline.
#[derive(Debug, Clone, Default)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<CourseMetadata>,
    pub learning_objectives: Option<Vec<LearningObjective>>,
    pub structure: Option<Vec<Topic>>,
}

impl CourseUpdate {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.metadata.is_none()
            && self.learning_objectives.is_none()
            && self.structure.is_none()
    }
}

pub struct CourseManager {
    store: Arc<dyn CourseStore>,
    audit: AuditRecorder,
}

impl CourseManager {
    pub fn new(store: Arc<dyn CourseStore>, audit: AuditRecorder) -> Self {
        Self { store, audit }
    }

    fn load(&self, course_id: &CourseId) -> Result<Course, EngineError> {
        self.store
            .get(course_id)?
            .ok_or_else(|| EngineError::NotFound(course_id.clone()))
    }

    /// Create a course. The title is optional here; Gate B only opens through
    /// an explicit `save_title`.
    pub fn create(
        &self,
        actor: &Actor,
        title: Option<String>,
        metadata: CourseMetadata,
    ) -> Result<Course, EngineError> {
        let course = Course::new(actor.user_id.clone(), title, metadata);
        self.store.insert(&course)?;

        info!(course_id = %course.id, owner = %course.owner, "Course created");
        self.audit.record(
            AuditLogEntry::new(AuditAction::CourseCreated, actor.user_id.clone())
                .course(course.id.clone()),
        );
        Ok(course)
    }

    pub fn get(&self, actor: &Actor, course_id: &CourseId) -> Result<Course, EngineError> {
        let course = self.load(course_id)?;
        require_access(&course, &actor.user_id)?;
        Ok(course)
    }

    /// Courses the actor owns or collaborates on, newest-updated first.
    pub fn list(&self, actor: &Actor, query: &CourseQuery) -> Result<Vec<Course>, EngineError> {
        Ok(self.store.list_for_user(&actor.user_id, query)?)
    }

    /// Commit the course title. Passing Gate B for the first time logs
    /// `GATE_PASSED`; re-saving a nonempty title is idempotent on the gate
    /// but still appends a revision entry.
    pub fn save_title(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        title: &str,
    ) -> Result<Course, EngineError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EngineError::InvalidRequest("Title is required".to_string()));
        }

        let mut course = self.load(course_id)?;
        require_owner(&course, &actor.user_id)?;

        let first_pass = !course.gates.gate_b;
        course.title = title.to_string();
        course.gates.gate_b = true;
        course.push_revision(
            actor.user_id.clone(),
            ChangeType::TitleSaved,
            format!("Title set to: {title}"),
        );
        let course = self.store.save(course)?;

        if first_pass {
            info!(course_id = %course.id, "Gate B passed");
            self.audit.record(
                AuditLogEntry::new(AuditAction::GatePassed, actor.user_id.clone())
                    .course(course.id.clone())
                    .metadata(json!({ "gate": "B" })),
            );
        }
        Ok(course)
    }

    /// Owner-only direct edit; appends one `UPDATED` revision entry.
    pub fn update(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        update: CourseUpdate,
    ) -> Result<Course, EngineError> {
        if update.is_empty() {
            return Err(EngineError::InvalidRequest(
                "nothing to update".to_string(),
            ));
        }
        let mut course = self.load(course_id)?;
        require_owner(&course, &actor.user_id)?;

        if let Some(title) = update.title {
            course.title = title;
        }
        if let Some(description) = update.description {
            course.description = Some(description);
        }
        if let Some(metadata) = update.metadata {
            course.metadata = metadata;
        }
        if let Some(objectives) = update.learning_objectives {
            course.learning_objectives = objectives;
        }
        if let Some(structure) = update.structure {
            course.structure = structure;
        }
        course.push_revision(actor.user_id.clone(), ChangeType::Updated, "Course updated");
        Ok(self.store.save(course)?)
    }

    pub fn add_collaborator(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        collaborator: UserId,
    ) -> Result<Course, EngineError> {
        let mut course = self.load(course_id)?;
        require_owner(&course, &actor.user_id)?;
        if course.collaborators.contains(&collaborator) {
            return Err(EngineError::InvalidRequest(
                "User is already a collaborator".to_string(),
            ));
        }
        course.collaborators.push(collaborator);
        Ok(self.store.save(course)?)
    }

    pub fn remove_collaborator(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        collaborator: &UserId,
    ) -> Result<Course, EngineError> {
        let mut course = self.load(course_id)?;
        require_owner(&course, &actor.user_id)?;
        course.collaborators.retain(|c| c != collaborator);
        Ok(self.store.save(course)?)
    }

    /// Soft delete: the course is archived, never removed.
    pub fn archive(&self, actor: &Actor, course_id: &CourseId) -> Result<Course, EngineError> {
        let mut course = self.load(course_id)?;
        require_owner(&course, &actor.user_id)?;
        course.status = CourseStatus::Archived;
        let course = self.store.save(course)?;

        self.audit.record(
            AuditLogEntry::new(AuditAction::CourseArchived, actor.user_id.clone())
                .course(course.id.clone()),
        );
        Ok(course)
    }

    /// Clone a course the actor can read. The clone belongs to the actor,
    /// starts a fresh revision history, and re-derives Gate B from whether a
    /// new title was supplied.
    pub fn clone_course(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        new_title: Option<String>,
    ) -> Result<Course, EngineError> {
        let source = self.load(course_id)?;
        require_access(&source, &actor.user_id)?;

        let clone = source.clone_for(actor.user_id.clone(), new_title);
        self.store.insert(&clone)?;

        info!(source = %source.id, clone = %clone.id, "Course cloned");
        self.audit.record(
            AuditLogEntry::new(AuditAction::CourseCloned, actor.user_id.clone())
                .course(clone.id.clone())
                .metadata(json!({ "source": source.id.as_str() })),
        );
        Ok(clone)
    }

    pub fn revision_history(
        &self,
        actor: &Actor,
        course_id: &CourseId,
    ) -> Result<Vec<RevisionEntry>, EngineError> {
        let course = self.get(actor, course_id)?;
        Ok(course.revision_history)
    }
}
