//! Course aggregate root: gates, metadata, structure, invocation state, and
//! the append-only revision history.

pub mod structure;

pub use structure::{
    has_measurable_verb, total_lessons, Assessment, AssistanceTier, BloomLevel, EvidenceGrade,
    LearningObjective, Lesson, Subtopic, TemplateMapping, Topic,
};

use crate::invocation::{InvocationNumber, InvocationRecord, InvocationStatus};
use crate::types::{now_millis, CourseId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named preconditions for classes of operations.
///
/// Monotonic: once a gate is true, normal operation never resets it. Cloning
/// is the one path that re-derives `gate_b` for the new course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gates {
    /// Course exists and the caller has access
    pub gate_a: bool,
    /// Course title committed
    pub gate_b: bool,
}

impl Default for Gates {
    fn default() -> Self {
        Self {
            gate_a: true,
            gate_b: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    #[default]
    Draft,
    InProgress,
    Review,
    Published,
    /// Terminal; reached only via soft delete
    Archived,
}

/// Authoring stage the course is presented in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStage {
    #[default]
    Define,
    Design,
    Build,
    Format,
    Generate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDuration {
    pub value: u32,
    pub unit: String,
}

impl Default for CourseDuration {
    fn default() -> Self {
        Self {
            value: 1,
            unit: "days".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseMetadata {
    #[serde(default)]
    pub duration: CourseDuration,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub target_audience: String,
}

/// Kind of content edit recorded in the revision history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Created,
    TitleSaved,
    Updated,
    InvocationAccepted,
    Cloned,
}

/// One entry in the append-only, contiguously versioned revision history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionEntry {
    /// Monotonically increasing, contiguous from 1
    pub version: u64,
    pub changed_by: UserId,
    pub change_type: ChangeType,
    pub summary: String,
    pub timestamp_ms: u64,
}

/// The aggregate root of the authoring workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub owner: UserId,
    #[serde(default)]
    pub collaborators: Vec<UserId>,
    #[serde(default)]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub gates: Gates,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default)]
    pub current_stage: CourseStage,
    #[serde(default)]
    pub metadata: CourseMetadata,
    #[serde(default)]
    pub assistance_tier: AssistanceTier,
    #[serde(default)]
    pub learning_objectives: Vec<LearningObjective>,
    #[serde(default)]
    pub structure: Vec<Topic>,
    #[serde(default)]
    pub assessments: Vec<Assessment>,
    #[serde(default)]
    pub template_mappings: Vec<TemplateMapping>,
    #[serde(default)]
    pub invocation_state: BTreeMap<InvocationNumber, InvocationRecord>,
    /// Next invocation the authoring UI should present; advanced by accept.
    #[serde(default = "default_current_invocation")]
    pub current_invocation: InvocationNumber,
    #[serde(default)]
    pub revision_history: Vec<RevisionEntry>,
    /// Optimistic-concurrency token checked by the store on save.
    #[serde(default)]
    pub doc_version: u64,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

fn default_current_invocation() -> InvocationNumber {
    InvocationNumber::Description
}

impl Course {
    /// Create a fresh course owned by `owner`. The title is optional at
    /// creation; Gate B stays closed until the title is explicitly saved.
    pub fn new(owner: UserId, title: Option<String>, metadata: CourseMetadata) -> Self {
        let now = now_millis();
        let mut course = Self {
            id: CourseId::new(),
            owner: owner.clone(),
            collaborators: Vec::new(),
            title: title.unwrap_or_default(),
            description: None,
            gates: Gates::default(),
            status: CourseStatus::Draft,
            current_stage: CourseStage::Define,
            metadata,
            assistance_tier: AssistanceTier::default(),
            learning_objectives: Vec::new(),
            structure: Vec::new(),
            assessments: Vec::new(),
            template_mappings: Vec::new(),
            invocation_state: BTreeMap::new(),
            current_invocation: InvocationNumber::Description,
            revision_history: Vec::new(),
            doc_version: 0,
            created_at_ms: now,
            updated_at_ms: now,
        };
        course.push_revision(owner, ChangeType::Created, "Course created");
        course
    }

    /// Clone this course for `new_owner`: fresh id, empty invocation state,
    /// revision history restarted at version 1, Gate B reflecting whether a
    /// new title was supplied.
    pub fn clone_for(&self, new_owner: UserId, new_title: Option<String>) -> Self {
        let now = now_millis();
        let gate_b = new_title.is_some();
        let title = new_title.unwrap_or_else(|| format!("{} (Copy)", self.title));
        let mut clone = Self {
            id: CourseId::new(),
            owner: new_owner.clone(),
            collaborators: Vec::new(),
            title,
            description: self.description.clone(),
            gates: Gates {
                gate_a: true,
                gate_b,
            },
            status: CourseStatus::Draft,
            current_stage: CourseStage::Define,
            metadata: self.metadata.clone(),
            assistance_tier: self.assistance_tier,
            learning_objectives: self.learning_objectives.clone(),
            structure: self.structure.clone(),
            assessments: self.assessments.clone(),
            template_mappings: self.template_mappings.clone(),
            invocation_state: BTreeMap::new(),
            current_invocation: InvocationNumber::Description,
            revision_history: Vec::new(),
            doc_version: 0,
            created_at_ms: now,
            updated_at_ms: now,
        };
        clone.push_revision(
            new_owner,
            ChangeType::Cloned,
            format!("Cloned from: {}", self.title),
        );
        clone
    }

    /// Append one revision entry with the next contiguous version number.
    pub fn push_revision(
        &mut self,
        changed_by: UserId,
        change_type: ChangeType,
        summary: impl Into<String>,
    ) {
        self.revision_history.push(RevisionEntry {
            version: self.revision_history.len() as u64 + 1,
            changed_by,
            change_type,
            summary: summary.into(),
            timestamp_ms: now_millis(),
        });
    }

    pub fn is_owner(&self, user: &UserId) -> bool {
        &self.owner == user
    }

    /// Owner or collaborator.
    pub fn has_access(&self, user: &UserId) -> bool {
        self.is_owner(user) || self.collaborators.contains(user)
    }

    /// Lifecycle record for an invocation; absent means `Pending`.
    pub fn invocation(&self, number: InvocationNumber) -> InvocationRecord {
        self.invocation_state
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_invocation(&mut self, number: InvocationNumber, record: InvocationRecord) {
        self.invocation_state.insert(number, record);
    }

    /// Invocation numbers whose lifecycle has reached `Complete`.
    pub fn completed_invocations(&self) -> Vec<InvocationNumber> {
        self.invocation_state
            .iter()
            .filter(|(_, r)| r.status == InvocationStatus::Complete)
            .map(|(n, _)| *n)
            .collect()
    }

    /// Completed share of the five-invocation pipeline, as a percentage.
    pub fn progress_percent(&self) -> u8 {
        let completed = self.completed_invocations().len();
        ((completed * 100) / InvocationNumber::COUNT) as u8
    }
}
