//! Typed merge of accepted invocation results into the course document.
//!
//! Each payload variant replaces the course fields it owns, so re-applying
//! the same accepted payload is idempotent.

use crate::course::Course;
use crate::invocation::InvocationPayload;

/// Merge an accepted payload into the persisted course fields for its stage.
pub fn apply(course: &mut Course, payload: &InvocationPayload) {
    match payload {
        InvocationPayload::Description {
            description,
            assistance_tier,
        } => {
            course.description = Some(description.clone());
            course.assistance_tier = assistance_tier.unwrap_or_default();
        }
        InvocationPayload::Objectives {
            learning_objectives,
        } => {
            course.learning_objectives = learning_objectives.clone();
        }
        InvocationPayload::Structure { topics } => {
            course.structure = topics.clone();
        }
        InvocationPayload::FullBuild {
            topics,
            assessments,
        } => {
            course.structure = topics.clone();
            course.assessments = assessments.clone();
        }
        InvocationPayload::TemplateMapping { mappings } => {
            course.template_mappings = mappings.clone();
        }
    }
}
