//! Advisory validators for generated invocation content.
//!
//! Validation runs after every successful generation and before the review
//! transition, but never blocks it: errors and warnings ride along to the
//! human reviewer, who is the only gate on progression.

use crate::course::{has_measurable_verb, total_lessons, Course, Topic};
use crate::invocation::InvocationPayload;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const DESCRIPTION_MIN_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 2000;
const OBJECTIVE_COUNT_MIN: usize = 3;
const OBJECTIVE_COUNT_MAX: usize = 7;
const LESSON_COUNT_MIN: usize = 5;

/// Outcome of validating one invocation's generated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// `max(0, 100 - 20*errors - 5*warnings)`
    pub score: u8,
}

impl ValidationReport {
    /// A report with no findings and a perfect score.
    pub fn clean() -> Self {
        Self::from_findings(Vec::new(), Vec::new())
    }

    pub fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        let score = validation_score(errors.len(), warnings.len());
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            score,
        }
    }
}

/// Score formula shared by every validator.
pub fn validation_score(error_count: usize, warning_count: usize) -> u8 {
    let penalty = error_count.saturating_mul(20) + warning_count.saturating_mul(5);
    100u8.saturating_sub(penalty.min(100) as u8)
}

/// Validate a generated payload with the rules for its invocation.
pub fn validate_payload(payload: &InvocationPayload) -> ValidationReport {
    match payload {
        InvocationPayload::Description {
            description,
            assistance_tier,
        } => validate_description(description, assistance_tier.is_some()),
        InvocationPayload::Objectives {
            learning_objectives,
        } => validate_objectives(learning_objectives),
        InvocationPayload::Structure { topics } => validate_structure(topics),
        InvocationPayload::FullBuild {
            topics,
            assessments,
        } => validate_full_build(topics, assessments),
        // Template mapping has no structural validator; the admin reviews it.
        InvocationPayload::TemplateMapping { .. } => ValidationReport::clean(),
    }
}

fn validate_description(description: &str, tier_specified: bool) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if description.trim().is_empty() {
        errors.push("Missing course description".to_string());
    } else {
        let chars = description.chars().count();
        if chars < DESCRIPTION_MIN_CHARS {
            warnings.push("Description is quite short - consider expanding".to_string());
        }
        if chars > DESCRIPTION_MAX_CHARS {
            warnings.push("Description is very long - consider condensing".to_string());
        }
    }

    if !tier_specified {
        warnings.push("Assistance tier not specified - defaulting to \"full\"".to_string());
    }

    ValidationReport::from_findings(errors, warnings)
}

fn validate_objectives(
    objectives: &[crate::course::LearningObjective],
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if objectives.is_empty() {
        errors.push("No learning objectives generated".to_string());
    } else if !(OBJECTIVE_COUNT_MIN..=OBJECTIVE_COUNT_MAX).contains(&objectives.len()) {
        warnings.push(format!(
            "Objective count outside the recommended range ({OBJECTIVE_COUNT_MIN}-{OBJECTIVE_COUNT_MAX})"
        ));
    }

    for (idx, objective) in objectives.iter().enumerate() {
        if objective.text.trim().is_empty() {
            errors.push(format!("Learning objective {} has no text", idx + 1));
        } else if !has_measurable_verb(&objective.text) {
            warnings.push(format!(
                "LO{} may lack a measurable action verb",
                idx + 1
            ));
        }
    }

    let bloom_levels: BTreeSet<_> = objectives
        .iter()
        .filter_map(|o| o.bloom_level)
        .collect();
    if !objectives.is_empty() && bloom_levels.len() < 2 {
        warnings
            .push("Consider varying Bloom's taxonomy levels across objectives".to_string());
    }

    ValidationReport::from_findings(errors, warnings)
}

fn structure_findings(topics: &[Topic]) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if topics.is_empty() {
        errors.push("No topics generated".to_string());
    }

    for (t_idx, topic) in topics.iter().enumerate() {
        if topic.title.trim().is_empty() {
            errors.push(format!("Topic {} has no title", t_idx + 1));
        }
        if topic.subtopics.is_empty() {
            warnings.push(format!("Topic \"{}\" has no subtopics", topic.title));
        }
        for (s_idx, subtopic) in topic.subtopics.iter().enumerate() {
            if subtopic.title.trim().is_empty() {
                errors.push(format!(
                    "Subtopic {} in \"{}\" has no title",
                    s_idx + 1,
                    topic.title
                ));
            }
            if subtopic.lessons.is_empty() {
                warnings.push(format!("Subtopic \"{}\" has no lessons", subtopic.title));
            }
        }
    }

    if !topics.is_empty() && total_lessons(topics) < LESSON_COUNT_MIN {
        warnings
            .push("Very few lessons - consider expanding the course structure".to_string());
    }

    (errors, warnings)
}

fn validate_structure(topics: &[Topic]) -> ValidationReport {
    let (errors, warnings) = structure_findings(topics);
    ValidationReport::from_findings(errors, warnings)
}

fn validate_full_build(
    topics: &[Topic],
    assessments: &[crate::course::Assessment],
) -> ValidationReport {
    let (mut errors, mut warnings) = structure_findings(topics);

    if assessments.is_empty() {
        warnings.push("No assessments generated".to_string());
    } else {
        for (idx, assessment) in assessments.iter().enumerate() {
            if assessment.question.trim().is_empty() {
                errors.push(format!("Assessment {} has no question", idx + 1));
            }
            if assessment.correct_answer.is_none() {
                warnings.push(format!(
                    "Assessment {} has no correct answer specified",
                    idx + 1
                ));
            }
        }

        let linked = assessments
            .iter()
            .filter(|a| a.linked_objective.is_some())
            .count();
        if linked * 2 < assessments.len() {
            warnings.push(
                "Many assessments are not linked to learning objectives".to_string(),
            );
        }
    }

    ValidationReport::from_findings(errors, warnings)
}

/// Cross-field coherence advisory between the description and objectives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoherenceReport {
    pub coherent: bool,
    pub issues: Vec<String>,
}

/// Keyword-overlap check: at least one objective should share a significant
/// word with the course description.
pub fn check_coherence(course: &Course) -> CoherenceReport {
    let mut issues = Vec::new();

    if let Some(description) = &course.description {
        if !course.learning_objectives.is_empty() {
            let desc_words: Vec<String> = description
                .to_lowercase()
                .split_whitespace()
                .filter(|w| w.chars().count() > 4)
                .map(|w| w.to_string())
                .collect();
            let has_overlap = course.learning_objectives.iter().any(|lo| {
                let text = lo.text.to_lowercase();
                desc_words.iter().any(|word| text.contains(word.as_str()))
            });
            if !has_overlap {
                issues.push(
                    "Learning objectives may not align well with course description"
                        .to_string(),
                );
            }
        }
    }

    CoherenceReport {
        coherent: issues.is_empty(),
        issues,
    }
}
