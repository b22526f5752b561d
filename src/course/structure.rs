//! Instructional-design building blocks: objectives, the Topic → Subtopic →
//! Lesson hierarchy, assessments, and the Bloom taxonomy used to grade them.

use serde::{Deserialize, Serialize};

/// Cognitive-complexity classification applied to learning objectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl BloomLevel {
    /// Measurable action verbs characteristic of this level.
    pub fn verbs(self) -> &'static [&'static str] {
        match self {
            BloomLevel::Remember => {
                &["define", "identify", "list", "name", "recall", "recognize", "state"]
            }
            BloomLevel::Understand => {
                &["describe", "explain", "summarize", "interpret", "classify", "compare"]
            }
            BloomLevel::Apply => {
                &["apply", "demonstrate", "implement", "solve", "use", "execute"]
            }
            BloomLevel::Analyze => {
                &["analyze", "differentiate", "examine", "compare", "contrast", "organize"]
            }
            BloomLevel::Evaluate => {
                &["evaluate", "assess", "critique", "judge", "justify", "recommend"]
            }
            BloomLevel::Create => {
                &["create", "design", "develop", "formulate", "construct", "produce"]
            }
        }
    }

    pub const ALL: [BloomLevel; 6] = [
        BloomLevel::Remember,
        BloomLevel::Understand,
        BloomLevel::Apply,
        BloomLevel::Analyze,
        BloomLevel::Evaluate,
        BloomLevel::Create,
    ];
}

/// True when the text contains a recognized measurable action verb.
pub fn has_measurable_verb(text: &str) -> bool {
    let lowered = text.to_lowercase();
    BloomLevel::ALL
        .iter()
        .flat_map(|level| level.verbs().iter())
        .any(|verb| lowered.contains(verb))
}

/// How much generation assistance the author requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistanceTier {
    /// Maximum generation assistance
    #[default]
    Full,
    /// Suggestions with author control
    Guided,
    /// Author-driven with validation only
    Minimal,
}

/// Trustworthiness classification of generated content, carried as metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceGrade {
    /// Policy / template truth
    A,
    /// Curated knowledge packs
    B,
    /// Cited external sources
    C,
    /// Heuristic draft
    D,
}

/// One learning objective with its Bloom classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningObjective {
    pub code: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bloom_level: Option<BloomLevel>,
}

/// Atomic instructional unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// Secondary grouping underneath a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtopic {
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

/// Primary curricular pillar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
}

/// Planned assessment item, optionally linked to an objective it validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    /// Code of the learning objective this assessment validates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_objective: Option<String>,
}

/// Mapping from a course section to an output template slot (invocation 5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMapping {
    pub section: String,
    pub template_slot: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_grade: Option<EvidenceGrade>,
}

/// Total lesson count across a structure tree.
pub fn total_lessons(topics: &[Topic]) -> usize {
    topics
        .iter()
        .flat_map(|t| t.subtopics.iter())
        .map(|s| s.lessons.len())
        .sum()
}
