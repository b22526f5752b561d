//! Typed per-invocation payloads and the shape-parsing boundary between the
//! generation backend's JSON and the engine.

use crate::course::{Assessment, AssistanceTier, LearningObjective, TemplateMapping, Topic};
use crate::error::EngineError;
use crate::invocation::InvocationNumber;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The structured output of one invocation, shaped per stage.
///
/// Carrying the shape in the type keeps merge and validation dispatch
/// exhaustive instead of switching on loosely-typed JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvocationPayload {
    Description {
        description: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        assistance_tier: Option<AssistanceTier>,
    },
    Objectives {
        learning_objectives: Vec<LearningObjective>,
    },
    Structure {
        topics: Vec<Topic>,
    },
    FullBuild {
        topics: Vec<Topic>,
        assessments: Vec<Assessment>,
    },
    TemplateMapping {
        mappings: Vec<TemplateMapping>,
    },
}

impl InvocationPayload {
    /// The invocation this payload belongs to.
    pub fn invocation(&self) -> InvocationNumber {
        match self {
            InvocationPayload::Description { .. } => InvocationNumber::Description,
            InvocationPayload::Objectives { .. } => InvocationNumber::Objectives,
            InvocationPayload::Structure { .. } => InvocationNumber::Structure,
            InvocationPayload::FullBuild { .. } => InvocationNumber::FullBuild,
            InvocationPayload::TemplateMapping { .. } => InvocationNumber::TemplateMapping,
        }
    }

    /// Parse an untagged backend document into the payload shape for
    /// `invocation`. Malformed output is a generation failure, not a panic.
    pub fn from_backend_json(
        invocation: InvocationNumber,
        value: Value,
    ) -> Result<Self, EngineError> {
        let malformed = |err: serde_json::Error| {
            EngineError::Generation(format!(
                "malformed invocation {invocation} output: {err}"
            ))
        };
        match invocation {
            InvocationNumber::Description => {
                let doc: DescriptionDoc = serde_json::from_value(value).map_err(malformed)?;
                Ok(InvocationPayload::Description {
                    description: doc.description,
                    assistance_tier: doc.assistance_tier,
                })
            }
            InvocationNumber::Objectives => {
                let doc: ObjectivesDoc = serde_json::from_value(value).map_err(malformed)?;
                Ok(InvocationPayload::Objectives {
                    learning_objectives: doc.learning_objectives,
                })
            }
            InvocationNumber::Structure => {
                let doc: StructureDoc = serde_json::from_value(value).map_err(malformed)?;
                Ok(InvocationPayload::Structure { topics: doc.topics })
            }
            InvocationNumber::FullBuild => {
                let doc: FullBuildDoc = serde_json::from_value(value).map_err(malformed)?;
                Ok(InvocationPayload::FullBuild {
                    topics: doc.topics,
                    assessments: doc.assessments,
                })
            }
            InvocationNumber::TemplateMapping => {
                let doc: TemplateMappingDoc = serde_json::from_value(value).map_err(malformed)?;
                Ok(InvocationPayload::TemplateMapping {
                    mappings: doc.mappings,
                })
            }
        }
    }
}

// Untagged backend document shapes. The backend emits plain objects without
// the `kind` discriminator, keyed by which invocation was requested.

#[derive(Deserialize)]
struct DescriptionDoc {
    description: String,
    #[serde(default)]
    assistance_tier: Option<AssistanceTier>,
}

#[derive(Deserialize)]
struct ObjectivesDoc {
    #[serde(default)]
    learning_objectives: Vec<LearningObjective>,
}

#[derive(Deserialize)]
struct StructureDoc {
    #[serde(default)]
    topics: Vec<Topic>,
}

#[derive(Deserialize)]
struct FullBuildDoc {
    #[serde(default)]
    topics: Vec<Topic>,
    #[serde(default)]
    assessments: Vec<Assessment>,
}

#[derive(Deserialize)]
struct TemplateMappingDoc {
    #[serde(default)]
    mappings: Vec<TemplateMapping>,
}
