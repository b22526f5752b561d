//! Export boundary.
//!
//! The engine hands a finalized `CoursePackage` to an external renderer for
//! the binary Office formats and renders JSON itself. Every export attempt is
//! audited, success or not.

use crate::audit::{AuditAction, AuditLogEntry, AuditRecorder};
use crate::course::{Assessment, Course, CourseMetadata, LearningObjective, Topic};
use crate::error::EngineError;
use crate::gate::require_access;
use crate::store::CourseStore;
use crate::types::{Actor, CourseId};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Supported export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Pptx,
    Docx,
    Xlsx,
    All,
}

impl ExportFormat {
    /// Binary formats delegated to the external renderer.
    pub const RENDERED: [ExportFormat; 3] =
        [ExportFormat::Pptx, ExportFormat::Docx, ExportFormat::Xlsx];

    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Pptx => "pptx",
            ExportFormat::Docx => "docx",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::All => "all",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "pptx" | "powerpoint" => Ok(ExportFormat::Pptx),
            "docx" | "word" => Ok(ExportFormat::Docx),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "all" => Ok(ExportFormat::All),
            other => Err(EngineError::InvalidRequest(format!(
                "Export format '{other}' not supported. Use: json, pptx, docx, xlsx, or all"
            ))),
        }
    }
}

/// Input contract consumed by renderers: the finalized course data, nothing
/// about workflow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoursePackage {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub metadata: CourseMetadata,
    pub learning_objectives: Vec<LearningObjective>,
    pub structure: Vec<Topic>,
    pub assessments: Vec<Assessment>,
}

impl From<&Course> for CoursePackage {
    fn from(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            description: course.description.clone(),
            metadata: course.metadata.clone(),
            learning_objectives: course.learning_objectives.clone(),
            structure: course.structure.clone(),
            assessments: course.assessments.clone(),
        }
    }
}

/// A rendered document returned by the external renderer.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// External renderer seam; internals are out of scope.
#[async_trait]
pub trait ExportRenderer: Send + Sync {
    async fn render(
        &self,
        package: &CoursePackage,
        format: ExportFormat,
    ) -> Result<RenderedDocument, EngineError>;
}

/// One export result: JSON in-crate, documents from the renderer.
#[derive(Debug, Clone)]
pub enum ExportOutput {
    Json(serde_json::Value),
    Document(RenderedDocument),
    Bundle(Vec<RenderedDocument>),
}

pub struct Exporter {
    store: Arc<dyn CourseStore>,
    renderer: Arc<dyn ExportRenderer>,
    audit: AuditRecorder,
}

impl Exporter {
    pub fn new(
        store: Arc<dyn CourseStore>,
        renderer: Arc<dyn ExportRenderer>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            store,
            renderer,
            audit,
        }
    }

    /// Export a course the actor can read. Owner and collaborators only.
    pub async fn export(
        &self,
        actor: &Actor,
        course_id: &CourseId,
        format: ExportFormat,
    ) -> Result<ExportOutput, EngineError> {
        let course = self
            .store
            .get(course_id)?
            .ok_or_else(|| EngineError::NotFound(course_id.clone()))?;
        require_access(&course, &actor.user_id)?;

        let package = CoursePackage::from(&course);
        let result = self.run_export(&package, format).await;

        let mut entry = AuditLogEntry::new(AuditAction::ExportGenerated, actor.user_id.clone())
            .course(course_id.clone())
            .metadata(json!({ "format": format.as_str() }));
        if let Err(err) = &result {
            entry = entry.failed(err.to_string());
        }
        self.audit.record(entry);

        if result.is_ok() {
            info!(course_id = %course_id, format = format.as_str(), "Course exported");
        }
        result
    }

    async fn run_export(
        &self,
        package: &CoursePackage,
        format: ExportFormat,
    ) -> Result<ExportOutput, EngineError> {
        match format {
            ExportFormat::Json => Ok(ExportOutput::Json(render_json(package)?)),
            ExportFormat::Pptx | ExportFormat::Docx | ExportFormat::Xlsx => {
                let document = self.renderer.render(package, format).await?;
                Ok(ExportOutput::Document(document))
            }
            ExportFormat::All => {
                let rendered = try_join_all(
                    ExportFormat::RENDERED
                        .iter()
                        .map(|&rendered_format| self.renderer.render(package, rendered_format)),
                )
                .await?;
                let mut documents = Vec::with_capacity(rendered.len() + 1);
                documents.push(json_document(package)?);
                documents.extend(rendered);
                Ok(ExportOutput::Bundle(documents))
            }
        }
    }
}

fn render_json(package: &CoursePackage) -> Result<serde_json::Value, EngineError> {
    serde_json::to_value(package)
        .map_err(|e| EngineError::InvalidRequest(format!("Failed to encode course: {e}")))
}

fn json_document(package: &CoursePackage) -> Result<RenderedDocument, EngineError> {
    let bytes = serde_json::to_vec_pretty(package)
        .map_err(|e| EngineError::InvalidRequest(format!("Failed to encode course: {e}")))?;
    Ok(RenderedDocument {
        filename: format!("{}.json", sanitize_filename(&package.title)),
        mime_type: "application/json".to_string(),
        bytes,
    })
}

fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "course".to_string()
    } else {
        cleaned
    }
}
