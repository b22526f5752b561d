//! Export boundary: JSON in-crate, binary formats through the renderer seam,
//! and an audit entry for every attempt.

use crate::integration::test_utils::{complete_through, harness, owner, titled_course, Harness};
use async_trait::async_trait;
use courseforge::audit::{AuditAction, UserTrailOptions};
use courseforge::error::EngineError;
use courseforge::export::{
    CoursePackage, ExportFormat, ExportOutput, ExportRenderer, Exporter, RenderedDocument,
};
use courseforge::invocation::InvocationNumber;
use courseforge::store::SledCourseStore;
use courseforge::types::Actor;
use parking_lot::Mutex;
use std::sync::Arc;

/// Renderer double that records which formats it was asked for.
#[derive(Default)]
struct RecordingRenderer {
    formats: Mutex<Vec<ExportFormat>>,
    fail: bool,
}

#[async_trait]
impl ExportRenderer for RecordingRenderer {
    async fn render(
        &self,
        package: &CoursePackage,
        format: ExportFormat,
    ) -> Result<RenderedDocument, EngineError> {
        self.formats.lock().push(format);
        if self.fail {
            return Err(EngineError::Generation("renderer crashed".to_string()));
        }
        Ok(RenderedDocument {
            filename: format!("{}.{}", package.title, format.as_str()),
            mime_type: "application/octet-stream".to_string(),
            bytes: vec![0u8; 16],
        })
    }
}

fn exporter_for(harness: &Harness, renderer: Arc<RecordingRenderer>) -> Exporter {
    // Rewire an exporter over the same database the harness uses.
    let store = Arc::new(SledCourseStore::new(&harness.db).unwrap());
    Exporter::new(store, renderer, harness.recorder.clone())
}

#[tokio::test]
async fn json_export_needs_no_renderer() {
    let harness = harness();
    let actor = owner();
    let course = titled_course(&harness, &actor, "Exportable");
    let course = complete_through(&harness, &actor, &course, InvocationNumber::Objectives).await;

    let renderer = Arc::new(RecordingRenderer::default());
    let exporter = exporter_for(&harness, renderer.clone());

    let output = exporter
        .export(&actor, &course.id, ExportFormat::Json)
        .await
        .unwrap();
    match output {
        ExportOutput::Json(value) => {
            assert_eq!(value["title"], "Exportable");
            assert!(value["learning_objectives"].is_array());
        }
        other => panic!("expected json output, got {other:?}"),
    }
    assert!(renderer.formats.lock().is_empty());
}

#[tokio::test]
async fn all_formats_fan_out_to_the_renderer() {
    let harness = harness();
    let actor = owner();
    let course = titled_course(&harness, &actor, "Bundle");

    let renderer = Arc::new(RecordingRenderer::default());
    let exporter = exporter_for(&harness, renderer.clone());

    let output = exporter
        .export(&actor, &course.id, ExportFormat::All)
        .await
        .unwrap();
    match output {
        ExportOutput::Bundle(documents) => {
            // JSON plus the three rendered formats.
            assert_eq!(documents.len(), 4);
            assert!(documents[0].filename.ends_with(".json"));
        }
        other => panic!("expected a bundle, got {other:?}"),
    }
    assert_eq!(
        *renderer.formats.lock(),
        vec![ExportFormat::Pptx, ExportFormat::Docx, ExportFormat::Xlsx]
    );
}

#[tokio::test]
async fn renderer_failures_surface_and_are_audited() {
    let harness = harness();
    let actor = owner();
    let course = titled_course(&harness, &actor, "Broken Renderer");

    let renderer = Arc::new(RecordingRenderer {
        fail: true,
        ..Default::default()
    });
    let exporter = exporter_for(&harness, renderer);

    let err = exporter
        .export(&actor, &course.id, ExportFormat::Pptx)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Generation(_)));

    let exports = harness
        .recorder
        .user_trail(
            &actor.user_id,
            &UserTrailOptions {
                actions: vec![AuditAction::ExportGenerated],
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(exports.len(), 1);
    assert!(!exports[0].success);
    assert!(exports[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("renderer crashed"));
}

#[tokio::test]
async fn export_requires_read_access() {
    let harness = harness();
    let actor = owner();
    let course = titled_course(&harness, &actor, "Private");

    let exporter = exporter_for(&harness, Arc::new(RecordingRenderer::default()));
    let stranger = Actor::user("stranger");
    let err = exporter
        .export(&stranger, &course.id, ExportFormat::Json)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));
}
