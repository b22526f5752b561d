//! Cloning: fresh identity, re-derived Gate B, reset invocation state, and a
//! revision history that restarts at version 1.

use crate::integration::test_utils::{complete_through, harness, owner, titled_course};
use courseforge::course::ChangeType;
use courseforge::error::EngineError;
use courseforge::invocation::InvocationNumber;
use courseforge::types::Actor;

#[tokio::test]
async fn clone_without_title_closes_gate_b() {
    let harness = harness();
    let actor = owner();
    let course = titled_course(&harness, &actor, "Original");
    let course = complete_through(&harness, &actor, &course, InvocationNumber::Objectives).await;

    let clone = harness
        .manager
        .clone_course(&actor, &course.id, None)
        .unwrap();

    assert_ne!(clone.id, course.id);
    assert!(clone.gates.gate_a);
    assert!(!clone.gates.gate_b);
    assert_eq!(clone.title, "Original (Copy)");
    assert!(clone.completed_invocations().is_empty());
    assert!(clone.invocation_state.is_empty());
    assert_eq!(clone.revision_history.len(), 1);
    assert_eq!(clone.revision_history[0].version, 1);
    assert_eq!(clone.revision_history[0].change_type, ChangeType::Cloned);
    // Content carries over even though workflow state does not.
    assert_eq!(clone.learning_objectives, course.learning_objectives);
}

#[tokio::test]
async fn clone_with_title_opens_gate_b_and_can_generate() {
    let harness = harness();
    let actor = owner();
    let course = titled_course(&harness, &actor, "Original");

    let clone = harness
        .manager
        .clone_course(&actor, &course.id, Some("Derivative".to_string()))
        .unwrap();
    assert!(clone.gates.gate_b);

    // The clone starts its own pipeline from invocation 1.
    let outcome = harness
        .engine
        .execute(&actor, &clone.id, InvocationNumber::Description)
        .await
        .unwrap();
    assert_eq!(outcome.course.id, clone.id);
}

#[tokio::test]
async fn collaborators_may_clone_but_strangers_may_not() {
    let harness = harness();
    let actor = owner();
    let course = titled_course(&harness, &actor, "Shared Source");
    harness
        .manager
        .add_collaborator(&actor, &course.id, "collab-1".into())
        .unwrap();

    let collaborator = Actor::user("collab-1");
    let clone = harness
        .manager
        .clone_course(&collaborator, &course.id, None)
        .unwrap();
    // The clone belongs to the cloner, with no inherited collaborators.
    assert_eq!(clone.owner, collaborator.user_id);
    assert!(clone.collaborators.is_empty());

    let stranger = Actor::user("stranger");
    let err = harness
        .manager
        .clone_course(&stranger, &course.id, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));
}
