//! Gate progression: courses without a committed title cannot generate.

use crate::integration::test_utils::{harness, owner, titled_course};
use courseforge::audit::{AuditAction, UserTrailOptions};
use courseforge::error::EngineError;
use courseforge::invocation::{InvocationNumber, InvocationStatus};

#[tokio::test]
async fn untitled_course_is_blocked_at_gate_b() {
    let harness = harness();
    let actor = owner();
    let course = harness
        .manager
        .create(&actor, None, Default::default())
        .unwrap();

    let err = harness
        .engine
        .execute(&actor, &course.id, InvocationNumber::Description)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::GateBlocked { gate: 'B', .. }));
    assert_eq!(harness.gateway.request_count(), 0);
}

#[tokio::test]
async fn saving_a_title_unlocks_generation() {
    let harness = harness();
    let actor = owner();
    let course = harness
        .manager
        .create(&actor, None, Default::default())
        .unwrap();

    let course = harness
        .manager
        .save_title(&actor, &course.id, "Intro to Systems")
        .unwrap();
    assert!(course.gates.gate_b);
    assert_eq!(course.title, "Intro to Systems");

    let outcome = harness
        .engine
        .execute(&actor, &course.id, InvocationNumber::Description)
        .await
        .unwrap();
    assert_eq!(
        outcome
            .course
            .invocation(InvocationNumber::Description)
            .status,
        InvocationStatus::Review
    );

    let course = harness
        .engine
        .accept(&actor, &course.id, InvocationNumber::Description, None)
        .unwrap();
    assert_eq!(
        course.invocation(InvocationNumber::Description).status,
        InvocationStatus::Complete
    );
    assert_eq!(course.current_invocation, InvocationNumber::Objectives);
}

#[tokio::test]
async fn gate_b_pass_is_logged_once_and_stays_open() {
    let harness = harness();
    let actor = owner();
    let course = titled_course(&harness, &actor, "First Title");
    let revisions_after_first = course.revision_history.len();

    let course = harness
        .manager
        .save_title(&actor, &course.id, "Second Title")
        .unwrap();
    assert!(course.gates.gate_b);
    // Idempotent on the gate, but still a revision entry.
    assert_eq!(course.revision_history.len(), revisions_after_first + 1);

    let gate_events = harness
        .recorder
        .user_trail(
            &actor.user_id,
            &UserTrailOptions {
                actions: vec![AuditAction::GatePassed],
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(gate_events.len(), 1);
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let harness = harness();
    let actor = owner();
    let course = harness
        .manager
        .create(&actor, None, Default::default())
        .unwrap();

    let err = harness
        .manager
        .save_title(&actor, &course.id, "   ")
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));

    let loaded = harness.manager.get(&actor, &course.id).unwrap();
    assert!(!loaded.gates.gate_b);
}

#[tokio::test]
async fn only_the_owner_commits_the_title() {
    let harness = harness();
    let actor = owner();
    let course = harness
        .manager
        .create(&actor, None, Default::default())
        .unwrap();
    let course = harness
        .manager
        .add_collaborator(&actor, &course.id, "collab-1".into())
        .unwrap();

    let collaborator = courseforge::types::Actor::user("collab-1");
    let err = harness
        .manager
        .save_title(&collaborator, &course.id, "Hijacked")
        .unwrap_err();
    assert!(matches!(err, EngineError::Authorization(_)));
}
