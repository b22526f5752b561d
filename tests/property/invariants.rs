//! Property-based tests for scoring bounds and revision-history contiguity

use courseforge::course::{ChangeType, Course, CourseMetadata};
use courseforge::types::UserId;
use courseforge::validate::validation_score;
use proptest::prelude::*;

/// The score formula never leaves [0, 100] and more findings never help.
#[test]
fn score_stays_bounded_and_monotone() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(0usize..64, 0usize..64), |(errors, warnings)| {
            let score = validation_score(errors, warnings);
            prop_assert!(score <= 100);

            let with_extra_error = validation_score(errors + 1, warnings);
            let with_extra_warning = validation_score(errors, warnings + 1);
            prop_assert!(with_extra_error <= score);
            prop_assert!(with_extra_warning <= score);
            Ok(())
        })
        .unwrap();
}

/// Zero findings is exactly 100; the documented examples hold.
#[test]
fn score_anchor_points() {
    assert_eq!(validation_score(0, 0), 100);
    assert_eq!(validation_score(1, 0), 80);
    assert_eq!(validation_score(0, 3), 85);
}

/// Revision versions stay contiguous from 1 under any edit interleaving.
#[test]
fn revision_versions_stay_contiguous() {
    let mut runner = proptest::test_runner::TestRunner::default();

    let change_types = prop::collection::vec(0u8..4, 0..40);
    runner
        .run(&change_types, |edits| {
            let mut course = Course::new(
                UserId::from("prop-author"),
                Some("Property".to_string()),
                CourseMetadata::default(),
            );
            for (i, kind) in edits.iter().enumerate() {
                let change_type = match kind {
                    0 => ChangeType::TitleSaved,
                    1 => ChangeType::Updated,
                    2 => ChangeType::InvocationAccepted,
                    _ => ChangeType::Created,
                };
                course.push_revision(
                    UserId::from("prop-author"),
                    change_type,
                    format!("edit {i}"),
                );
            }

            for (idx, entry) in course.revision_history.iter().enumerate() {
                prop_assert_eq!(entry.version, idx as u64 + 1);
            }
            Ok(())
        })
        .unwrap();
}
