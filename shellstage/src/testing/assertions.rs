//! Test assertions for stage outcomes.

use crate::core::StageOutcome;
use crate::stages::Stage;

/// Asserts that the outcome is `Succeeded`.
pub fn assert_outcome_succeeded(outcome: &StageOutcome) {
    assert!(
        outcome.is_success(),
        "Expected success, got: {outcome}"
    );
}

/// Asserts that the outcome is `Skipped`.
pub fn assert_outcome_skipped(outcome: &StageOutcome) {
    assert!(
        outcome.is_skipped(),
        "Expected skip, got: {outcome}"
    );
}

/// Asserts that the outcome is `Failed` with a reason containing `needle`.
pub fn assert_outcome_failed(outcome: &StageOutcome, needle: &str) {
    match outcome {
        StageOutcome::Failed { reason } => assert!(
            reason.contains(needle),
            "Expected failure reason to contain '{needle}', got '{reason}'"
        ),
        other => panic!("Expected failure, got: {other}"),
    }
}

/// Asserts that the stage's captured stdout contains `needle`.
pub fn assert_stdout_contains<S: Stage + ?Sized>(stage: &S, needle: &str) {
    assert!(
        stage.stdout_result().contains(needle),
        "Expected stdout of '{}' to contain '{needle}', got {:?}",
        stage.name(),
        stage.stdout_result()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_succeeded() {
        assert_outcome_succeeded(&StageOutcome::Succeeded);
    }

    #[test]
    #[should_panic(expected = "Expected success")]
    fn test_assert_succeeded_panics_on_skip() {
        assert_outcome_succeeded(&StageOutcome::skipped("gate"));
    }

    #[test]
    fn test_assert_failed_reason() {
        assert_outcome_failed(&StageOutcome::failed("`make` exited with exit status: 2"), "status: 2");
    }

    #[test]
    #[should_panic(expected = "Expected failure")]
    fn test_assert_failed_panics_on_success() {
        assert_outcome_failed(&StageOutcome::Succeeded, "");
    }

    #[test]
    fn test_assert_skipped() {
        assert_outcome_skipped(&StageOutcome::skipped("only_if condition failed"));
    }
}
