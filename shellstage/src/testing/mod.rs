//! Testing utilities for code that drives stages.
//!
//! This module provides:
//! - Outcome assertions
//! - A scripted stage for pipeline runner tests
//! - A recording command runner for stage tests without subprocesses

mod assertions;
mod mocks;

pub use assertions::{
    assert_outcome_failed, assert_outcome_skipped, assert_outcome_succeeded,
    assert_stdout_contains,
};
pub use mocks::{RecordedCall, RecordingRunner, ScriptedStage};
