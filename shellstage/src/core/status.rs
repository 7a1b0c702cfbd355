//! Stage lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a stage.
///
/// A stage moves `NotRun → Skipped` when its condition gate is unsatisfied,
/// or `NotRun → Running → {Succeeded, Failed}` otherwise. `Running` is only
/// observable while [`Stage::run`](crate::stages::Stage::run) is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage has not been run yet.
    #[default]
    NotRun,
    /// The stage is currently running.
    Running,
    /// The condition gate was not satisfied.
    Skipped,
    /// The main command completed successfully.
    Succeeded,
    /// The main command could not be run or did not succeed.
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRun => write!(f, "not_run"),
            Self::Running => write!(f, "running"),
            Self::Skipped => write!(f, "skipped"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a finished run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped | Self::Succeeded | Self::Failed)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}
