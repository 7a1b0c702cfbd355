//! Stage outcome with factory methods.

use super::StageStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The result of running a stage.
///
/// Skipped and failed runs are kept apart so a runner can tell an
/// unsatisfied `only_if` from a broken command. Callers that only need the
/// legacy boolean can use [`StageOutcome::is_success`] or convert with
/// `bool::from(&outcome)`, which maps both `Skipped` and `Failed` to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The condition gate was not satisfied; the main command did not run.
    Skipped {
        /// Why the stage was skipped.
        reason: String,
    },
    /// The main command exited successfully.
    Succeeded,
    /// The main command could not be run or exited unsuccessfully.
    Failed {
        /// Why the stage failed.
        reason: String,
    },
}

impl StageOutcome {
    /// Creates a skipped outcome.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Returns true if the main command ran and succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if the stage was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the skip or failure reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Skipped { reason } | Self::Failed { reason } => Some(reason),
            Self::Succeeded => None,
        }
    }

    /// Returns the terminal status matching this outcome.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        match self {
            Self::Skipped { .. } => StageStatus::Skipped,
            Self::Succeeded => StageStatus::Succeeded,
            Self::Failed { .. } => StageStatus::Failed,
        }
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

impl From<&StageOutcome> for bool {
    fn from(outcome: &StageOutcome) -> Self {
        outcome.is_success()
    }
}

impl From<StageOutcome> for bool {
    fn from(outcome: StageOutcome) -> Self {
        outcome.is_success()
    }
}
