//! Stage trait and implementations.
//!
//! Stages are the units of work a pipeline runner sequences. Every concrete
//! stage kind implements [`Stage`] directly.

mod command;
mod gate;

pub use command::CommandStage;
pub use gate::{ConditionGate, GateVerdict, ONLY_IF_TAG};

use crate::core::{StageOutcome, StageStatus};
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
///
/// A stage is run by exactly one caller at a time; `run` takes `&mut self`
/// and returns only once all of its work has completed.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Runs the stage to completion.
    async fn run(&mut self) -> StageOutcome;

    /// Returns standard output captured by the most recent run.
    ///
    /// Empty before the first run. An empty string does not by itself mean
    /// the stage never ran; check [`Stage::status`] for that.
    fn stdout_result(&self) -> &str;

    /// Returns standard error captured by the most recent run.
    fn stderr_result(&self) -> &str;

    /// Returns the lifecycle status.
    fn status(&self) -> StageStatus;
}
