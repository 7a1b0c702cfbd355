//! The `only_if` condition gate.

use crate::core::CapturedOutput;
use crate::errors::ExecError;
use crate::exec::{CommandRunner, ExecOptions, ExecutionReport};
use crate::logging::StageLogger;
use std::path::Path;
use std::sync::Arc;

/// Tag used for condition output.
pub const ONLY_IF_TAG: &str = "only_if";

/// Whether a stage may run, and what its condition printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateVerdict {
    /// True if there was no condition or it exited with status 0.
    pub satisfied: bool,
    /// Output captured from the condition command.
    pub captured: CapturedOutput,
    /// Why the condition command did not succeed.
    pub error: Option<ExecError>,
}

impl GateVerdict {
    /// A satisfied verdict for stages without a condition.
    #[must_use]
    pub fn open() -> Self {
        Self {
            satisfied: true,
            ..Self::default()
        }
    }
}

impl From<ExecutionReport> for GateVerdict {
    fn from(report: ExecutionReport) -> Self {
        Self {
            satisfied: report.is_success(),
            captured: report.captured,
            error: report.error,
        }
    }
}

/// Runs a stage's precondition through the shared command runner.
#[derive(Debug, Clone)]
pub struct ConditionGate {
    runner: Arc<dyn CommandRunner>,
    logger: Arc<dyn StageLogger>,
}

impl ConditionGate {
    /// Creates a gate.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, logger: Arc<dyn StageLogger>) -> Self {
        Self { runner, logger }
    }

    /// Decides whether the stage named `stage_name` may run.
    ///
    /// A missing or empty condition always passes without spawning anything.
    pub async fn evaluate(
        &self,
        stage_name: &str,
        condition: Option<&str>,
        working_dir: &Path,
        options: &ExecOptions,
    ) -> GateVerdict {
        let Some(condition) = condition.filter(|c| !c.is_empty()) else {
            self.logger.info(&format!(
                "[command] only_if: {stage_name} stage does not have \"only_if\" attribute"
            ));
            return GateVerdict::open();
        };

        self.logger.info(&format!("[command] only_if: {stage_name}"));
        self.logger
            .debug(&format!("[command] only_if literal: {condition}"));

        let options = options.clone().with_log_tag(ONLY_IF_TAG);
        self.runner
            .execute(condition, working_dir, &options)
            .await
            .into()
    }
}
