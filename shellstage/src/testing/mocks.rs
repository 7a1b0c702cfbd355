//! Mock stages and runners for testing.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::{CapturedOutput, StageOutcome, StageStatus};
use crate::errors::ExecError;
use crate::exec::{CommandRunner, ExecOptions, ExecutionReport};
use crate::stages::Stage;

/// A stage that returns a configured outcome and stdout without running anything.
#[derive(Debug)]
pub struct ScriptedStage {
    name: String,
    outcome: StageOutcome,
    stdout: String,
    captured: CapturedOutput,
    status: StageStatus,
    run_count: usize,
}

impl ScriptedStage {
    /// Creates a stage that succeeds with empty output.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: StageOutcome::Succeeded,
            stdout: String::new(),
            captured: CapturedOutput::default(),
            status: StageStatus::NotRun,
            run_count: 0,
        }
    }

    /// Sets the outcome returned by every run.
    #[must_use]
    pub fn with_outcome(mut self, outcome: StageOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Sets the stdout published by every run.
    #[must_use]
    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    /// Returns how many times the stage ran.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.run_count
    }
}

#[async_trait]
impl Stage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&mut self) -> StageOutcome {
        self.run_count += 1;
        self.captured = CapturedOutput::new(self.stdout.clone(), "");
        self.status = self.outcome.status();
        self.outcome.clone()
    }

    fn stdout_result(&self) -> &str {
        &self.captured.stdout
    }

    fn stderr_result(&self) -> &str {
        &self.captured.stderr
    }

    fn status(&self) -> StageStatus {
        self.status
    }
}

/// One call seen by [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// The command literal.
    pub command: String,
    /// The working directory.
    pub working_dir: PathBuf,
    /// The log tag of the call.
    pub log_tag: String,
}

/// A command runner that answers from a script and records every call.
///
/// Commands without a scripted answer succeed with empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    answers: Mutex<HashMap<String, (CapturedOutput, Option<i32>)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingRunner {
    /// Creates a runner with no scripted answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts `command` to succeed with the given stdout.
    #[must_use]
    pub fn succeed(self, command: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.answers
            .lock()
            .insert(command.into(), (CapturedOutput::new(stdout, ""), None));
        self
    }

    /// Scripts `command` to exit with `code` and the given stderr.
    #[must_use]
    pub fn fail(self, command: impl Into<String>, code: i32, stderr: impl Into<String>) -> Self {
        self.answers
            .lock()
            .insert(command.into(), (CapturedOutput::new("", stderr), Some(code)));
        self
    }

    /// Returns all recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the recorded command literals in order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.command.clone()).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn execute(
        &self,
        command: &str,
        working_dir: &Path,
        options: &ExecOptions,
    ) -> ExecutionReport {
        let started_at = Utc::now();
        self.calls.lock().push(RecordedCall {
            command: command.to_string(),
            working_dir: working_dir.to_path_buf(),
            log_tag: options.log_tag.clone(),
        });

        let answer = self.answers.lock().get(command).cloned();
        match answer {
            Some((captured, Some(code))) => ExecutionReport::failed(
                ExecError::Exit {
                    command: command.to_string(),
                    code: Some(code),
                    status: format!("exit status: {code}"),
                },
                captured,
                started_at,
            ),
            Some((captured, None)) => ExecutionReport::completed(captured, started_at),
            None => ExecutionReport::completed(CapturedOutput::default(), started_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::stages::CommandStage;
    use crate::testing::{assert_outcome_skipped, assert_stdout_contains};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_scripted_stage() {
        let mut stage = ScriptedStage::new("fake")
            .with_outcome(StageOutcome::failed("scripted"))
            .with_stdout("canned");

        assert_eq!(stage.stdout_result(), "");
        let outcome = stage.run().await;

        assert!(outcome.is_failure());
        assert_eq!(stage.status(), StageStatus::Failed);
        assert_eq!(stage.run_count(), 1);
        assert_stdout_contains(&stage, "canned");
    }

    #[tokio::test]
    async fn test_stages_as_trait_objects() {
        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(ScriptedStage::new("a").with_stdout("one")),
            Box::new(ScriptedStage::new("b").with_outcome(StageOutcome::skipped("gate"))),
        ];

        let mut outcomes = Vec::new();
        for stage in &mut stages {
            outcomes.push(stage.run().await);
        }

        assert!(outcomes[0].is_success());
        assert!(outcomes[1].is_skipped());
        assert_eq!(stages[0].stdout_result(), "one");
    }

    #[tokio::test]
    async fn test_recording_runner_drives_command_stage() {
        let runner = Arc::new(
            RecordingRunner::new()
                .fail("test -f lock", 1, "no lock")
                .succeed("echo go", "go\n"),
        );
        let mut stage = CommandStage::new("locked")
            .with_command("echo go")
            .with_only_if("test -f lock")
            .with_directory("/srv")
            .with_runner(runner.clone())
            .with_logger(Arc::new(NoOpLogger));

        let outcome = stage.run().await;

        assert_outcome_skipped(&outcome);
        assert_eq!(stage.stderr_result(), "no lock");
        assert_eq!(runner.commands(), vec!["test -f lock"]);
        let call = &runner.calls()[0];
        assert_eq!(call.working_dir, PathBuf::from("/srv"));
        assert_eq!(call.log_tag, "only_if");
    }
}
