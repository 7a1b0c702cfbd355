//! A stage that runs a shell command, guarded by an optional `only_if`.

use super::gate::ConditionGate;
use super::Stage;
use crate::cancellation::CancellationToken;
use crate::config::CommandStageConfig;
use crate::core::{CapturedOutput, StageOutcome, StageStatus};
use crate::errors::{ExecError, ShellStageError};
use crate::exec::report::EXEC_TAG;
use crate::exec::{normalize_directory, CommandRunner, ExecOptions, ShellExecutor};
use crate::logging::{StageLogger, TracingLogger};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Runs `command` in `directory` once `only_if` (if any) exits with status 0.
///
/// ```rust,ignore
/// let mut stage = CommandStage::new("build")
///     .with_command("make release")
///     .with_only_if("test -f Makefile");
///
/// match stage.run().await {
///     StageOutcome::Succeeded => println!("{}", stage.stdout_result()),
///     other => eprintln!("build did not run: {other}"),
/// }
/// ```
#[derive(Debug)]
pub struct CommandStage {
    name: String,
    command: String,
    directory: PathBuf,
    only_if: Option<String>,
    options: ExecOptions,
    captured: CapturedOutput,
    last_error: Option<ExecError>,
    status: StageStatus,
    runner: Option<Arc<dyn CommandRunner>>,
    logger: Arc<dyn StageLogger>,
}

impl CommandStage {
    /// Creates a stage with no command, running in the current directory.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: String::new(),
            directory: PathBuf::from("."),
            only_if: None,
            options: ExecOptions::default(),
            captured: CapturedOutput::default(),
            last_error: None,
            status: StageStatus::NotRun,
            runner: None,
            logger: Arc::new(TracingLogger::new()),
        }
    }

    /// Creates a stage from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ShellStageError::Config`] if the configuration is invalid.
    pub fn from_config(config: CommandStageConfig) -> Result<Self, ShellStageError> {
        config.validate()?;
        let timeout = config.timeout();
        let mut stage = Self::new(config.name)
            .with_command(config.command)
            .with_directory(config.directory);
        stage.only_if = config.only_if;
        stage.options.timeout = timeout;
        Ok(stage)
    }

    /// Decodes a stage from its JSON definition.
    ///
    /// # Errors
    ///
    /// Returns [`ShellStageError::Config`] if the definition does not decode
    /// or fails validation.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ShellStageError> {
        Self::from_config(CommandStageConfig::from_json(value)?)
    }

    /// Sets the main command.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.set_command(command);
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.set_directory(directory);
        self
    }

    /// Sets the condition command.
    #[must_use]
    pub fn with_only_if(mut self, only_if: impl Into<String>) -> Self {
        self.set_only_if(only_if);
        self
    }

    /// Kills the condition or command if it runs longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Kills the condition or command when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.options.cancel = Some(token);
        self
    }

    /// Replaces the runner used for both the condition and the command.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Replaces the logger.
    ///
    /// Unless a custom runner was supplied, process output is logged here too.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn StageLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Sets the main command.
    pub fn set_command(&mut self, command: impl Into<String>) {
        self.command = command.into();
    }

    /// Sets the working directory. An empty path means the current directory.
    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) {
        self.directory = directory.into();
    }

    /// Sets the condition command. An empty literal removes the condition.
    pub fn set_only_if(&mut self, only_if: impl Into<String>) {
        let only_if = only_if.into();
        self.only_if = (!only_if.is_empty()).then_some(only_if);
    }

    /// Returns the main command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the working directory, never empty.
    #[must_use]
    pub fn directory(&self) -> &Path {
        normalize_directory(&self.directory)
    }

    /// Returns the condition command.
    #[must_use]
    pub fn only_if(&self) -> Option<&str> {
        self.only_if.as_deref()
    }

    /// Returns the execution options.
    #[must_use]
    pub fn options(&self) -> &ExecOptions {
        &self.options
    }

    /// Returns both captured streams from the most recent run.
    #[must_use]
    pub fn captured(&self) -> &CapturedOutput {
        &self.captured
    }

    /// Returns the execution error from the most recent run, if any.
    ///
    /// For a skipped stage this is the condition's error.
    #[must_use]
    pub fn last_error(&self) -> Option<&ExecError> {
        self.last_error.as_ref()
    }

    fn runner(&self) -> Arc<dyn CommandRunner> {
        match &self.runner {
            Some(runner) => runner.clone(),
            None => Arc::new(ShellExecutor::new(self.logger.clone())),
        }
    }

    fn finish(&mut self, outcome: StageOutcome) -> StageOutcome {
        self.status = outcome.status();
        outcome
    }
}

#[async_trait]
impl Stage for CommandStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&mut self) -> StageOutcome {
        self.status = StageStatus::Running;
        self.last_error = None;

        let runner = self.runner();
        let directory = self.directory().to_path_buf();

        let gate = ConditionGate::new(runner.clone(), self.logger.clone());
        let verdict = gate
            .evaluate(&self.name, self.only_if.as_deref(), &directory, &self.options)
            .await;
        self.captured = verdict.captured;

        if !verdict.satisfied {
            self.logger.warn(&format!(
                "[command] exec: skipped stage \"{}\", since only_if condition failed",
                self.name
            ));
            let reason = match &verdict.error {
                Some(err) => format!("only_if condition failed: {err}"),
                None => "only_if condition failed".to_string(),
            };
            self.last_error = verdict.error;
            return self.finish(StageOutcome::skipped(reason));
        }

        self.logger.info(&format!("[command] exec: {}", self.name));
        self.logger
            .debug(&format!("[command] exec command literal: {}", self.command));

        let options = self.options.clone().with_log_tag(EXEC_TAG);
        let report = runner.execute(&self.command, &directory, &options).await;
        self.captured = report.captured;

        match report.error {
            None => self.finish(StageOutcome::Succeeded),
            Some(err) => {
                let reason = err.to_string();
                self.last_error = Some(err);
                self.finish(StageOutcome::failed(reason))
            }
        }
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
