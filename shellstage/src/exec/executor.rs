//! Command executor: spawn, drain both streams concurrently, wait.

use super::report::{ExecOptions, ExecutionReport};
use super::shell::Shell;
use super::stream::{StreamCapture, StreamCollector, DEFAULT_CHUNK_SIZE};
use crate::cancellation::CancellationToken;
use crate::config::ExecutorConfig;
use crate::core::CapturedOutput;
use crate::errors::{ExecError, ShellStageError};
use crate::logging::{StageLogger, TracingLogger};
use async_trait::async_trait;
use chrono::Utc;
use std::fmt::Debug;
use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Default time drains may keep reading after an interrupted process is killed.
const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Runs one command literal to completion.
///
/// A precondition is an ordinary command, so condition gates and stages
/// share the same runner.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync + Debug {
    /// Executes `command` in `working_dir` and reports the outcome.
    ///
    /// Never returns early: failures are logged and described in the
    /// returned report, together with whatever output was captured.
    async fn execute(
        &self,
        command: &str,
        working_dir: &Path,
        options: &ExecOptions,
    ) -> ExecutionReport;
}

/// Runs command literals through a shell subprocess.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: Shell,
    chunk_size: usize,
    drain_grace: Duration,
    logger: Arc<dyn StageLogger>,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(Arc::new(TracingLogger::new()))
    }
}

impl ShellExecutor {
    /// Creates an executor using `sh -c` and 1024-byte reads.
    #[must_use]
    pub fn new(logger: Arc<dyn StageLogger>) -> Self {
        Self {
            shell: Shell::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            drain_grace: DEFAULT_DRAIN_GRACE,
            logger,
        }
    }

    /// Creates an executor from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ShellStageError::Config`] if the configuration is invalid.
    pub fn from_config(
        config: &ExecutorConfig,
        logger: Arc<dyn StageLogger>,
    ) -> Result<Self, ShellStageError> {
        config.validate()?;
        Ok(Self {
            shell: Shell::from_config(config),
            chunk_size: config.chunk_size,
            drain_grace: config.drain_grace(),
            logger,
        })
    }

    /// Sets the shell.
    #[must_use]
    pub fn with_shell(mut self, shell: Shell) -> Self {
        self.shell = shell;
        self
    }

    /// Sets the read chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sets the drain grace period.
    #[must_use]
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    /// Returns the logger.
    #[must_use]
    pub fn logger(&self) -> &Arc<dyn StageLogger> {
        &self.logger
    }

    fn log_failure(&self, tag: &str, err: &ExecError) {
        self.logger.error(&format!("[command] {tag} err: {err}"));
    }

    fn spawn_drain<R>(
        &self,
        reader: R,
        tag: &str,
        stop: &Arc<CancellationToken>,
    ) -> JoinHandle<StreamCapture>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let collector =
            StreamCollector::new(tag, self.logger.clone()).with_chunk_size(self.chunk_size);
        let stop = stop.clone();
        tokio::spawn(async move { collector.drain_until(reader, Some(&stop)).await })
    }

    async fn join_drain(
        &self,
        handle: JoinHandle<StreamCapture>,
        tag: &str,
        stream: &str,
    ) -> StreamCapture {
        match handle.await {
            Ok(capture) => capture,
            Err(e) => {
                self.logger
                    .error(&format!("[command] {tag} err: {stream} drain task failed: {e}"));
                StreamCapture::default()
            }
        }
    }

    /// Stops the drains once the grace period has elapsed.
    fn schedule_drain_stop(&self, stop: &Arc<CancellationToken>) -> JoinHandle<()> {
        let stop = stop.clone();
        let grace = self.drain_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            stop.cancel(format!("process interrupted and output still open after {grace:?}"));
        })
    }

    /// Resolves once the cancel token fires or the deadline passes.
    async fn interruption(
        command: &str,
        options: &ExecOptions,
        deadline: Option<Instant>,
    ) -> ExecError {
        let cancelled = async {
            match options.cancel.as_deref() {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<String>().await,
            }
        };
        let expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            reason = cancelled => ExecError::Cancelled {
                command: command.to_string(),
                reason,
            },
            () = expired => ExecError::TimedOut {
                command: command.to_string(),
                timeout: options.timeout.unwrap_or_default(),
            },
        }
    }

    /// Waits for the child, killing it if interrupted first.
    async fn wait_for_exit(
        &self,
        child: &mut Child,
        command: &str,
        options: &ExecOptions,
        deadline: Option<Instant>,
    ) -> Result<ExitStatus, ExecError> {
        let interruption = tokio::select! {
            status = child.wait() => {
                return status.map_err(|e| ExecError::wait(command, &e));
            }
            err = Self::interruption(command, options, deadline) => err,
        };

        if let Err(e) = child.kill().await {
            self.logger.error(&format!(
                "[command] {} err: failed to kill `{command}`: {e}",
                options.log_tag
            ));
        }
        Err(interruption)
    }
}

#[async_trait]
impl CommandRunner for ShellExecutor {
    async fn execute(
        &self,
        command: &str,
        working_dir: &Path,
        options: &ExecOptions,
    ) -> ExecutionReport {
        let started_at = Utc::now();
        let execution_id = Uuid::new_v4();
        let tag = options.log_tag.as_str();

        if let Some(reason) = options.cancelled_reason() {
            let err = ExecError::Cancelled {
                command: command.to_string(),
                reason,
            };
            self.log_failure(tag, &err);
            return ExecutionReport::failed(err, CapturedOutput::default(), started_at)
                .with_execution_id(execution_id);
        }

        let mut child = match self.shell.command(command, working_dir).spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = ExecError::start(command, &e);
                self.log_failure(tag, &err);
                return ExecutionReport::failed(err, CapturedOutput::default(), started_at)
                    .with_execution_id(execution_id);
            }
        };
        let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
        self.logger.debug(&format!(
            "[command] {tag} started pid {} (execution {execution_id})",
            child.id().map_or_else(|| "?".to_string(), |pid| pid.to_string())
        ));

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            (stdout, _) => {
                let err = ExecError::Spawn {
                    command: command.to_string(),
                    stream: if stdout.is_none() { "stdout" } else { "stderr" },
                };
                self.log_failure(tag, &err);
                if let Err(e) = child.kill().await {
                    self.logger
                        .error(&format!("[command] {tag} err: failed to kill `{command}`: {e}"));
                }
                return ExecutionReport::failed(err, CapturedOutput::default(), started_at)
                    .with_execution_id(execution_id);
            }
        };

        // Both pipes must be read while the process runs, or a chatty child
        // blocks on a full pipe buffer and never exits.
        let stop = Arc::new(CancellationToken::new());
        let stdout_task = self.spawn_drain(stdout, tag, &stop);
        let stderr_task = self.spawn_drain(stderr, tag, &stop);

        let waited = self.wait_for_exit(&mut child, command, options, deadline).await;

        let drains = async {
            let stdout = self.join_drain(stdout_task, tag, "stdout").await;
            let stderr = self.join_drain(stderr_task, tag, "stderr").await;
            (stdout, stderr)
        };
        tokio::pin!(drains);

        let (waited, (stdout_capture, stderr_capture)) = match waited {
            // A background process may still hold the pipes after the shell
            // exits, so the deadline and token keep bounding the drains.
            Ok(status) => tokio::select! {
                biased;
                captures = &mut drains => (Ok(status), captures),
                err = Self::interruption(command, options, deadline) => {
                    stop.cancel(err.to_string());
                    (Err(err), drains.as_mut().await)
                }
            },
            Err(err) => {
                let grace_timer = self.schedule_drain_stop(&stop);
                let captures = drains.as_mut().await;
                grace_timer.abort();
                (Err(err), captures)
            }
        };

        let captured = CapturedOutput::new(stdout_capture.text, stderr_capture.text);
        let report = match waited {
            Ok(status) if status.success() => ExecutionReport::completed(captured, started_at),
            Ok(status) => {
                let err = ExecError::exit(command, status);
                self.log_failure(tag, &err);
                ExecutionReport::failed(err, captured, started_at)
            }
            Err(err) => {
                self.log_failure(tag, &err);
                ExecutionReport::failed(err, captured, started_at)
            }
        };

        self.logger.debug(&format!(
            "[command] {tag} finished execution {execution_id} in {}ms",
            report.duration_ms()
        ));
        report.with_execution_id(execution_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{CollectingLogger, LogLevel};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn executor() -> (ShellExecutor, Arc<CollectingLogger>) {
        let logger = Arc::new(CollectingLogger::new());
        (ShellExecutor::new(logger.clone()), logger)
    }

    fn here() -> PathBuf {
        PathBuf::from(".")
    }

    #[tokio::test]
    async fn test_echo_succeeds() {
        let (executor, logger) = executor();
        let report = executor.execute("echo hello", &here(), &ExecOptions::new()).await;

        assert!(report.is_success());
        assert_eq!(report.stdout(), "hello\n");
        assert_eq!(report.stderr(), "");
        assert_eq!(report.exit_code, Some(0));
        assert!(logger.contains("[command] exec output: hello"));
    }

    #[tokio::test]
    async fn test_streams_are_kept_apart() {
        let (executor, _logger) = executor();
        let report = executor
            .execute("echo out; echo err >&2; echo out2", &here(), &ExecOptions::new())
            .await;

        assert!(report.is_success());
        assert_eq!(report.stdout(), "out\nout2\n");
        assert_eq!(report.stderr(), "err\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_runtime_failure_with_output() {
        let (executor, logger) = executor();
        let report = executor
            .execute("echo partial; echo broken >&2; exit 3", &here(), &ExecOptions::new())
            .await;

        assert!(!report.is_success());
        let err = report.error.clone().unwrap();
        assert!(err.is_runtime_failure());
        assert_eq!(err.exit_code(), Some(3));
        assert_eq!(report.exit_code, Some(3));
        assert_eq!(report.stdout(), "partial\n");
        assert_eq!(report.stderr(), "broken\n");
        assert_eq!(logger.messages_at(LogLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_missing_shell_is_start_failure() {
        let (executor, logger) = executor();
        let executor = executor.with_shell(Shell::new("/nonexistent/shellstage-shell", "-c"));
        let report = executor.execute("echo never", &here(), &ExecOptions::new()).await;

        let err = report.error.unwrap();
        assert!(matches!(err, ExecError::Start { .. }));
        assert!(err.is_launch_failure());
        assert!(report.captured.is_empty());
        assert!(logger.messages_at(LogLevel::Error)[0].starts_with("[command] exec err:"));
    }

    #[tokio::test]
    async fn test_missing_working_directory_is_start_failure() {
        let (executor, _logger) = executor();
        let report = executor
            .execute(
                "echo never",
                Path::new("/nonexistent/shellstage-dir"),
                &ExecOptions::new(),
            )
            .await;

        assert!(report.error.unwrap().is_launch_failure());
    }

    #[tokio::test]
    async fn test_working_directory_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "present").unwrap();

        let (executor, _logger) = executor();
        let report = executor
            .execute("cat marker.txt", dir.path(), &ExecOptions::new())
            .await;

        assert!(report.is_success());
        assert_eq!(report.stdout(), "present");
    }

    #[tokio::test]
    async fn test_large_output_on_both_streams_does_not_deadlock() {
        let (executor, _logger) = executor();
        let executor = executor.with_chunk_size(4096);
        // Well past a 64KiB pipe buffer on each stream.
        let command = "i=0; while [ $i -lt 3000 ]; do \
                       echo oooooooooooooooooooooooooooooooooooooooooooooooooo; \
                       echo eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee >&2; \
                       i=$((i+1)); done";

        let report = tokio::time::timeout(
            Duration::from_secs(60),
            executor.execute(command, &here(), &ExecOptions::new()),
        )
        .await
        .unwrap();

        assert!(report.is_success());
        assert_eq!(report.stdout().len(), 3000 * 51);
        assert_eq!(report.stderr().len(), 3000 * 51);
        assert!(report.stdout().chars().all(|c| c == 'o' || c == '\n'));
        assert!(report.stderr().chars().all(|c| c == 'e' || c == '\n'));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let (executor, _logger) = executor();
        let options = ExecOptions::new().with_timeout(Duration::from_millis(200));

        let report = tokio::time::timeout(
            Duration::from_secs(20),
            executor.execute("echo begin; exec sleep 30", &here(), &options),
        )
        .await
        .unwrap();

        let err = report.error.clone().unwrap();
        assert!(matches!(err, ExecError::TimedOut { .. }));
        assert!(err.is_interrupted());
        assert_eq!(report.stdout(), "begin\n");
    }

    #[tokio::test]
    async fn test_cancellation_kills_process() {
        let (executor, _logger) = executor();
        let token = Arc::new(CancellationToken::new());
        let options = ExecOptions::new().with_cancellation(token.clone());

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                token.cancel("pipeline aborted");
            })
        };

        let report = tokio::time::timeout(
            Duration::from_secs(20),
            executor.execute("exec sleep 30", &here(), &options),
        )
        .await
        .unwrap();
        canceller.await.unwrap();

        assert_eq!(
            report.error,
            Some(ExecError::Cancelled {
                command: "exec sleep 30".to_string(),
                reason: "pipeline aborted".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_already_cancelled_never_spawns() {
        let (executor, logger) = executor();
        let token = Arc::new(CancellationToken::new());
        token.cancel("shutdown");
        let options = ExecOptions::new().with_cancellation(token);

        let report = executor.execute("echo never", &here(), &options).await;

        assert!(matches!(report.error, Some(ExecError::Cancelled { .. })));
        assert!(!logger.contains("started pid"));
    }

    #[tokio::test]
    async fn test_grace_period_stops_drains_held_open_by_grandchild() {
        let (executor, _logger) = executor();
        let executor = executor.with_drain_grace(Duration::from_millis(100));
        let options = ExecOptions::new().with_timeout(Duration::from_millis(100));

        // The background sleep inherits the pipes and outlives the shell.
        let report = tokio::time::timeout(
            Duration::from_secs(20),
            executor.execute("echo early; sleep 30 & wait", &here(), &options),
        )
        .await
        .unwrap();

        assert!(matches!(report.error, Some(ExecError::TimedOut { .. })));
        assert_eq!(report.stdout(), "early\n");
    }

    #[tokio::test]
    async fn test_timeout_bounds_output_held_open_after_exit() {
        let (executor, _logger) = executor();
        let options = ExecOptions::new().with_timeout(Duration::from_millis(300));
        let started = std::time::Instant::now();

        // The shell exits at once but the background sleep keeps both pipes.
        let report = tokio::time::timeout(
            Duration::from_secs(20),
            executor.execute("sleep 8 & echo done", &here(), &options),
        )
        .await
        .unwrap();

        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(matches!(report.error, Some(ExecError::TimedOut { .. })));
        assert_eq!(report.stdout(), "done\n");
    }

    #[tokio::test]
    async fn test_cancellation_bounds_output_held_open_after_exit() {
        let (executor, _logger) = executor();
        let token = Arc::new(CancellationToken::new());
        let options = ExecOptions::new().with_cancellation(token.clone());

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                token.cancel("deploy aborted");
            })
        };

        let report = tokio::time::timeout(
            Duration::from_secs(4),
            executor.execute("sleep 8 & echo done", &here(), &options),
        )
        .await
        .unwrap();
        canceller.await.unwrap();

        assert!(matches!(report.error, Some(ExecError::Cancelled { .. })));
        assert_eq!(report.stdout(), "done\n");
    }

    #[tokio::test]
    async fn test_custom_log_tag() {
        let (executor, logger) = executor();
        let options = ExecOptions::new().with_log_tag("only_if");
        let _ = executor.execute("echo gate", &here(), &options).await;

        assert_eq!(
            logger.messages_at(LogLevel::Info),
            vec!["[command] only_if output: gate\n"]
        );
    }

    #[tokio::test]
    async fn test_from_config() {
        let logger = Arc::new(CollectingLogger::new());
        let config = ExecutorConfig::new().with_shell("sh", "-c").with_chunk_size(1);
        let executor = ShellExecutor::from_config(&config, logger.clone()).unwrap();

        let report = executor.execute("printf abc", &here(), &ExecOptions::new()).await;

        assert_eq!(report.stdout(), "abc");
        assert_eq!(logger.messages_at(LogLevel::Info).len(), 3);

        let bad = ExecutorConfig::new().with_chunk_size(0);
        assert!(matches!(
            ShellExecutor::from_config(&bad, logger),
            Err(ShellStageError::Config(_))
        ));
    }
}
