//! Execution options and reports.

use crate::cancellation::CancellationToken;
use crate::core::CapturedOutput;
use crate::errors::ExecError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Tag used for main command output.
pub const EXEC_TAG: &str = "exec";

/// Per-call execution options.
///
/// Both bounds are off by default, in which case an execution runs until
/// the process exits on its own.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Tag prefixed to every log line of this execution.
    pub log_tag: String,
    /// Deadline after which the process is killed.
    pub timeout: Option<Duration>,
    /// Token that kills the process when cancelled.
    pub cancel: Option<Arc<CancellationToken>>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            log_tag: EXEC_TAG.to_string(),
            timeout: None,
            cancel: None,
        }
    }
}

impl ExecOptions {
    /// Creates unbounded options with the `exec` tag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log tag.
    #[must_use]
    pub fn with_log_tag(mut self, tag: impl Into<String>) -> Self {
        self.log_tag = tag.into();
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the cancellation reason if the token has already fired.
    #[must_use]
    pub fn cancelled_reason(&self) -> Option<String> {
        self.cancel
            .as_deref()
            .filter(|token| token.is_cancelled())
            .map(|token| token.reason().unwrap_or_default())
    }
}

/// The result of one subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Identifier correlating this execution's log lines.
    pub execution_id: Uuid,
    /// Output captured from both streams, even on failure.
    pub captured: CapturedOutput,
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    /// Why the execution did not succeed.
    pub error: Option<ExecError>,
    /// When the execution started.
    pub started_at: DateTime<Utc>,
    /// When the execution finished.
    pub ended_at: DateTime<Utc>,
}

impl ExecutionReport {
    /// Creates a successful report.
    #[must_use]
    pub fn completed(captured: CapturedOutput, started_at: DateTime<Utc>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            captured,
            exit_code: Some(0),
            error: None,
            started_at,
            ended_at: Utc::now(),
        }
    }

    /// Creates a failed report.
    #[must_use]
    pub fn failed(error: ExecError, captured: CapturedOutput, started_at: DateTime<Utc>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            exit_code: error.exit_code(),
            captured,
            error: Some(error),
            started_at,
            ended_at: Utc::now(),
        }
    }

    /// Sets the execution id.
    #[must_use]
    pub fn with_execution_id(mut self, execution_id: Uuid) -> Self {
        self.execution_id = execution_id;
        self
    }

    /// Returns true if the process started and exited successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.captured.stdout
    }

    /// Returns the captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.captured.stderr
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}
