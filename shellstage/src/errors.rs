//! Error types for shell stages.
//!
//! Execution failures never cross the [`Stage`](crate::stages::Stage)
//! boundary as `Err` values. They are logged, carried inside an
//! [`ExecutionReport`](crate::exec::ExecutionReport) and finally folded into a
//! [`StageOutcome`](crate::core::StageOutcome).

use std::time::Duration;
use thiserror::Error;

/// The crate-level error type.
#[derive(Debug, Error)]
pub enum ShellStageError {
    /// A subprocess could not be launched or did not finish successfully.
    #[error("{0}")]
    Exec(#[from] ExecError),

    /// An output stream failed while being drained.
    #[error("{0}")]
    StreamRead(#[from] StreamReadError),

    /// A stage or executor configuration was rejected.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// A failure while launching, waiting on or bounding a subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    /// A pipe handle for one of the output streams was not available.
    #[error("failed to acquire {stream} handle for `{command}`")]
    Spawn {
        /// The command literal.
        command: String,
        /// Which stream was missing (`stdout` or `stderr`).
        stream: &'static str,
    },

    /// The process could not be started.
    #[error("failed to start `{command}`: {message}")]
    Start {
        /// The command literal.
        command: String,
        /// The OS error text.
        message: String,
    },

    /// Waiting for the process failed.
    #[error("failed to wait for `{command}`: {message}")]
    Wait {
        /// The command literal.
        command: String,
        /// The OS error text.
        message: String,
    },

    /// The process finished with a non-success status.
    #[error("`{command}` exited with {status}")]
    Exit {
        /// The command literal.
        command: String,
        /// The exit code, if the process was not terminated by a signal.
        code: Option<i32>,
        /// Human-readable exit status.
        status: String,
    },

    /// Execution was cancelled through a cancellation token.
    #[error("`{command}` was cancelled: {reason}")]
    Cancelled {
        /// The command literal.
        command: String,
        /// The cancellation reason.
        reason: String,
    },

    /// Execution exceeded its deadline.
    #[error("`{command}` timed out after {timeout:?}")]
    TimedOut {
        /// The command literal.
        command: String,
        /// The deadline that elapsed.
        timeout: Duration,
    },
}

impl ExecError {
    /// Creates a start error from an I/O error.
    #[must_use]
    pub fn start(command: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Start {
            command: command.into(),
            message: err.to_string(),
        }
    }

    /// Creates a wait error from an I/O error.
    #[must_use]
    pub fn wait(command: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Wait {
            command: command.into(),
            message: err.to_string(),
        }
    }

    /// Creates an exit error from a process exit status.
    #[must_use]
    pub fn exit(command: impl Into<String>, status: std::process::ExitStatus) -> Self {
        Self::Exit {
            command: command.into(),
            code: status.code(),
            status: status.to_string(),
        }
    }

    /// Returns the command literal the error refers to.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { command, .. }
            | Self::Start { command, .. }
            | Self::Wait { command, .. }
            | Self::Exit { command, .. }
            | Self::Cancelled { command, .. }
            | Self::TimedOut { command, .. } => command,
        }
    }

    /// Returns true if the process never got to run.
    #[must_use]
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::Start { .. })
    }

    /// Returns true if the process ran but did not finish successfully.
    #[must_use]
    pub fn is_runtime_failure(&self) -> bool {
        matches!(self, Self::Wait { .. } | Self::Exit { .. })
    }

    /// Returns true if execution was interrupted by cancellation or timeout.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::TimedOut { .. })
    }

    /// Returns the exit code for exit errors.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => *code,
            _ => None,
        }
    }
}

/// A non end-of-stream failure while draining an output stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed reading {tag} output after {bytes_read} bytes: {message}")]
pub struct StreamReadError {
    /// The log tag of the drained stream.
    pub tag: String,
    /// Bytes successfully captured before the failure.
    pub bytes_read: usize,
    /// The I/O error text.
    pub message: String,
}

impl StreamReadError {
    /// Creates a new stream read error.
    #[must_use]
    pub fn new(tag: impl Into<String>, bytes_read: usize, err: &std::io::Error) -> Self {
        Self {
            tag: tag.into(),
            bytes_read,
            message: err.to_string(),
        }
    }
}

/// Invalid stage or executor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was missing or empty.
    #[error("missing required field `{field}`")]
    MissingField {
        /// The field name.
        field: &'static str,
    },

    /// A field held an unusable value.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// The field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration could not be decoded.
    #[error("failed to decode stage configuration: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
