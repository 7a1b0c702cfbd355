//! Stage logger trait and implementations.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a log emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose diagnostics such as command literals.
    Debug,
    /// Progress, including every drained output chunk.
    Info,
    /// Skipped stages.
    Warn,
    /// Execution and stream failures.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Leveled sink for stage and executor messages.
///
/// Implementations must never panic; the destination and formatting are
/// entirely up to the implementation.
pub trait StageLogger: Send + Sync + fmt::Debug {
    /// Emits a message at the given level.
    fn log(&self, level: LogLevel, message: &str);

    /// Emits a debug message.
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Emits an info message.
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Emits a warning.
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Emits an error.
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// A logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl StageLogger for NoOpLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// A logger that forwards to the `tracing` framework.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    /// Optional component name attached to every event.
    component: Option<String>,
}

impl TracingLogger {
    /// Creates a new tracing logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a component name to every emitted event.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }
}

impl StageLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        let component = self.component.as_deref().unwrap_or("shellstage");
        match level {
            LogLevel::Debug => tracing::debug!(component, "{}", message),
            LogLevel::Info => tracing::info!(component, "{}", message),
            LogLevel::Warn => tracing::warn!(component, "{}", message),
            LogLevel::Error => tracing::error!(component, "{}", message),
        }
    }
}

/// A single message captured by [`CollectingLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// The level the message was emitted at.
    pub level: LogLevel,
    /// The message text.
    pub message: String,
}

/// A logger that keeps every message in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingLogger {
    records: RwLock<Vec<LogRecord>>,
}

impl CollectingLogger {
    /// Creates a new collecting logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected records.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.read().clone()
    }

    /// Returns the messages emitted at `level`.
    #[must_use]
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.records
            .read()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    /// Returns messages starting with `prefix`, at any level.
    #[must_use]
    pub fn messages_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.records
            .read()
            .iter()
            .filter(|r| r.message.starts_with(prefix))
            .map(|r| r.message.clone())
            .collect()
    }

    /// Returns true if any message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.records.read().iter().any(|r| r.message.contains(needle))
    }

    /// Returns the number of collected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Clears all collected records.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl StageLogger for CollectingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.records.write().push(LogRecord {
            level,
            message: message.to_string(),
        });
    }
}
