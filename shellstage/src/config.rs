//! Configuration types for command stages and the shell executor.
//!
//! Field names follow the pipeline definition attributes (`command`,
//! `directory`, `only_if`). Reading those definitions from files is the
//! pipeline runner's job; this module only describes and validates them.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a single command stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandStageConfig {
    /// Stage name, used in log messages.
    pub name: String,
    /// Shell text run as the main command.
    pub command: String,
    /// Working directory for both the condition and the command.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Shell text that must exit with status 0 for the command to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_if: Option<String>,
    /// Optional deadline for each subprocess, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<f64>,
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

impl CommandStageConfig {
    /// Creates a configuration with the default directory and no condition.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            directory: default_directory(),
            only_if: None,
            timeout_seconds: None,
        }
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Sets the condition literal.
    #[must_use]
    pub fn with_only_if(mut self, only_if: impl Into<String>) -> Self {
        self.only_if = Some(only_if.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Decodes and validates a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or validation fails.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or command is blank, or the timeout is
    /// not a positive finite number.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "name" });
        }
        if self.command.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "command" });
        }
        if let Some(seconds) = self.timeout_seconds {
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(ConfigError::invalid(
                    "timeout_seconds",
                    format!("expected a positive number of seconds, got {seconds}"),
                ));
            }
        }
        Ok(())
    }

    /// Gets the timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs_f64)
    }
}

/// Configuration for the shell executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Shell program used to interpret command literals.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Flag passed to the shell before the literal.
    #[serde(default = "default_shell_flag")]
    pub shell_flag: String,
    /// Size of each read from an output stream, in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// How long drains may keep reading after an interrupted process is killed.
    #[serde(default = "default_drain_grace")]
    pub drain_grace_seconds: f64,
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_shell_flag() -> String {
    "-c".to_string()
}

fn default_chunk_size() -> usize {
    1024
}

fn default_drain_grace() -> f64 {
    5.0
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            shell_flag: default_shell_flag(),
            chunk_size: default_chunk_size(),
            drain_grace_seconds: default_drain_grace(),
        }
    }
}

impl ExecutorConfig {
    /// Creates a new executor configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the shell program and flag.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>, flag: impl Into<String>) -> Self {
        self.shell = shell.into();
        self.shell_flag = flag.into();
        self
    }

    /// Sets the read chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the drain grace period.
    #[must_use]
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace_seconds = grace.as_secs_f64();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell is blank, the chunk size is zero, or the
    /// grace period is negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shell.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "shell" });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::invalid("chunk_size", "must be at least 1"));
        }
        if !self.drain_grace_seconds.is_finite() || self.drain_grace_seconds < 0.0 {
            return Err(ConfigError::invalid(
                "drain_grace_seconds",
                "must be a non-negative number of seconds",
            ));
        }
        Ok(())
    }

    /// Gets the drain grace period as a Duration.
    #[must_use]
    pub fn drain_grace(&self) -> Duration {
        Duration::from_secs_f64(self.drain_grace_seconds.max(0.0))
    }
}
