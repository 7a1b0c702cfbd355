//! Shell invocation for command literals.

use crate::config::ExecutorConfig;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Returns `"."` for an empty directory, otherwise the directory itself.
#[must_use]
pub fn normalize_directory(directory: &Path) -> &Path {
    if directory.as_os_str().is_empty() {
        Path::new(".")
    } else {
        directory
    }
}

/// The shell that interprets command literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    program: String,
    flag: String,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new("sh", "-c")
    }
}

impl Shell {
    /// Creates a shell from a program and the flag preceding the literal.
    #[must_use]
    pub fn new(program: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            flag: flag.into(),
        }
    }

    /// Creates the shell described by an executor configuration.
    #[must_use]
    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(config.shell.clone(), config.shell_flag.clone())
    }

    /// Returns the shell program.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Builds a command running `literal` in `directory`.
    ///
    /// Stdin is closed and both output streams are piped. The child is
    /// killed if its handle is dropped before it has been waited on.
    #[must_use]
    pub fn command(&self, literal: &str, directory: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        if !self.flag.is_empty() {
            cmd.arg(&self.flag);
        }
        cmd.arg(literal)
            .current_dir(normalize_directory(directory))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}
