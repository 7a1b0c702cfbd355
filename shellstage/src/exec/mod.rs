//! Subprocess execution with concurrent output draining.
//!
//! - [`shell`] builds the `sh -c <literal>` invocation.
//! - [`stream`] drains one output pipe chunk by chunk.
//! - [`executor`] owns the spawn, drain, wait lifecycle behind the
//!   [`CommandRunner`] trait.
//! - [`report`] holds the per-call options and result.

pub mod executor;
pub mod report;
pub mod shell;
pub mod stream;

pub use executor::{CommandRunner, ShellExecutor};
pub use report::{ExecOptions, ExecutionReport, EXEC_TAG};
pub use shell::{normalize_directory, Shell};
pub use stream::{StreamCapture, StreamCollector, DEFAULT_CHUNK_SIZE};

#[cfg(test)]
pub use executor::MockCommandRunner;
