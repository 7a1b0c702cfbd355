//! # Shellstage
//!
//! Shell command stages for deployment and build pipelines.
//!
//! A [`CommandStage`](stages::CommandStage) runs one command literal through
//! `sh -c`, optionally guarded by an `only_if` precondition, and captures
//! standard output and standard error while the process runs:
//!
//! - **Condition gate**: the `only_if` literal must exit with status 0
//! - **Concurrent draining**: both pipes are read for the lifetime of the
//!   process, so chatty commands never deadlock on a full pipe buffer
//! - **Tagged outcomes**: skipped, succeeded and failed runs stay distinct
//! - **Bounded execution**: optional timeouts and cancellation tokens
//!
//! Sequencing stages, loading pipeline definitions and reporting are left
//! to the surrounding pipeline runner.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shellstage::prelude::*;
//!
//! let mut build = CommandStage::new("build")
//!     .with_directory("/srv/app")
//!     .with_only_if("test -f Makefile")
//!     .with_command("make release");
//!
//! let outcome = build.run().await;
//! if outcome.is_success() {
//!     println!("{}", build.stdout_result());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{CommandStageConfig, ExecutorConfig};
    pub use crate::core::{CapturedOutput, StageOutcome, StageStatus};
    pub use crate::errors::{ConfigError, ExecError, ShellStageError, StreamReadError};
    pub use crate::exec::{
        CommandRunner, ExecOptions, ExecutionReport, Shell, ShellExecutor, StreamCollector,
    };
    pub use crate::logging::{
        init_tracing, CollectingLogger, NoOpLogger, StageLogger, TracingLogger,
    };
    pub use crate::stages::{CommandStage, ConditionGate, GateVerdict, Stage};
}
