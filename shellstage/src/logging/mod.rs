//! Logging capability injected into executors and stages.
//!
//! Components never call the global `tracing` macros for stage output
//! directly. They hold an `Arc<dyn StageLogger>` so tests can swap in a
//! [`CollectingLogger`] and inspect exactly what was emitted.

mod init;
mod sink;

pub use init::{init_json_tracing, init_tracing, DEFAULT_LOG_FILTER};
pub use sink::{CollectingLogger, LogLevel, LogRecord, NoOpLogger, StageLogger, TracingLogger};
