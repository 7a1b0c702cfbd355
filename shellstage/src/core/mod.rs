//! Core domain model types for shell stages.
//!
//! This module contains:
//! - The stage lifecycle status
//! - The tagged outcome returned from a stage run
//! - Captured process output

mod captured;
mod outcome;
mod status;

pub use captured::CapturedOutput;
pub use outcome::StageOutcome;
pub use status::StageStatus;
