//! Cooperative cancellation for stage execution.

mod token;

pub use token::CancellationToken;
