//! Error types for engine operations.

use thiserror::Error;

use crate::scheduler::RunState;

/// Errors surfaced by the engine.
///
/// Structural problems (unknown ids, malformed buffers) abort a run before
/// any pixel is touched. Numeric edge cases inside a filter are recovered
/// locally and never show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The algorithm id is not registered.
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Zero dimensions or a channel length that does not match them.
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),

    /// Host supplied configuration or parameters could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The invocation observed its cancel token at a yield point.
    #[error("run cancelled after {processed} units")]
    Cancelled { processed: usize },

    /// The result was requested before the run completed.
    #[error("invocation not finished (state: {0:?})")]
    NotFinished(RunState),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
