//! Runtime error types.
//!
//! ```text
//! RuntimeError  - the evaluator was driven incorrectly or ran away
//! UnitError     - a unit could not be analyzed, compiled or run
//! ```
//!
//! Failures inside a program are not errors: they are [`Exception`]
//! values and travel through evaluation like any other value.
//!
//! [`Exception`]: verse_core::Exception

use thiserror::Error;

use verse_core::ProjectError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Resumed while no evaluation was suspended.
    #[error("no evaluation is in progress")]
    NoEvaluation,

    /// A value was emitted on a stream the project never registered.
    #[error("unknown stream {stream}")]
    UnknownStream { stream: u32 },

    #[error("evaluation exceeded the step limit of {limit}")]
    StepLimit { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
