//! Runtime for the verse language.
//!
//! Programs are analyzed and compiled by `verse-analysis`; this crate runs
//! them.
//!
//! - [`Evaluator`]: walks compiled steps, suspends on streams that have not
//!   emitted and re-evaluates when a stream the program reads emits
//! - [`Interpreter`]: evaluates the tree directly, for checking the
//!   evaluator against
//! - [`Unit`]: analyze, compile and evaluate one source of a project
//!
//! Runtime failures inside a program are [`Exception`] values, never
//! errors; [`RuntimeError`] only reports misuse of the evaluator.
//!
//! [`Exception`]: verse_core::Exception

mod config;
mod error;
mod evaluator;
mod frame;
mod handlers;
mod interpreter;
mod streams;
mod unit;

pub use config::EvaluatorConfig;
pub use error::{Result, RuntimeError, UnitError};
pub use evaluator::{Evaluator, EvaluatorState};
pub use frame::Frame;
pub use interpreter::Interpreter;
pub use streams::StreamState;
pub use unit::Unit;
