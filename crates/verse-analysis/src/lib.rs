//! Semantic analysis and step compilation for verse programs.
//!
//! ## Pipeline
//!
//! ```text
//! Project ──► Context ──► get_type / resolve ──► analyze ──► Diagnostics
//!                     └──► compile ──► Program (steps + plans)
//! ```
//!
//! A [`Project`] freezes the tree of every source plus the built-in
//! declarations. A [`Context`] analyzes one source: it memoizes types and
//! resolutions and guards type computation against cycles. Diagnostics
//! carry deferred [`Explanation`]s that render through [`Locales`].
//! [`compile`] lowers the source to the flat step lists the runtime walks.
//!
//! ## Modules
//!
//! - [`context`]: per-pass caches and cycle guard
//! - [`scope`], [`reference`], [`property`]: name and member resolution
//! - [`narrowing`]: flow-sensitive union narrowing
//! - `typing`: the per-kind type computation
//! - [`diagnostics`]: findings, explanations and locales
//! - [`dependencies`]: what each expression's value depends on
//! - [`compile`]: steps and programs
//! - [`queries`]: read-only editor queries

pub mod compile;
pub mod context;
pub mod definition;
pub mod dependencies;
pub mod diagnostics;
pub mod narrowing;
pub mod project;
pub mod property;
pub mod queries;
pub mod reference;
pub mod scope;
mod typing;

#[cfg(test)]
mod testing;

pub use compile::{Program, Step, StepKind, compile};
pub use context::Context;
pub use definition::Definition;
pub use dependencies::Dependency;
pub use diagnostics::{
    Argument, Conflicting, Diagnostic, DiagnosticKind, Diagnostics, Explanation, Locale, Locales,
    Severity, analyze,
};
pub use narrowing::Target;
pub use project::{Project, ProjectBuilder, Source};
