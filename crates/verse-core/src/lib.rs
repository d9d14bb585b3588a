//! Core data model for the verse language.
//!
//! ## Modules
//!
//! - [`tree`]: node arena ([`Tree`], [`TreeBuilder`], [`NodeKind`])
//! - [`types`]: semantic types ([`Type`], [`TypeSet`])
//! - [`value`]: runtime values ([`Value`], [`Exception`], [`Scope`])
//! - [`names`]: definition names and measurement units
//! - [`hash`]: deterministic identities for built-ins
//! - [`span`]: source locations
//! - [`error`]: shared error types

pub mod error;
pub mod hash;
pub mod names;
pub mod span;
pub mod tree;
pub mod types;
pub mod value;

pub use error::{ProjectError, RegistrationError, TreeError};
pub use hash::DefHash;
pub use names::{Names, Unit};
pub use span::Span;
pub use tree::{Ancestors, Node, NodeId, NodeKind, Tree, TreeBuilder};
pub use types::{Column, NativeTypeName, Type, TypeSet};
pub use value::{
    Exception, FunctionValue, NativeScope, Scope, StructureValue, TableValue, Value,
};
