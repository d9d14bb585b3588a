//! Error types shared across the workspace.
//!
//! ```text
//! TreeError          - a builder produced an ill-formed node arena
//! RegistrationError  - a built-in definition could not be registered
//! ProjectError       - sources and built-ins could not be assembled
//! ```
//!
//! Analysis never fails: ill-formed programs are reported as diagnostics,
//! not errors. Runtime failures inside a program are exception values.

use thiserror::Error;

use crate::hash::DefHash;
use crate::tree::NodeId;

/// Errors raised when finishing a [`TreeBuilder`](crate::TreeBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A node names a child that was never added.
    #[error("node {parent} refers to missing child {child}")]
    DanglingChild { parent: NodeId, child: NodeId },

    /// Two nodes claim the same child.
    #[error("node {child} is a child of both {first} and {second}")]
    SharedChild {
        child: NodeId,
        first: NodeId,
        second: NodeId,
    },

    /// A node is not reachable from any root (it is part of an ownership cycle).
    #[error("node {node} is not reachable from a root")]
    Unreachable { node: NodeId },
}

/// Errors raised while registering built-in definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A built-in with this qualified name already exists.
    #[error("duplicate built-in: {name}")]
    Duplicate { name: String },

    /// A built-in stream or constant name is already taken.
    #[error("duplicate global: {name}")]
    DuplicateGlobal { name: String },

    /// A declaration refers to an implementation that was never registered.
    #[error("no implementation registered for {hash:?}")]
    MissingImplementation { hash: DefHash },
}

/// Errors raised while assembling a project.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectError {
    #[error("no source named '{name}'")]
    UnknownSource { name: String },

    #[error("a source named '{name}' already exists")]
    DuplicateSource { name: String },

    /// A source root has a parent, so it is part of another tree.
    #[error("source '{name}' is rooted at {node}, which is not a root")]
    NotARoot { name: String, node: NodeId },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}
