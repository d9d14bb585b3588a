//! Built-in definitions for the verse language.
//!
//! [`NativeRegistry`] stores built-in functions (declared as tree nodes),
//! stream sources and constants. Standard definitions are installed by the
//! `verse-modules` crate.

mod declaration;
mod registry;

pub use declaration::{
    Constant, ConstantId, FunctionDecl, Global, NativeFn, StreamId, StreamSource,
    unary_function_name,
};
pub use registry::{NativeFunction, NativeRegistry};
