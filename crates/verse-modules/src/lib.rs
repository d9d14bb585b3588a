//! Standard library for the verse language.
//!
//! - **text** - length, concatenation, equality, `repeat`
//! - **measurement** - arithmetic, comparison and negation on measurements
//! - **boolean** - `&`, `|`, `~` and equality
//! - **collections** - list length and equality on lists and none
//! - **globals** - the `Time` and `Key` streams and the `π` constant
//!
//! # Usage
//!
//! ```
//! use verse_core::{NativeTypeName, TreeBuilder};
//! use verse_registry::NativeRegistry;
//!
//! let mut builder = TreeBuilder::new();
//! let mut registry = NativeRegistry::new();
//! verse_modules::install(&mut registry, &mut builder).unwrap();
//!
//! assert!(registry.function(NativeTypeName::Text, "length").is_some());
//! assert!(registry.global("Time").is_some());
//! ```

pub mod boolean;
pub mod collections;
pub mod globals;
pub mod measurement;
pub mod text;

use verse_core::{Exception, RegistrationError, TreeBuilder, Value};
use verse_registry::NativeRegistry;

/// Install every standard module.
pub fn install(
    registry: &mut NativeRegistry,
    builder: &mut TreeBuilder,
) -> Result<(), RegistrationError> {
    text::install(registry, builder)?;
    measurement::install(registry, builder)?;
    boolean::install(registry, builder)?;
    collections::install(registry, builder)?;
    globals::install(registry)?;
    Ok(())
}

/// A type exception for a built-in that received the wrong kind of value.
pub(crate) fn mismatch(expected: &str, received: Option<&Value>) -> Value {
    Value::Exception(Exception::Type {
        expected: expected.to_string(),
        received: received.map_or_else(|| "nothing".to_string(), |v| v.get_type().to_string()),
    })
}
