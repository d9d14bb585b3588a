//! Declarations of built-in functions, streams and constants.
//!
//! A declaration describes a built-in before it is installed. Installing
//! turns a [`FunctionDecl`] into ordinary definition nodes (a `Function`
//! whose inputs are binds annotated with type literals and whose body is a
//! `Native` node), so analysis treats built-ins and program definitions
//! alike.
//!
//! ```
//! use verse_core::{NativeTypeName, Type, Value};
//! use verse_registry::FunctionDecl;
//!
//! let decl = FunctionDecl::new(NativeTypeName::Text, "length")
//!     .output(Type::number())
//!     .implement(|subject, _| match subject {
//!         Some(Value::Text(t)) => Value::number(t.chars().count() as f64),
//!         _ => Value::None,
//!     });
//! assert_eq!(decl.qualified_name(), "text.length");
//! ```

use verse_core::{DefHash, NativeTypeName, Type, Value};

/// Implementation of a built-in function: the subject it was resolved on
/// and the evaluated inputs, in declaration order.
pub type NativeFn = fn(Option<&Value>, &[Value]) -> Value;

/// A built-in function on the values of one native type family.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub(crate) on: NativeTypeName,
    pub(crate) name: String,
    pub(crate) inputs: Vec<(String, Type)>,
    pub(crate) output: Type,
    pub(crate) implementation: Option<NativeFn>,
}

impl FunctionDecl {
    pub fn new(on: NativeTypeName, name: &str) -> Self {
        Self {
            on,
            name: name.to_string(),
            inputs: Vec::new(),
            output: Type::None,
            implementation: None,
        }
    }

    /// Add a required input.
    pub fn input(mut self, name: &str, ty: Type) -> Self {
        self.inputs.push((name.to_string(), ty));
        self
    }

    pub fn output(mut self, ty: Type) -> Self {
        self.output = ty;
        self
    }

    pub fn implement(mut self, implementation: NativeFn) -> Self {
        self.implementation = Some(implementation);
        self
    }

    /// `family.name`, the name the built-in's [`DefHash`] is derived from.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.on.as_str(), self.name)
    }

    pub fn hash(&self) -> DefHash {
        DefHash::from_member(self.on.as_str(), &self.name)
    }
}

/// The built-in function name a prefix operator resolves to.
///
/// Prefix and infix operators share glyphs (`-`), so prefix operators are
/// registered under a word instead.
pub fn unary_function_name(operator: &str) -> Option<&'static str> {
    match operator {
        "-" => Some("negate"),
        "~" => Some("not"),
        _ => None,
    }
}

/// Identity of a registered stream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u32);

/// Identity of a registered constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstantId(pub u32);

/// An external source of values, such as a clock or the keyboard.
#[derive(Debug, Clone)]
pub struct StreamSource {
    pub id: StreamId,
    pub name: String,
    /// Type of each emitted value.
    pub item: Type,
}

impl StreamSource {
    /// The declared type of the source itself.
    pub fn ty(&self) -> Type {
        Type::stream(self.item.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Constant {
    pub id: ConstantId,
    pub name: String,
    pub value: Value,
}

/// A built-in name visible everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Global {
    Stream(StreamId),
    Constant(ConstantId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_follows_qualified_name() {
        let decl = FunctionDecl::new(NativeTypeName::Measurement, "+");
        assert_eq!(decl.hash(), DefHash::from_name("measurement.+"));
    }

    #[test]
    fn stream_type_wraps_item() {
        let source = StreamSource {
            id: StreamId(0),
            name: "Time".into(),
            item: Type::measurement("ms"),
        };
        assert_eq!(source.ty(), Type::stream(Type::measurement("ms")));
    }
}
