//! Runtime values.
//!
//! The analysis layer treats values as opaque: it only needs
//! [`Value::resolve`] (find a named member) and [`Value::get_type`]. Runtime
//! failures are values too: an [`Exception`] travels through evaluation like
//! any other result instead of aborting it.

use std::fmt;
use std::rc::Rc;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::names::{Names, Unit};
use crate::tree::NodeId;
use crate::types::{Column, NativeTypeName, Type};

/// Lookup of built-in definitions by native type family.
///
/// Implemented by the native registry; values use it to resolve members
/// such as `length` on text.
pub trait NativeScope {
    /// The definition node of the built-in `name` on values of family `on`.
    fn native_function(&self, on: NativeTypeName, name: &str) -> Option<NodeId>;
}

/// A recoverable runtime failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Exception {
    #[error("unknown name '{name}'")]
    Name { name: String },

    #[error("expected {expected}, received {received}")]
    Type { expected: String, received: String },

    #[error("'{name}' is not a function")]
    NotAFunction { name: String },

    #[error("missing input '{input}'")]
    MissingInput { input: String },

    #[error("no operator '{operator}' on {on}")]
    UnknownOperator { operator: String, on: String },

    #[error("evaluated a placeholder")]
    Placeholder,

    #[error("{message}")]
    Value { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableValue {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl TableValue {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureValue {
    pub definition: NodeId,
    pub name: String,
    pub fields: Vec<(Names, Value)>,
}

/// A function or structure definition closed over the scope it was created in.
#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub definition: NodeId,
    /// The value a built-in or member function was resolved on.
    pub subject: Option<Value>,
    pub closure: Option<Rc<Scope>>,
}

impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition && self.subject == other.subject
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Boolean(bool),
    Text(String),
    Measurement { amount: OrderedFloat<f64>, unit: Unit },
    List(Rc<Vec<Value>>),
    Table(Rc<TableValue>),
    Structure(Rc<StructureValue>),
    Function(Rc<FunctionValue>),
    Exception(Exception),
}

impl Value {
    pub fn number(amount: f64) -> Self {
        Value::Measurement {
            amount: OrderedFloat(amount),
            unit: Unit::unitless(),
        }
    }

    pub fn measurement(amount: f64, unit: &str) -> Self {
        Value::Measurement {
            amount: OrderedFloat(amount),
            unit: Unit::new(unit),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Measurement { amount, .. } => Some(amount.0),
            _ => None,
        }
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, Value::Exception(_))
    }

    /// The runtime type of this value.
    pub fn get_type(&self) -> Type {
        match self {
            Value::None => Type::None,
            Value::Boolean(_) => Type::Boolean,
            Value::Text(_) => Type::text(),
            Value::Measurement { unit, .. } => Type::Measurement(unit.clone()),
            Value::List(items) => Type::list(Type::union(items.iter().map(Value::get_type))),
            Value::Table(table) => Type::Table(table.columns.clone()),
            Value::Structure(structure) => Type::Structure {
                definition: structure.definition,
                type_inputs: Vec::new(),
            },
            Value::Function(function) => Type::Function {
                definition: function.definition,
            },
            Value::Exception(_) => Type::Unknown,
        }
    }

    /// Find the member `name` on this value.
    ///
    /// Structures answer with their fields; other values with the built-in
    /// function of that name, bound to this value as its subject.
    pub fn resolve(&self, name: &str, natives: &dyn NativeScope) -> Option<Value> {
        if let Value::Structure(structure) = self {
            return structure
                .fields
                .iter()
                .find(|(names, _)| names.contains(name))
                .map(|(_, value)| value.clone());
        }
        let family = self.get_type().native_name()?;
        let definition = natives.native_function(family, name)?;
        Some(Value::Function(Rc::new(FunctionValue {
            definition,
            subject: Some(self.clone()),
            closure: None,
        })))
    }
}

impl From<Exception> for Value {
    fn from(exception: Exception) -> Self {
        Value::Exception(exception)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("ø"),
            Value::Boolean(true) => f.write_str("⊤"),
            Value::Boolean(false) => f.write_str("⊥"),
            Value::Text(text) => write!(f, "'{text}'"),
            Value::Measurement { amount, unit } => write!(f, "{}{unit}", amount.0),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Table(table) => {
                write!(f, "{}", Type::Table(table.columns.clone()))?;
                for row in &table.rows {
                    f.write_str("⎡")?;
                    for (i, cell) in row.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        write!(f, "{cell}")?;
                    }
                    f.write_str("⎦")?;
                }
                Ok(())
            }
            Value::Structure(structure) => {
                write!(f, "{}(", structure.name)?;
                for (i, (_, value)) in structure.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
            Value::Function(function) => write!(f, "ƒ {}", function.definition),
            Value::Exception(exception) => write!(f, "!{exception}"),
        }
    }
}

// ============================================================================
// Scope
// ============================================================================

/// Name bindings visible to an evaluation, chained to the enclosing scope.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    values: FxHashMap<String, Value>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn new(parent: Option<Rc<Scope>>) -> Self {
        Self {
            values: FxHashMap::default(),
            parent,
        }
    }

    /// Bind every name in `names` to `value`.
    pub fn bind(&mut self, names: &Names, value: Value) {
        for name in names.iter() {
            self.values.insert(name.to_string(), value.clone());
        }
    }

    pub fn bind_name(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up here, then in enclosing scopes.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.values.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_deref().and_then(|p| p.get(name)),
        }
    }

    /// Copy the bindings of `other` into this scope, replacing existing ones.
    pub fn absorb(&mut self, other: &Scope) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoNatives;

    impl NativeScope for NoNatives {
        fn native_function(&self, _: NativeTypeName, _: &str) -> Option<NodeId> {
            None
        }
    }

    #[test]
    fn runtime_types() {
        assert_eq!(Value::number(1.0).get_type(), Type::number());
        assert_eq!(Value::measurement(2.0, "m").get_type(), Type::measurement("m"));
        assert_eq!(
            Value::list(vec![Value::number(1.0), Value::text("a")]).get_type(),
            Type::list(Type::union([Type::number(), Type::text()]))
        );
        assert_eq!(Value::from(Exception::Placeholder).get_type(), Type::Unknown);
    }

    #[test]
    fn structure_fields_resolve_by_any_name() {
        let mut b = crate::TreeBuilder::new();
        let definition = b.none();
        let value = Value::Structure(Rc::new(StructureValue {
            definition,
            name: "Point".into(),
            fields: vec![(Names::new(["x", "ex"]), Value::number(3.0))],
        }));
        assert_eq!(value.resolve("ex", &NoNatives), Some(Value::number(3.0)));
        assert_eq!(value.resolve("y", &NoNatives), None);
    }

    #[test]
    fn scope_chain() {
        let mut outer = Scope::new(None);
        outer.bind_name("a", Value::number(1.0));
        let mut inner = Scope::new(Some(Rc::new(outer)));
        inner.bind_name("b", Value::number(2.0));
        assert_eq!(inner.get("a"), Some(&Value::number(1.0)));
        assert_eq!(inner.get("b"), Some(&Value::number(2.0)));
        assert_eq!(inner.get("c"), None);
    }

    #[test]
    fn display() {
        assert_eq!(Value::measurement(5.0, "m").to_string(), "5m");
        assert_eq!(Value::Boolean(true).to_string(), "⊤");
        assert_eq!(
            Value::from(Exception::Name { name: "x".into() }).to_string(),
            "!unknown name 'x'"
        );
    }
}
