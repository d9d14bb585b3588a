//! Semantic types.
//!
//! [`Type`] is a closed set of variants compared structurally through
//! [`Type::accepts`] and [`Type::accepts_all`]. Unions are kept flat and
//! deduplicated; [`TypeSet`] enumerates the members of a union during
//! flow-sensitive narrowing.
//!
//! Some variants are recovery values rather than types a program can
//! declare: [`Type::Unknown`], [`Type::UnknownName`] (a reference that did
//! not resolve), [`Type::Cycle`] (a type that depends on itself) and
//! [`Type::Placeholder`]. None of them accepts anything, and no type accepts
//! them.

use std::fmt;

use crate::names::Unit;
use crate::tree::NodeId;

/// A column of a table type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    pub name: String,
    pub ty: Type,
    /// The bind declaring this column, when it was declared in a tree.
    pub bind: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Accepts every type.
    Any,
    /// The empty set of types.
    Never,
    Boolean,
    None,
    /// Text, optionally restricted to one specific literal.
    Text(Option<String>),
    Measurement(Unit),
    List(Box<Type>),
    Table(Vec<Column>),
    /// A nominal structure type with bindings for its type variables.
    Structure {
        definition: NodeId,
        type_inputs: Vec<(NodeId, Type)>,
    },
    Function { definition: NodeId },
    Stream(Box<Type>),
    /// Flat, deduplicated, at least two members.
    Union(Vec<Type>),
    TypeVariable(NodeId),
    Unknown,
    UnknownName {
        node: NodeId,
        name: Option<String>,
        subject: Option<Box<Type>>,
    },
    /// A type whose computation depends on itself. `stack` lists the nodes
    /// from the first occurrence of `node` to the point the cycle closed.
    Cycle { node: NodeId, stack: Vec<NodeId> },
    Placeholder(NodeId),
}

/// Names of the native type families, used to find built-in definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeTypeName {
    Boolean,
    None,
    Text,
    Measurement,
    List,
    Table,
}

impl NativeTypeName {
    pub fn as_str(self) -> &'static str {
        match self {
            NativeTypeName::Boolean => "boolean",
            NativeTypeName::None => "none",
            NativeTypeName::Text => "text",
            NativeTypeName::Measurement => "measurement",
            NativeTypeName::List => "list",
            NativeTypeName::Table => "table",
        }
    }
}

impl Type {
    pub fn text() -> Self {
        Type::Text(None)
    }

    pub fn number() -> Self {
        Type::Measurement(Unit::unitless())
    }

    pub fn measurement(unit: &str) -> Self {
        Type::Measurement(Unit::new(unit))
    }

    pub fn stream(item: Type) -> Self {
        Type::Stream(Box::new(item))
    }

    pub fn list(item: Type) -> Self {
        Type::List(Box::new(item))
    }

    /// Build the union of `types`, flattening nested unions and removing duplicates.
    pub fn union<I: IntoIterator<Item = Type>>(types: I) -> Type {
        Type::possible_union(&TypeSet::new(types))
    }

    /// The type describing exactly the members of `set`.
    ///
    /// Empty sets are [`Type::Never`], singletons are the member itself.
    pub fn possible_union(set: &TypeSet) -> Type {
        match set.list() {
            [] => Type::Never,
            [only] => only.clone(),
            many => Type::Union(many.to_vec()),
        }
    }

    /// The candidate types of this type: the members of a union, or itself.
    pub fn type_set(&self) -> TypeSet {
        TypeSet::new([self.clone()])
    }

    /// The element type of a stream, or this type if it is not a stream.
    pub fn unwrap_stream(&self) -> &Type {
        match self {
            Type::Stream(item) => item,
            other => other,
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Type::Union(_))
    }

    /// Whether this is one of the recovery values produced by analysis.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            Type::Unknown | Type::UnknownName { .. } | Type::Cycle { .. } | Type::Placeholder(_)
        )
    }

    /// The family of built-in definitions available on values of this type.
    pub fn native_name(&self) -> Option<NativeTypeName> {
        match self {
            Type::Boolean => Some(NativeTypeName::Boolean),
            Type::None => Some(NativeTypeName::None),
            Type::Text(_) => Some(NativeTypeName::Text),
            Type::Measurement(_) => Some(NativeTypeName::Measurement),
            Type::List(_) => Some(NativeTypeName::List),
            Type::Table(_) => Some(NativeTypeName::Table),
            _ => None,
        }
    }

    /// The columns of a table type; empty for every other type.
    pub fn columns(&self) -> &[Column] {
        match self {
            Type::Table(columns) => columns,
            _ => &[],
        }
    }

    /// Find a column of a table type by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        match self {
            Type::Table(columns) => columns.iter().find(|c| c.name == name),
            _ => None,
        }
    }

    /// Whether a value of type `other` may be used where `self` is expected.
    pub fn accepts(&self, other: &Type) -> bool {
        if let Type::Union(members) = other {
            return members.iter().all(|m| self.accepts(m));
        }
        match (self, other) {
            (Type::Any, _) => !other.is_unresolved(),
            (Type::Union(members), _) => members.iter().any(|m| m.accepts(other)),
            (_, Type::Never) => !self.is_unresolved(),
            (Type::Boolean, Type::Boolean) | (Type::None, Type::None) => true,
            (Type::Text(None), Type::Text(_)) => true,
            (Type::Text(Some(a)), Type::Text(Some(b))) => a == b,
            (Type::Measurement(a), Type::Measurement(b)) => a == b,
            (Type::List(a), Type::List(b)) => a.accepts(b),
            (Type::Stream(a), Type::Stream(b)) => a.accepts(b),
            (Type::Table(expected), Type::Table(given)) => expected.iter().all(|column| {
                given
                    .iter()
                    .any(|g| g.name == column.name && column.ty.accepts(&g.ty))
            }),
            (
                Type::Structure {
                    definition: a,
                    type_inputs: ai,
                },
                Type::Structure {
                    definition: b,
                    type_inputs: bi,
                },
            ) => {
                a == b
                    && ai.iter().all(|(var, ty)| {
                        bi.iter()
                            .find(|(v, _)| v == var)
                            .is_none_or(|(_, given)| ty.accepts(given))
                    })
            }
            (Type::Function { definition: a }, Type::Function { definition: b }) => a == b,
            (Type::TypeVariable(a), Type::TypeVariable(b)) => a == b,
            _ => false,
        }
    }

    /// Whether every candidate in `types` is accepted.
    pub fn accepts_all(&self, types: &TypeSet) -> bool {
        types.list().iter().all(|t| self.accepts(t))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("*"),
            Type::Never => f.write_str("∅"),
            Type::Boolean => f.write_str("?"),
            Type::None => f.write_str("ø"),
            Type::Text(None) => f.write_str("''"),
            Type::Text(Some(text)) => write!(f, "'{text}'"),
            Type::Measurement(unit) => write!(f, "#{unit}"),
            Type::List(item) => write!(f, "[{item}]"),
            Type::Table(columns) => {
                f.write_str("⎡")?;
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}•{}", column.name, column.ty)?;
                }
                f.write_str("⎦")
            }
            Type::Structure { definition, .. } => write!(f, "structure {definition}"),
            Type::Function { definition } => write!(f, "ƒ {definition}"),
            Type::Stream(item) => write!(f, "…{item}"),
            Type::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            Type::TypeVariable(node) => write!(f, "type variable {node}"),
            Type::Unknown => f.write_str("unknown"),
            Type::UnknownName { name, .. } => {
                write!(f, "unknown name '{}'", name.as_deref().unwrap_or("_"))
            }
            Type::Cycle { node, .. } => write!(f, "cycle at {node}"),
            Type::Placeholder(_) => f.write_str("_"),
        }
    }
}

// ============================================================================
// TypeSet
// ============================================================================

/// An ordered, duplicate-free set of candidate types.
///
/// Building a set flattens unions, so a set never contains a union member.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeSet(Vec<Type>);

impl TypeSet {
    pub fn new<I: IntoIterator<Item = Type>>(types: I) -> Self {
        let mut set = TypeSet(Vec::new());
        for ty in types {
            set.insert(ty);
        }
        set
    }

    fn insert(&mut self, ty: Type) {
        match ty {
            Type::Union(members) => {
                for member in members {
                    self.insert(member);
                }
            }
            Type::Never => {}
            other => {
                if !self.0.contains(&other) {
                    self.0.push(other);
                }
            }
        }
    }

    pub fn list(&self) -> &[Type] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, ty: &Type) -> bool {
        self.0.contains(ty)
    }

    /// Members accepted by `ty`.
    pub fn accepted_by(&self, ty: &Type) -> TypeSet {
        TypeSet(self.0.iter().filter(|t| ty.accepts(t)).cloned().collect())
    }

    /// Members not accepted by `ty`.
    pub fn rejected_by(&self, ty: &Type) -> TypeSet {
        TypeSet(self.0.iter().filter(|t| !ty.accepts(t)).cloned().collect())
    }

    pub fn is_subset_of(&self, other: &TypeSet) -> bool {
        self.0.iter().all(|t| other.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_flattens_and_dedups() {
        let ty = Type::union([
            Type::number(),
            Type::union([Type::text(), Type::number()]),
            Type::None,
        ]);
        assert_eq!(ty, Type::Union(vec![Type::number(), Type::text(), Type::None]));
    }

    #[test]
    fn singleton_union_collapses() {
        assert_eq!(Type::union([Type::Boolean, Type::Boolean]), Type::Boolean);
        assert_eq!(Type::union([]), Type::Never);
    }

    #[test]
    fn text_acceptance() {
        let specific = Type::Text(Some("hi".into()));
        assert!(Type::text().accepts(&specific));
        assert!(!specific.accepts(&Type::text()));
        assert!(specific.accepts(&specific.clone()));
    }

    #[test]
    fn measurement_units_must_match() {
        assert!(Type::measurement("m").accepts(&Type::measurement("m")));
        assert!(!Type::measurement("m").accepts(&Type::number()));
    }

    #[test]
    fn union_acceptance() {
        let union = Type::union([Type::number(), Type::text()]);
        assert!(union.accepts(&Type::number()));
        assert!(!union.accepts(&Type::Boolean));
        assert!(!Type::number().accepts(&union));
        assert!(union.accepts(&Type::union([Type::text(), Type::number()])));
    }

    #[test]
    fn recovery_types_accept_nothing() {
        let cycle = Type::Cycle {
            node: dummy(),
            stack: vec![],
        };
        assert!(!cycle.accepts(&Type::number()));
        assert!(!Type::Any.accepts(&cycle));
    }

    #[test]
    fn accepts_all_members() {
        let set = TypeSet::new([Type::number(), Type::text()]);
        assert!(Type::union([Type::text(), Type::number(), Type::None]).accepts_all(&set));
        assert!(!Type::number().accepts_all(&set));
    }

    #[test]
    fn partition() {
        let set = TypeSet::new([Type::number(), Type::text(), Type::None]);
        assert_eq!(set.accepted_by(&Type::number()).list(), &[Type::number()]);
        assert_eq!(
            set.rejected_by(&Type::number()).list(),
            &[Type::text(), Type::None]
        );
        assert!(set.rejected_by(&Type::number()).is_subset_of(&set));
    }

    #[test]
    fn display_glyphs() {
        let table = Type::Table(vec![Column {
            name: "one".into(),
            ty: Type::number(),
            bind: None,
        }]);
        assert_eq!(table.to_string(), "⎡one•#⎦");
        assert_eq!(Type::union([Type::text(), Type::None]).to_string(), "''|ø");
        assert_eq!(Type::stream(Type::measurement("ms")).to_string(), "…#ms");
    }

    fn dummy() -> NodeId {
        let mut b = crate::TreeBuilder::new();
        b.none()
    }
}
