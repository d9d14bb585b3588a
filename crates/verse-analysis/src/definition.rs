//! Anything a name can resolve to.

use verse_core::{Names, NodeId, NodeKind, Tree};
use verse_registry::{ConstantId, Global, StreamId};

use crate::project::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Definition {
    Bind(NodeId),
    Function(NodeId),
    Structure(NodeId),
    TypeVariable(NodeId),
    /// A built-in stream source.
    Stream(StreamId),
    /// A built-in constant.
    Value(ConstantId),
}

impl Definition {
    /// The definition declared by `node`, if it declares one.
    pub fn from_node(tree: &Tree, node: NodeId) -> Option<Self> {
        match tree.kind(node) {
            NodeKind::Bind { .. } => Some(Definition::Bind(node)),
            NodeKind::Function { .. } => Some(Definition::Function(node)),
            NodeKind::Structure { .. } => Some(Definition::Structure(node)),
            NodeKind::TypeVariable { .. } => Some(Definition::TypeVariable(node)),
            _ => None,
        }
    }

    pub fn from_global(global: Global) -> Self {
        match global {
            Global::Stream(id) => Definition::Stream(id),
            Global::Constant(id) => Definition::Value(id),
        }
    }

    /// The declaring node, for definitions that live in the tree.
    pub fn node(self) -> Option<NodeId> {
        match self {
            Definition::Bind(n)
            | Definition::Function(n)
            | Definition::Structure(n)
            | Definition::TypeVariable(n) => Some(n),
            Definition::Stream(_) | Definition::Value(_) => None,
        }
    }

    pub fn names(self, project: &Project) -> Names {
        match self {
            Definition::Stream(id) => project
                .registry()
                .stream(id)
                .map(|s| Names::one(s.name.as_str()))
                .unwrap_or_default(),
            Definition::Value(id) => project
                .registry()
                .constant(id)
                .map(|c| Names::one(c.name.as_str()))
                .unwrap_or_default(),
            _ => self
                .node()
                .and_then(|n| project.tree().kind(n).names().cloned())
                .unwrap_or_default(),
        }
    }

    pub fn has_name(self, project: &Project, name: &str) -> bool {
        self.names(project).contains(name)
    }

    pub fn is_type_variable(self) -> bool {
        matches!(self, Definition::TypeVariable(_))
    }
}
