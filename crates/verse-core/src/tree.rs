//! Node arena for parsed programs.
//!
//! Every node of every source (and of the built-in definitions) lives in a
//! single [`Tree`] and is addressed by a stable [`NodeId`]. Children are
//! owned exclusively by their parent; the parent back-references computed by
//! [`TreeBuilder::finish`] exist only for lookup. A finished tree is
//! immutable: edits build new nodes, they never mutate existing ones.
//!
//! # Example
//!
//! ```
//! use verse_core::TreeBuilder;
//!
//! let mut b = TreeBuilder::new();
//! let one = b.number(1.0);
//! let x = b.bind("x", None, Some(one));
//! let r = b.reference("x");
//! let root = b.block(vec![x, r]);
//! let tree = b.finish().unwrap();
//!
//! assert_eq!(tree.parent(r), Some(root));
//! assert!(tree.contains(root, one));
//! ```

use std::fmt;

use ordered_float::OrderedFloat;

use crate::error::TreeError;
use crate::hash::DefHash;
use crate::names::{Names, Unit};
use crate::span::Span;
use crate::types::Type;

/// Stable identity of a node in a [`Tree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // =========================================================================
    // Definitions and structure
    // =========================================================================
    /// A sequence of statements; the value of the last one is the block's value.
    Block { statements: Vec<NodeId> },
    /// A named value with an optional declared type and optional value.
    Bind {
        names: Names,
        ty: Option<NodeId>,
        value: Option<NodeId>,
    },
    Function {
        names: Names,
        type_variables: Vec<NodeId>,
        inputs: Vec<NodeId>,
        output: Option<NodeId>,
        body: Option<NodeId>,
    },
    Structure {
        names: Names,
        type_variables: Vec<NodeId>,
        inputs: Vec<NodeId>,
        members: Vec<NodeId>,
    },
    TypeVariable { names: Names },

    // =========================================================================
    // Expressions
    // =========================================================================
    Reference { name: String },
    Property {
        subject: NodeId,
        name: Option<String>,
    },
    Evaluate {
        fun: NodeId,
        type_inputs: Vec<NodeId>,
        inputs: Vec<NodeId>,
    },
    Binary {
        operator: String,
        left: NodeId,
        right: NodeId,
    },
    Unary { operator: String, operand: NodeId },
    Conditional {
        condition: NodeId,
        yes: NodeId,
        no: NodeId,
    },
    /// Type test: `expression • type`.
    Is { expression: NodeId, ty: NodeId },
    /// `initial … condition … next`: a value that reacts to stream changes.
    Reaction {
        initial: NodeId,
        condition: NodeId,
        next: NodeId,
    },
    /// `∆ stream`: whether the given stream caused the current evaluation.
    Changed { stream: NodeId },
    /// `← stream index`: a past value of a stream.
    Previous { stream: NodeId, index: NodeId },
    Measurement {
        value: OrderedFloat<f64>,
        unit: Unit,
    },
    Text { text: String },
    Boolean { value: bool },
    None,
    List { items: Vec<NodeId> },
    /// Table literal: header binds followed by rows of cells.
    Table {
        columns: Vec<NodeId>,
        rows: Vec<NodeId>,
    },
    Row { cells: Vec<NodeId> },
    /// `table ⎡? row query`: rows matching the query, restricted to the named columns.
    Select {
        table: NodeId,
        row: NodeId,
        query: NodeId,
    },
    Placeholder { ty: Option<NodeId> },
    /// The body of a built-in function.
    Native { function: DefHash },

    // =========================================================================
    // Type annotations
    // =========================================================================
    NameType {
        name: String,
        type_inputs: Vec<NodeId>,
    },
    BooleanType,
    NoneType,
    TextType { text: Option<String> },
    MeasurementType { unit: Unit },
    ListType { item: NodeId },
    UnionType { left: NodeId, right: NodeId },
    StreamType { item: NodeId },
    TableType { columns: Vec<NodeId> },
    TypePlaceholder,
    /// A fixed semantic type, used by built-in declarations.
    TypeLiteral { ty: Type },
}

impl NodeKind {
    /// Children in declaration (and evaluation) order.
    pub fn children(&self) -> Vec<NodeId> {
        use NodeKind::*;
        let mut out = Vec::new();
        match self {
            Block { statements } => out.extend(statements),
            Bind { ty, value, .. } => {
                out.extend(ty);
                out.extend(value);
            }
            Function {
                type_variables,
                inputs,
                output,
                body,
                ..
            } => {
                out.extend(type_variables);
                out.extend(inputs);
                out.extend(output);
                out.extend(body);
            }
            Structure {
                type_variables,
                inputs,
                members,
                ..
            } => {
                out.extend(type_variables);
                out.extend(inputs);
                out.extend(members);
            }
            Property { subject, .. } => out.push(*subject),
            Evaluate {
                fun,
                type_inputs,
                inputs,
            } => {
                out.push(*fun);
                out.extend(type_inputs);
                out.extend(inputs);
            }
            Binary { left, right, .. } => out.extend([*left, *right]),
            Unary { operand, .. } => out.push(*operand),
            Conditional {
                condition,
                yes,
                no,
            } => out.extend([*condition, *yes, *no]),
            Is { expression, ty } => out.extend([*expression, *ty]),
            Reaction {
                initial,
                condition,
                next,
            } => out.extend([*initial, *condition, *next]),
            Changed { stream } => out.push(*stream),
            Previous { stream, index } => out.extend([*stream, *index]),
            List { items } => out.extend(items),
            Table { columns, rows } => {
                out.extend(columns);
                out.extend(rows);
            }
            Row { cells } => out.extend(cells),
            Select { table, row, query } => out.extend([*table, *row, *query]),
            Placeholder { ty } => out.extend(ty),
            NameType { type_inputs, .. } => out.extend(type_inputs),
            ListType { item } | StreamType { item } => out.push(*item),
            UnionType { left, right } => out.extend([*left, *right]),
            TableType { columns } => out.extend(columns),
            TypeVariable { .. }
            | Reference { .. }
            | Measurement { .. }
            | Text { .. }
            | Boolean { .. }
            | None
            | Native { .. }
            | BooleanType
            | NoneType
            | TextType { .. }
            | MeasurementType { .. }
            | TypePlaceholder
            | TypeLiteral { .. } => {}
        }
        out
    }

    /// Whether this node is a type annotation.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            NodeKind::NameType { .. }
                | NodeKind::BooleanType
                | NodeKind::NoneType
                | NodeKind::TextType { .. }
                | NodeKind::MeasurementType { .. }
                | NodeKind::ListType { .. }
                | NodeKind::UnionType { .. }
                | NodeKind::StreamType { .. }
                | NodeKind::TableType { .. }
                | NodeKind::TypePlaceholder
                | NodeKind::TypeLiteral { .. }
        )
    }

    /// Whether this node produces a runtime value.
    pub fn is_expression(&self) -> bool {
        !self.is_type() && !matches!(self, NodeKind::TypeVariable { .. } | NodeKind::Row { .. })
    }

    /// Names declared by this node, if it is a definition.
    pub fn names(&self) -> Option<&Names> {
        match self {
            NodeKind::Bind { names, .. }
            | NodeKind::Function { names, .. }
            | NodeKind::Structure { names, .. }
            | NodeKind::TypeVariable { names } => Some(names),
            _ => None,
        }
    }

    /// A short, stable label for logging and debugging.
    pub fn label(&self) -> &'static str {
        use NodeKind::*;
        match self {
            Block { .. } => "block",
            Bind { .. } => "bind",
            Function { .. } => "function",
            Structure { .. } => "structure",
            TypeVariable { .. } => "type variable",
            Reference { .. } => "reference",
            Property { .. } => "property",
            Evaluate { .. } => "evaluate",
            Binary { .. } => "binary",
            Unary { .. } => "unary",
            Conditional { .. } => "conditional",
            Is { .. } => "is",
            Reaction { .. } => "reaction",
            Changed { .. } => "changed",
            Previous { .. } => "previous",
            Measurement { .. } => "measurement",
            Text { .. } => "text",
            Boolean { .. } => "boolean",
            None => "none",
            List { .. } => "list",
            Table { .. } => "table",
            Row { .. } => "row",
            Select { .. } => "select",
            Placeholder { .. } => "placeholder",
            Native { .. } => "native",
            NameType { .. } => "name type",
            BooleanType => "boolean type",
            NoneType => "none type",
            TextType { .. } => "text type",
            MeasurementType { .. } => "measurement type",
            ListType { .. } => "list type",
            UnionType { .. } => "union type",
            StreamType { .. } => "stream type",
            TableType { .. } => "table type",
            TypePlaceholder => "type placeholder",
            TypeLiteral { .. } => "type literal",
        }
    }
}

/// A node: its kind and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

// ============================================================================
// Tree
// ============================================================================

/// An immutable arena of nodes with parent back-references.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    parents: Vec<Option<NodeId>>,
}

impl Tree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by id, if it belongs to this tree.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// The kind of a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by the builder of this tree.
    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    #[inline]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id.index()).copied().flatten()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Ancestors from the immediate parent outward to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// The root of the tree containing `id`.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Whether `node` is `container` or one of its descendants.
    pub fn contains(&self, container: NodeId, node: NodeId) -> bool {
        node == container || self.ancestors(node).any(|a| a == container)
    }

    /// The direct child of `container` that contains `node`.
    pub fn child_containing(&self, container: NodeId, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            if parent == container {
                return Some(current);
            }
            current = parent;
        }
        None
    }

    /// `id` and all of its descendants in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            out.push(next);
            let children = self.children(next);
            pending.extend(children.into_iter().rev());
        }
        out
    }

    /// Nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.parents
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(i, _)| NodeId(i as u32))
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct Ancestors<'t> {
    tree: &'t Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

// ============================================================================
// TreeBuilder
// ============================================================================

/// Assembles nodes bottom-up and produces a validated [`Tree`].
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    span: Span,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Set the span attached to subsequently added nodes.
    pub fn at(&mut self, span: Span) -> &mut Self {
        self.span = span;
        self
    }

    /// Add a node with the current span, widened to cover its children.
    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let span = kind
            .children()
            .into_iter()
            .filter_map(|child| self.nodes.get(child.index()))
            .fold(self.span, |span, child| span.cover(child.span));
        self.nodes.push(Node { kind, span });
        id
    }

    /// Inspect a node added so far.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.index()).map(|n| &n.kind)
    }

    /// Compute parents and validate ownership.
    ///
    /// Every child must exist, belong to exactly one parent, and every node
    /// must be reachable from a parentless root.
    pub fn finish(self) -> Result<Tree, TreeError> {
        let count = self.nodes.len();
        let mut parents: Vec<Option<NodeId>> = vec![None; count];

        for (index, node) in self.nodes.iter().enumerate() {
            let parent = NodeId(index as u32);
            for child in node.kind.children() {
                if child.index() >= count {
                    return Err(TreeError::DanglingChild { parent, child });
                }
                if child == parent {
                    return Err(TreeError::Unreachable { node: child });
                }
                if let Some(owner) = parents[child.index()] {
                    return Err(TreeError::SharedChild {
                        child,
                        first: owner,
                        second: parent,
                    });
                }
                parents[child.index()] = Some(parent);
            }
        }

        let tree = Tree {
            nodes: self.nodes,
            parents,
        };

        let mut reached = vec![false; count];
        for root in tree.roots() {
            for node in tree.descendants(root) {
                reached[node.index()] = true;
            }
        }
        if let Some(index) = reached.iter().position(|r| !r) {
            return Err(TreeError::Unreachable {
                node: NodeId(index as u32),
            });
        }

        Ok(tree)
    }

    // ==========================================================================
    // Definitions
    // ==========================================================================

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Block { statements })
    }

    pub fn bind(&mut self, name: &str, ty: Option<NodeId>, value: Option<NodeId>) -> NodeId {
        self.add(NodeKind::Bind {
            names: Names::one(name),
            ty,
            value,
        })
    }

    pub fn function(
        &mut self,
        name: &str,
        inputs: Vec<NodeId>,
        output: Option<NodeId>,
        body: Option<NodeId>,
    ) -> NodeId {
        self.add(NodeKind::Function {
            names: Names::one(name),
            type_variables: Vec::new(),
            inputs,
            output,
            body,
        })
    }

    pub fn structure(
        &mut self,
        name: &str,
        type_variables: Vec<NodeId>,
        inputs: Vec<NodeId>,
        members: Vec<NodeId>,
    ) -> NodeId {
        self.add(NodeKind::Structure {
            names: Names::one(name),
            type_variables,
            inputs,
            members,
        })
    }

    pub fn type_variable(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::TypeVariable {
            names: Names::one(name),
        })
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    pub fn reference(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::Reference {
            name: name.to_string(),
        })
    }

    pub fn property(&mut self, subject: NodeId, name: &str) -> NodeId {
        self.add(NodeKind::Property {
            subject,
            name: Some(name.to_string()),
        })
    }

    pub fn evaluate(&mut self, fun: NodeId, inputs: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Evaluate {
            fun,
            type_inputs: Vec::new(),
            inputs,
        })
    }

    pub fn binary(&mut self, operator: &str, left: NodeId, right: NodeId) -> NodeId {
        self.add(NodeKind::Binary {
            operator: operator.to_string(),
            left,
            right,
        })
    }

    pub fn unary(&mut self, operator: &str, operand: NodeId) -> NodeId {
        self.add(NodeKind::Unary {
            operator: operator.to_string(),
            operand,
        })
    }

    pub fn conditional(&mut self, condition: NodeId, yes: NodeId, no: NodeId) -> NodeId {
        self.add(NodeKind::Conditional { condition, yes, no })
    }

    pub fn is(&mut self, expression: NodeId, ty: NodeId) -> NodeId {
        self.add(NodeKind::Is { expression, ty })
    }

    pub fn reaction(&mut self, initial: NodeId, condition: NodeId, next: NodeId) -> NodeId {
        self.add(NodeKind::Reaction {
            initial,
            condition,
            next,
        })
    }

    pub fn changed(&mut self, stream: NodeId) -> NodeId {
        self.add(NodeKind::Changed { stream })
    }

    pub fn previous(&mut self, stream: NodeId, index: NodeId) -> NodeId {
        self.add(NodeKind::Previous { stream, index })
    }

    pub fn number(&mut self, value: f64) -> NodeId {
        self.measurement(value, "")
    }

    pub fn measurement(&mut self, value: f64, unit: &str) -> NodeId {
        self.add(NodeKind::Measurement {
            value: OrderedFloat(value),
            unit: Unit::new(unit),
        })
    }

    pub fn text(&mut self, text: &str) -> NodeId {
        self.add(NodeKind::Text {
            text: text.to_string(),
        })
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.add(NodeKind::Boolean { value })
    }

    pub fn none(&mut self) -> NodeId {
        self.add(NodeKind::None)
    }

    pub fn list(&mut self, items: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::List { items })
    }

    pub fn table(&mut self, columns: Vec<NodeId>, rows: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Table { columns, rows })
    }

    pub fn row(&mut self, cells: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Row { cells })
    }

    pub fn select(&mut self, table: NodeId, row: NodeId, query: NodeId) -> NodeId {
        self.add(NodeKind::Select { table, row, query })
    }

    pub fn placeholder(&mut self) -> NodeId {
        self.add(NodeKind::Placeholder { ty: None })
    }

    pub fn native(&mut self, function: DefHash) -> NodeId {
        self.add(NodeKind::Native { function })
    }

    // ==========================================================================
    // Type annotations
    // ==========================================================================

    pub fn name_type(&mut self, name: &str, type_inputs: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::NameType {
            name: name.to_string(),
            type_inputs,
        })
    }

    pub fn boolean_type(&mut self) -> NodeId {
        self.add(NodeKind::BooleanType)
    }

    pub fn none_type(&mut self) -> NodeId {
        self.add(NodeKind::NoneType)
    }

    pub fn text_type(&mut self) -> NodeId {
        self.add(NodeKind::TextType { text: None })
    }

    pub fn measurement_type(&mut self, unit: &str) -> NodeId {
        self.add(NodeKind::MeasurementType {
            unit: Unit::new(unit),
        })
    }

    pub fn list_type(&mut self, item: NodeId) -> NodeId {
        self.add(NodeKind::ListType { item })
    }

    pub fn union_type(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.add(NodeKind::UnionType { left, right })
    }

    pub fn stream_type(&mut self, item: NodeId) -> NodeId {
        self.add(NodeKind::StreamType { item })
    }

    pub fn table_type(&mut self, columns: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::TableType { columns })
    }

    pub fn type_placeholder(&mut self) -> NodeId {
        self.add(NodeKind::TypePlaceholder)
    }

    pub fn type_literal(&mut self, ty: Type) -> NodeId {
        self.add(NodeKind::TypeLiteral { ty })
    }
}
