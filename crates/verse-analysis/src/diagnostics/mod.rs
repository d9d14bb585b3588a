//! Diagnostics: structured reports of ill-formed programs.
//!
//! A [`Diagnostic`] is plain data: a [`DiagnosticKind`] naming the nodes
//! involved and a [`Severity`]. Explanations are produced on demand by
//! [`Diagnostic::primary`] and [`Diagnostic::secondary`] as [`Explanation`]
//! records, and only rendered to text against a set of [`Locales`], so the
//! same diagnostic can be shown in any language and compared in tests.
//!
//! [`analyze`] computes the diagnostics of every node of a source, in
//! pre-order. Computing diagnostics never fails.

mod explanation;
mod locale;

pub use explanation::{Argument, Explanation, concretize};
pub use locale::{Locale, Locales};

use std::fmt;

use tracing::debug;

use verse_core::{NodeId, NodeKind, Type};

use crate::context::Context;
use crate::definition::Definition;
use crate::{property, reference, typing};

/// Whether a diagnostic makes a program unsafe to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The program is ill-formed.
    Blocking,
    /// Style advice; the program remains runnable.
    Advisory,
}

/// The kinds of ill-formedness analysis reports, with the nodes involved.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    // =========================================================================
    // Unresolved references
    // =========================================================================
    UnknownName {
        reference: NodeId,
        name: String,
    },
    UnknownProperty {
        property: NodeId,
        name: String,
        subject: Type,
    },
    /// A select names a column its table does not have.
    UnknownColumn {
        table_type: Type,
        cell: NodeId,
    },
    UnknownTypeName {
        node: NodeId,
        name: String,
    },

    // =========================================================================
    // Misused compile-time entities
    // =========================================================================
    UnexpectedTypeVariable {
        reference: NodeId,
        variable: NodeId,
    },

    // =========================================================================
    // Structural preconditions
    // =========================================================================
    CircularReference {
        reference: NodeId,
        bind: NodeId,
    },
    NotAFunction {
        evaluate: NodeId,
        fun: NodeId,
        received: Type,
    },
    IncompatibleInput {
        given: NodeId,
        expected: Type,
        received: Type,
    },
    /// A required input was not supplied. `last` is the node after which
    /// the input was expected.
    MissingInput {
        function: NodeId,
        evaluate: NodeId,
        fun: NodeId,
        last: NodeId,
        input: NodeId,
    },
    UnexpectedInput {
        function: NodeId,
        input: NodeId,
    },
    UnknownOperator {
        node: NodeId,
        operator: String,
        on: Type,
    },
    ExpectedBooleanCondition {
        node: NodeId,
        condition: NodeId,
        received: Type,
    },
    ExpectedStream {
        node: NodeId,
        stream: NodeId,
    },
    NotATable {
        select: NodeId,
        table: NodeId,
        received: Type,
    },
    ExpectedSelectName {
        select: NodeId,
        cell: NodeId,
    },
    NonBooleanQuery {
        select: NodeId,
        query: NodeId,
        received: Type,
    },
    Placeholder {
        node: NodeId,
    },

    // =========================================================================
    // Advice
    // =========================================================================
    CaseCollision {
        reference: NodeId,
        name: String,
        other: Definition,
    },
}

impl DiagnosticKind {
    /// Stable identifier, also the key of the kind's locale messages.
    pub fn name(&self) -> &'static str {
        use DiagnosticKind::*;
        match self {
            UnknownName { .. } => "UnknownName",
            UnknownProperty { .. } => "UnknownProperty",
            UnknownColumn { .. } => "UnknownColumn",
            UnknownTypeName { .. } => "UnknownTypeName",
            UnexpectedTypeVariable { .. } => "UnexpectedTypeVariable",
            CircularReference { .. } => "CircularReference",
            NotAFunction { .. } => "NotAFunction",
            IncompatibleInput { .. } => "IncompatibleInput",
            MissingInput { .. } => "MissingInput",
            UnexpectedInput { .. } => "UnexpectedInput",
            UnknownOperator { .. } => "UnknownOperator",
            ExpectedBooleanCondition { .. } => "ExpectedBooleanCondition",
            ExpectedStream { .. } => "ExpectedStream",
            NotATable { .. } => "NotATable",
            ExpectedSelectName { .. } => "ExpectedSelectName",
            NonBooleanQuery { .. } => "NonBooleanQuery",
            Placeholder { .. } => "Placeholder",
            CaseCollision { .. } => "CaseCollision",
        }
    }
}

/// A node involved in a diagnostic and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflicting {
    pub node: NodeId,
    pub explanation: Explanation,
}

/// One way a program is statically ill-formed.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    kind: DiagnosticKind,
    severity: Severity,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind) -> Self {
        let severity = match kind {
            DiagnosticKind::CaseCollision { .. } => Severity::Advisory,
            _ => Severity::Blocking,
        };
        Self { kind, severity }
    }

    pub fn kind(&self) -> &DiagnosticKind {
        &self.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }

    /// The node the diagnostic is anchored to, with its explanation.
    pub fn primary(&self, ctx: &Context<'_>) -> Conflicting {
        use Argument as A;
        use DiagnosticKind::*;
        let key = |part: &str| format!("{}.{}", self.kind.name(), part);
        let (node, args) = match &self.kind {
            UnknownName { reference, name } => (*reference, vec![A::Text(name.clone())]),
            UnknownProperty {
                property,
                name,
                subject,
            } => (
                *property,
                vec![A::Text(name.clone()), A::Type(subject.clone())],
            ),
            UnknownColumn { table_type, cell } => {
                (*cell, vec![A::Node(*cell), A::Type(table_type.clone())])
            }
            UnknownTypeName { node, name } => (*node, vec![A::Text(name.clone())]),
            UnexpectedTypeVariable { reference, .. } => (*reference, vec![A::Node(*reference)]),
            CircularReference { reference, bind } => {
                (*reference, vec![A::Node(*reference), A::Node(*bind)])
            }
            NotAFunction { fun, received, .. } => {
                (*fun, vec![A::Node(*fun), A::Type(received.clone())])
            }
            IncompatibleInput {
                given,
                expected,
                received,
            } => (
                *given,
                vec![A::Type(expected.clone()), A::Type(received.clone())],
            ),
            MissingInput {
                function, input, ..
            } => {
                let project = ctx.project();
                let argument = if project.contains(*input) {
                    A::Node(*input)
                } else {
                    A::Concept(format!(
                        "{}/{}",
                        Definition::Function(*function).names(project).preferred(),
                        Definition::Bind(*input).names(project).preferred(),
                    ))
                };
                (*input, vec![argument])
            }
            UnexpectedInput { input, .. } => (*input, vec![A::Node(*input)]),
            UnknownOperator { node, operator, on } => (
                *node,
                vec![A::Text(operator.clone()), A::Type(on.clone())],
            ),
            ExpectedBooleanCondition {
                condition,
                received,
                ..
            } => (*condition, vec![A::Type(received.clone())]),
            ExpectedStream { stream, .. } => (*stream, vec![A::Node(*stream)]),
            NotATable { table, received, .. } => (*table, vec![A::Type(received.clone())]),
            ExpectedSelectName { cell, .. } => (*cell, vec![A::Node(*cell)]),
            NonBooleanQuery {
                query, received, ..
            } => (*query, vec![A::Type(received.clone())]),
            Placeholder { node } => (*node, Vec::new()),
            CaseCollision {
                reference,
                name,
                other,
            } => (
                *reference,
                vec![
                    A::Text(name.clone()),
                    A::Text(other.names(ctx.project()).preferred().to_string()),
                ],
            ),
        };
        Conflicting {
            node,
            explanation: Explanation::new(key("primary"), args),
        }
    }

    /// A related node, such as the function whose input is missing.
    pub fn secondary(&self, ctx: &Context<'_>) -> Option<Conflicting> {
        use Argument as A;
        use DiagnosticKind::*;
        let key = format!("{}.secondary", self.kind.name());
        let (node, args) = match &self.kind {
            CircularReference { bind, .. } => (*bind, vec![A::Node(*bind)]),
            MissingInput { fun, .. } => (*fun, vec![A::Node(*fun)]),
            UnexpectedInput { function, .. } if ctx.project().contains(*function) => {
                (*function, vec![A::Node(*function)])
            }
            CaseCollision { other, .. } => {
                let node = other.node()?;
                (node, vec![A::Node(node)])
            }
            _ => return None,
        };
        Some(Conflicting {
            node,
            explanation: Explanation::new(key, args),
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Blocking => "error",
            Severity::Advisory => "advice",
        };
        write!(f, "{severity}: {}", self.kind.name())
    }
}

// ============================================================================
// Collections
// ============================================================================

/// The diagnostics of one analysis pass, in tree order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Whether any diagnostic makes the program ill-formed.
    pub fn has_blocking(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_blocking)
    }

    pub fn blocking(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_blocking())
    }

    pub fn advisories(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_blocking())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.diagnostics.extend(iter);
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Diagnostics for every node of the context's source.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn analyze(ctx: &mut Context<'_>) -> Diagnostics {
    let mut out = Diagnostics::new();
    for node in ctx.tree().descendants(ctx.source()) {
        out.extend(node_diagnostics(ctx, node));
    }
    debug!(
        source = %ctx.source(),
        total = out.len(),
        blocking = out.blocking().count(),
        "analyzed source"
    );
    out
}

fn expected_boolean(ctx: &mut Context<'_>, node: NodeId, condition: NodeId) -> Vec<Diagnostic> {
    let received = ctx.get_type(condition);
    if typing::is_checkable(&received) && !Type::Boolean.accepts(&received) {
        vec![Diagnostic::new(DiagnosticKind::ExpectedBooleanCondition {
            node,
            condition,
            received,
        })]
    } else {
        Vec::new()
    }
}

/// Diagnostics reported by `node` itself, excluding its descendants.
pub fn node_diagnostics(ctx: &mut Context<'_>, node: NodeId) -> Vec<Diagnostic> {
    let tree = ctx.tree();
    match tree.kind(node) {
        NodeKind::Reference { .. } => reference::diagnostics(ctx, node),
        NodeKind::Property { .. } => property::diagnostics(ctx, node),
        NodeKind::Evaluate { .. } => typing::evaluate_diagnostics(ctx, node),
        NodeKind::Binary { .. } => typing::binary_diagnostics(ctx, node),
        NodeKind::Unary { .. } => typing::unary_diagnostics(ctx, node),
        NodeKind::Conditional { condition, .. } | NodeKind::Reaction { condition, .. } => {
            expected_boolean(ctx, node, *condition)
        }
        NodeKind::Changed { .. } | NodeKind::Previous { .. } => {
            typing::changed_diagnostics(ctx, node)
        }
        NodeKind::Select { .. } => typing::select_diagnostics(ctx, node),
        NodeKind::NameType { name, .. } => match ctx.get_type(node) {
            Type::UnknownName { .. } => vec![Diagnostic::new(DiagnosticKind::UnknownTypeName {
                node,
                name: name.clone(),
            })],
            _ => Vec::new(),
        },
        NodeKind::Placeholder { .. } | NodeKind::TypePlaceholder => {
            vec![Diagnostic::new(DiagnosticKind::Placeholder { node })]
        }
        NodeKind::Block { .. }
        | NodeKind::Bind { .. }
        | NodeKind::Function { .. }
        | NodeKind::Structure { .. }
        | NodeKind::TypeVariable { .. }
        | NodeKind::Is { .. }
        | NodeKind::Measurement { .. }
        | NodeKind::Text { .. }
        | NodeKind::Boolean { .. }
        | NodeKind::None
        | NodeKind::List { .. }
        | NodeKind::Table { .. }
        | NodeKind::Row { .. }
        | NodeKind::Native { .. }
        | NodeKind::BooleanType
        | NodeKind::NoneType
        | NodeKind::TextType { .. }
        | NodeKind::MeasurementType { .. }
        | NodeKind::ListType { .. }
        | NodeKind::UnionType { .. }
        | NodeKind::StreamType { .. }
        | NodeKind::TableType { .. }
        | NodeKind::TypeLiteral { .. } => Vec::new(),
    }
}
