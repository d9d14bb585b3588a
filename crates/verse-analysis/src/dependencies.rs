//! Runtime dependencies for reactive re-evaluation.
//!
//! An expression depends on the expressions whose values it reads and on the
//! stream sources those eventually read. When a stream emits, only programs
//! whose transitive dependencies include that stream need re-evaluating.

use rustc_hash::FxHashSet;

use verse_core::{NodeId, NodeKind};
use verse_registry::StreamId;

use crate::context::Context;
use crate::{property, reference, typing};

/// Something an expression's value is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    Node(NodeId),
    Stream(StreamId),
}

/// The direct dependencies of `node`.
pub fn dependencies(ctx: &mut Context<'_>, node: NodeId) -> Vec<Dependency> {
    let tree = ctx.tree();
    let nodes = |ids: &[NodeId]| ids.iter().map(|n| Dependency::Node(*n)).collect::<Vec<_>>();
    match tree.kind(node) {
        NodeKind::Reference { .. } => reference::dependencies(ctx, node),
        NodeKind::Property { .. } => property::dependencies(ctx, node),
        NodeKind::Evaluate { fun, inputs, .. } => {
            let mut out = nodes(&[*fun]);
            out.extend(nodes(inputs));
            if let Some(callee) = typing::callee(ctx, node) {
                if let NodeKind::Function {
                    body: Some(body), ..
                } = tree.kind(callee)
                {
                    out.push(Dependency::Node(*body));
                }
            }
            out
        }
        NodeKind::Changed { stream } => match typing::stream_of(ctx, node) {
            Some(id) => vec![Dependency::Stream(id)],
            None => nodes(&[*stream]),
        },
        NodeKind::Block { statements } => statements
            .last()
            .map(|last| Dependency::Node(*last))
            .into_iter()
            .collect(),
        NodeKind::Bind { value, .. } => nodes(value.as_slice()),
        NodeKind::Binary { left, right, .. } => nodes(&[*left, *right]),
        NodeKind::Unary { operand, .. } => nodes(&[*operand]),
        NodeKind::Conditional {
            condition,
            yes,
            no,
        } => nodes(&[*condition, *yes, *no]),
        NodeKind::Reaction {
            initial,
            condition,
            next,
        } => nodes(&[*initial, *condition, *next]),
        NodeKind::Is { expression, .. } => nodes(&[*expression]),
        NodeKind::Previous { stream, index } => nodes(&[*stream, *index]),
        NodeKind::List { items } => nodes(items),
        NodeKind::Table { rows, .. } => rows
            .iter()
            .flat_map(|row| tree.children(*row))
            .map(Dependency::Node)
            .collect(),
        NodeKind::Select { table, query, .. } => nodes(&[*table, *query]),
        NodeKind::Function { .. }
        | NodeKind::Structure { .. }
        | NodeKind::TypeVariable { .. }
        | NodeKind::Measurement { .. }
        | NodeKind::Text { .. }
        | NodeKind::Boolean { .. }
        | NodeKind::None
        | NodeKind::Row { .. }
        | NodeKind::Placeholder { .. }
        | NodeKind::Native { .. }
        | NodeKind::NameType { .. }
        | NodeKind::BooleanType
        | NodeKind::NoneType
        | NodeKind::TextType { .. }
        | NodeKind::MeasurementType { .. }
        | NodeKind::ListType { .. }
        | NodeKind::UnionType { .. }
        | NodeKind::StreamType { .. }
        | NodeKind::TableType { .. }
        | NodeKind::TypePlaceholder
        | NodeKind::TypeLiteral { .. } => Vec::new(),
    }
}

/// Every stream source `node` transitively depends on.
pub fn stream_dependencies(ctx: &mut Context<'_>, node: NodeId) -> FxHashSet<StreamId> {
    let mut streams = FxHashSet::default();
    let mut seen = FxHashSet::default();
    let mut pending = vec![node];
    while let Some(next) = pending.pop() {
        if !seen.insert(next) {
            continue;
        }
        for dependency in dependencies(ctx, next) {
            match dependency {
                Dependency::Node(n) => pending.push(n),
                Dependency::Stream(s) => {
                    streams.insert(s);
                }
            }
        }
    }
    streams
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{finish, fixture};
    use verse_registry::Global;

    #[test]
    fn streams_through_binds_and_functions() {
        let mut p = fixture();
        let b = p.builder();
        let time = b.reference("Time");
        let now = b.bind("now", None, Some(time));
        let now_ref = b.reference("now");
        let later = b.function("later", vec![], None, Some(now_ref));
        let later_ref = b.reference("later");
        let call = b.evaluate(later_ref, vec![]);
        let root = b.block(vec![now, later, call]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let Some(Global::Stream(time_id)) = project.registry().global("Time") else {
            panic!("Time is not a stream");
        };
        let streams = stream_dependencies(&mut ctx, root);
        assert_eq!(streams.len(), 1);
        assert!(streams.contains(&time_id));
    }

    #[test]
    fn unused_statements_do_not_count() {
        let mut p = fixture();
        let b = p.builder();
        let key = b.reference("Key");
        let one = b.number(1.0);
        let root = b.block(vec![key, one]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert!(stream_dependencies(&mut ctx, root).is_empty());
        assert_eq!(
            dependencies(&mut ctx, root),
            vec![Dependency::Node(one)]
        );
    }

    #[test]
    fn recursion_terminates() {
        let mut p = fixture();
        let b = p.builder();
        let inner = b.reference("loop");
        let again = b.evaluate(inner, vec![]);
        let f = b.function("loop", vec![], None, Some(again));
        let outer = b.reference("loop");
        let call = b.evaluate(outer, vec![]);
        let root = b.block(vec![f, call]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert!(stream_dependencies(&mut ctx, root).is_empty());
    }
}
