//! Reactions, change tests and stream history.

use verse_core::{NodeId, NodeKind, Type};
use verse_registry::StreamId;

use crate::context::Context;
use crate::definition::Definition;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::reference;

/// A reaction has the type of its initial value or of its next value.
///
/// The next value usually reads the bind the reaction defines, so its type
/// may still be settling. An unresolved next value is ignored.
pub(crate) fn reaction_type(ctx: &mut Context<'_>, reaction: NodeId) -> Type {
    let NodeKind::Reaction { initial, next, .. } = ctx.tree().kind(reaction) else {
        return Type::Unknown;
    };
    let initial = ctx.get_type(*initial);
    let next = ctx.get_type(*next);
    if next.is_unresolved() {
        initial
    } else {
        Type::union([initial, next])
    }
}

/// `← stream index` has the stream's element type.
pub(crate) fn previous_type(ctx: &mut Context<'_>, previous: NodeId) -> Type {
    let NodeKind::Previous { stream, .. } = ctx.tree().kind(previous) else {
        return Type::Unknown;
    };
    ctx.get_type(*stream).unwrap_stream().clone()
}

/// The stream source a `Changed` or `Previous` operand names.
pub(crate) fn stream_of(ctx: &mut Context<'_>, node: NodeId) -> Option<StreamId> {
    let stream = match ctx.tree().kind(node) {
        NodeKind::Changed { stream } | NodeKind::Previous { stream, .. } => *stream,
        _ => return None,
    };
    if !matches!(ctx.tree().kind(stream), NodeKind::Reference { .. }) {
        return None;
    }
    match reference::resolve(ctx, stream) {
        Some(Definition::Stream(id)) => Some(id),
        _ => None,
    }
}

pub(crate) fn changed_diagnostics(ctx: &mut Context<'_>, node: NodeId) -> Vec<Diagnostic> {
    let stream = match ctx.tree().kind(node) {
        NodeKind::Changed { stream } | NodeKind::Previous { stream, .. } => *stream,
        _ => return Vec::new(),
    };
    let mut out = Vec::new();
    if stream_of(ctx, node).is_none() {
        out.push(Diagnostic::new(DiagnosticKind::ExpectedStream { node, stream }));
    }
    if let NodeKind::Previous { index, .. } = ctx.tree().kind(node) {
        let received = ctx.get_type(*index);
        if super::is_checkable(&received) && !Type::number().accepts(&received) {
            out.push(Diagnostic::new(DiagnosticKind::IncompatibleInput {
                given: *index,
                expected: Type::number(),
                received,
            }));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{finish, fixture, kinds};

    #[test]
    fn changed_requires_a_stream() {
        let mut p = fixture();
        let b = p.builder();
        let one = b.number(1.0);
        let x = b.bind("x", None, Some(one));
        let x_ref = b.reference("x");
        let not_stream = b.changed(x_ref);
        let time = b.reference("Time");
        let changed = b.changed(time);
        let root = b.block(vec![x, not_stream, changed]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(kinds(&changed_diagnostics(&mut ctx, not_stream)), ["ExpectedStream"]);
        assert!(changed_diagnostics(&mut ctx, changed).is_empty());
        assert!(stream_of(&mut ctx, changed).is_some());
        assert_eq!(ctx.get_type(changed), Type::Boolean);
    }

    #[test]
    fn previous_reads_element_type() {
        let mut p = fixture();
        let b = p.builder();
        let key = b.reference("Key");
        let one = b.number(1.0);
        let previous = b.previous(key, one);
        let time = b.reference("Time");
        let label = b.text("first");
        let wrong = b.previous(time, label);
        let root = b.block(vec![previous, wrong]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(ctx.get_type(previous), Type::text());
        assert!(changed_diagnostics(&mut ctx, previous).is_empty());
        assert_eq!(kinds(&changed_diagnostics(&mut ctx, wrong)), ["IncompatibleInput"]);
    }

    #[test]
    fn reaction_unions_initial_and_next() {
        let mut p = fixture();
        let b = p.builder();
        let initial = b.text("waiting");
        let time = b.reference("Time");
        let changed = b.changed(time);
        let now = b.reference("Time");
        let reaction = b.reaction(initial, changed, now);
        let root = b.block(vec![reaction]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(
            ctx.get_type(reaction),
            Type::union([Type::text(), Type::measurement("ms")])
        );
    }
}
