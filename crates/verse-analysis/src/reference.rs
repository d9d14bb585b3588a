//! Bare-name references.

use verse_core::{NodeId, NodeKind, Tree, Type};

use crate::context::Context;
use crate::definition::Definition;
use crate::dependencies::Dependency;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::narrowing::{self, Target};
use crate::scope;

fn name_of(tree: &Tree, reference: NodeId) -> Option<&str> {
    match tree.kind(reference) {
        NodeKind::Reference { name } => Some(name),
        _ => None,
    }
}

/// The definition a reference names, resolved once per pass.
pub fn resolve(ctx: &mut Context<'_>, reference: NodeId) -> Option<Definition> {
    if let Some(cached) = ctx.cached_resolution(reference) {
        return cached;
    }
    let definition = name_of(ctx.tree(), reference)
        .and_then(|name| scope::resolve_name(ctx, reference, name));
    ctx.cache_resolution(reference, definition);
    definition
}

pub(crate) fn compute_type(ctx: &mut Context<'_>, reference: NodeId) -> Type {
    let definition = match resolve(ctx, reference) {
        Some(definition) if !definition.is_type_variable() => definition,
        _ => {
            return Type::UnknownName {
                node: reference,
                name: name_of(ctx.tree(), reference).map(str::to_string),
                subject: None,
            };
        }
    };

    let ty = ctx.definition_type(definition);

    // Reading a stream by name reads its current value.
    if let Type::Stream(item) = ty {
        return *item;
    }

    if matches!(definition, Definition::Bind(_)) && ty.is_union() {
        if let Some(narrowed) = ctx.get_reference_type(reference) {
            return narrowed.clone();
        }
        return narrowing::narrow(ctx, reference, Target::Name(definition), &ty);
    }

    ty
}

/// Whether `reference` names a column in the row of a select rather than
/// reading a value.
pub(crate) fn is_column_selector(tree: &Tree, reference: NodeId) -> bool {
    let Some(row) = tree.parent(reference) else {
        return false;
    };
    matches!(tree.kind(row), NodeKind::Row { .. })
        && tree
            .parent(row)
            .is_some_and(|select| matches!(tree.kind(select), NodeKind::Select { row: r, .. } if *r == row))
}

pub(crate) fn diagnostics(ctx: &mut Context<'_>, reference: NodeId) -> Vec<Diagnostic> {
    let tree = ctx.tree();
    if is_column_selector(tree, reference) {
        return Vec::new();
    }
    let Some(name) = name_of(tree, reference) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let definition = resolve(ctx, reference);
    match definition {
        None => out.push(Diagnostic::new(DiagnosticKind::UnknownName {
            reference,
            name: name.to_string(),
        })),
        Some(Definition::TypeVariable(variable)) => {
            out.push(Diagnostic::new(DiagnosticKind::UnexpectedTypeVariable {
                reference,
                variable,
            }))
        }
        Some(_) => {}
    }

    // The only licensed self-reference is through a reaction inside the bind.
    if let Some(Definition::Bind(bind)) = definition {
        if tree.contains(bind, reference) {
            let reaction = tree
                .ancestors(reference)
                .find(|a| matches!(tree.kind(*a), NodeKind::Reaction { .. }));
            let licensed = reaction.is_some_and(|r| tree.ancestors(r).any(|a| a == bind));
            if !licensed {
                out.push(Diagnostic::new(DiagnosticKind::CircularReference {
                    reference,
                    bind,
                }));
            }
        }
    }

    if let Some(other) = scope::case_collision(ctx, reference, name) {
        out.push(Diagnostic::new(DiagnosticKind::CaseCollision {
            reference,
            name: name.to_string(),
            other,
        }));
    }

    out
}

pub(crate) fn dependencies(ctx: &mut Context<'_>, reference: NodeId) -> Vec<Dependency> {
    match resolve(ctx, reference) {
        Some(Definition::Bind(node) | Definition::Function(node) | Definition::Structure(node)) => {
            vec![Dependency::Node(node)]
        }
        Some(Definition::Stream(stream)) => vec![Dependency::Stream(stream)],
        Some(Definition::TypeVariable(_) | Definition::Value(_)) | None => Vec::new(),
    }
}
