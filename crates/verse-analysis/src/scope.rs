//! Binding scopes and bare-name resolution.
//!
//! Scopes are found by walking outward from a node. Each ancestor may
//! contribute definitions depending on which of its children the walk came
//! through:
//!
//! - block: binds in statements up to and including the one containing the
//!   node, plus every function and structure in the block
//! - function: inputs and type variables
//! - structure: inputs, members and type variables
//! - select: the columns of the selected table, inside the row and query
//!
//! Built-in streams and constants form the outermost scope.

use verse_core::{NodeId, NodeKind};

use crate::context::Context;
use crate::definition::Definition;

/// Definitions visible at `node`, one scope per entry, nearest first.
pub fn scopes(ctx: &mut Context<'_>, node: NodeId) -> Vec<Vec<Definition>> {
    let tree = ctx.tree();
    let mut out = Vec::new();
    let mut child = node;
    for ancestor in tree.ancestors(node) {
        let scope = scope_of(ctx, ancestor, child);
        if !scope.is_empty() {
            out.push(scope);
        }
        child = ancestor;
    }
    out.push(
        ctx.registry()
            .globals()
            .into_iter()
            .map(|(_, global)| Definition::from_global(global))
            .collect(),
    );
    out
}

/// Definitions `container` makes visible to its child `child`.
fn scope_of(ctx: &mut Context<'_>, container: NodeId, child: NodeId) -> Vec<Definition> {
    let tree = ctx.tree();
    let defs = |nodes: &[NodeId]| -> Vec<Definition> {
        nodes
            .iter()
            .filter_map(|n| Definition::from_node(tree, *n))
            .collect()
    };

    match tree.kind(container) {
        NodeKind::Block { statements } => {
            let Some(index) = statements.iter().position(|s| *s == child) else {
                return Vec::new();
            };
            let mut out: Vec<Definition> = statements[..=index]
                .iter()
                .rev()
                .filter(|s| matches!(tree.kind(**s), NodeKind::Bind { .. }))
                .map(|s| Definition::Bind(*s))
                .collect();
            out.extend(statements.iter().filter_map(|s| match tree.kind(*s) {
                NodeKind::Function { .. } => Some(Definition::Function(*s)),
                NodeKind::Structure { .. } => Some(Definition::Structure(*s)),
                _ => None,
            }));
            out
        }
        NodeKind::Function {
            type_variables,
            inputs,
            ..
        } => {
            let mut out = defs(inputs);
            out.extend(defs(type_variables));
            out
        }
        NodeKind::Structure {
            type_variables,
            inputs,
            members,
            ..
        } => {
            let mut out = defs(inputs);
            out.extend(defs(members));
            out.extend(defs(type_variables));
            out
        }
        NodeKind::Select { table, .. } if child != *table => {
            let ty = ctx.get_type(*table);
            ty.unwrap_stream()
                .columns()
                .iter()
                .filter_map(|c| c.bind.map(Definition::Bind))
                .collect()
        }
        _ => Vec::new(),
    }
}

/// The nearest definition named `name` visible at `node`.
pub fn resolve_name(ctx: &mut Context<'_>, node: NodeId, name: &str) -> Option<Definition> {
    let project = ctx.project();
    scopes(ctx, node)
        .into_iter()
        .flatten()
        .find(|d| d.has_name(project, name))
}

/// Every definition visible at `node`, nearest first, without duplicates.
pub fn visible_definitions(ctx: &mut Context<'_>, node: NodeId) -> Vec<Definition> {
    let mut out: Vec<Definition> = Vec::new();
    for definition in scopes(ctx, node).into_iter().flatten() {
        if !out.contains(&definition) {
            out.push(definition);
        }
    }
    out
}

/// A visible definition whose name differs from `name` only by letter case.
pub fn case_collision(ctx: &mut Context<'_>, node: NodeId, name: &str) -> Option<Definition> {
    let project = ctx.project();
    visible_definitions(ctx, node)
        .into_iter()
        .find(|d| d.names(project).case_variant_of(name).is_some())
}
