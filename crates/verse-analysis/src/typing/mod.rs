//! The typing protocol.
//!
//! Every expression kind supplies a type computation, diagnostics, a
//! dependency listing, a narrowing hook and a compilation. Dispatch is an
//! exhaustive match over [`NodeKind`] in each of those places; this module
//! holds the type computation and the helpers the other protocol parts
//! share.
//!
//! Type computation must only be reached through [`Context::get_type`],
//! which memoizes it and guards against cycles.

mod calls;
mod reactive;
mod select;

pub(crate) use calls::{binary_diagnostics, callee, evaluate_diagnostics, unary_diagnostics};
pub(crate) use reactive::{changed_diagnostics, stream_of};
pub(crate) use select::{column_types, select_diagnostics, selected_columns};

use verse_core::{NativeTypeName, NodeId, NodeKind, Type};

use crate::context::Context;
use crate::{property, reference, scope};
use crate::definition::Definition;

/// Compute the type of `node`. Called by [`Context::get_type`] only.
pub(crate) fn compute_type(ctx: &mut Context<'_>, node: NodeId) -> Type {
    let tree = ctx.tree();
    match tree.kind(node) {
        NodeKind::Block { statements } => match statements.last() {
            Some(last) => ctx.get_type(*last),
            None => Type::None,
        },
        NodeKind::Bind { ty, value, .. } => match (ty, value) {
            (Some(annotation), _) => ctx.get_type(*annotation),
            (None, Some(value)) => ctx.get_type(*value),
            (None, None) => Type::Any,
        },
        NodeKind::Function { .. } | NodeKind::Structure { .. } => {
            Type::Function { definition: node }
        }
        NodeKind::TypeVariable { .. } => Type::TypeVariable(node),

        NodeKind::Reference { .. } => reference::compute_type(ctx, node),
        NodeKind::Property { .. } => property::compute_type(ctx, node),
        NodeKind::Evaluate { .. } => calls::evaluate_type(ctx, node),
        NodeKind::Binary { .. } => calls::binary_type(ctx, node),
        NodeKind::Unary { .. } => calls::unary_type(ctx, node),
        NodeKind::Conditional { yes, no, .. } => {
            Type::union([ctx.get_type(*yes), ctx.get_type(*no)])
        }
        NodeKind::Is { .. } | NodeKind::Changed { .. } => Type::Boolean,
        NodeKind::Reaction { .. } => reactive::reaction_type(ctx, node),
        NodeKind::Previous { .. } => reactive::previous_type(ctx, node),

        NodeKind::Measurement { unit, .. } => Type::Measurement(unit.clone()),
        NodeKind::Text { .. } => Type::text(),
        NodeKind::Boolean { .. } => Type::Boolean,
        NodeKind::None => Type::None,
        NodeKind::List { items } => Type::list(Type::union(
            items.iter().map(|item| ctx.get_type(*item)).collect::<Vec<_>>(),
        )),
        NodeKind::Table { columns, .. } => Type::Table(column_types(ctx, columns)),
        NodeKind::Row { .. } => Type::Unknown,
        NodeKind::Select { .. } => select::select_type(ctx, node),
        NodeKind::Placeholder { ty } => match ty {
            Some(annotation) => ctx.get_type(*annotation),
            None => Type::Placeholder(node),
        },
        // A built-in body has the declared output of its function.
        NodeKind::Native { .. } => match tree.parent(node).map(|p| tree.kind(p)) {
            Some(NodeKind::Function {
                output: Some(output),
                ..
            }) => ctx.get_type(*output),
            _ => Type::Unknown,
        },

        NodeKind::NameType { name, type_inputs } => {
            match scope::resolve_name(ctx, node, name) {
                Some(Definition::Structure(structure)) => {
                    structure_type(ctx, structure, type_inputs)
                }
                Some(Definition::TypeVariable(variable)) => Type::TypeVariable(variable),
                _ => Type::UnknownName {
                    node,
                    name: Some(name.clone()),
                    subject: None,
                },
            }
        }
        NodeKind::BooleanType => Type::Boolean,
        NodeKind::NoneType => Type::None,
        NodeKind::TextType { text } => Type::Text(text.clone()),
        NodeKind::MeasurementType { unit } => Type::Measurement(unit.clone()),
        NodeKind::ListType { item } => Type::list(ctx.get_type(*item)),
        NodeKind::UnionType { left, right } => {
            Type::union([ctx.get_type(*left), ctx.get_type(*right)])
        }
        NodeKind::StreamType { item } => Type::stream(ctx.get_type(*item)),
        NodeKind::TableType { columns } => Type::Table(column_types(ctx, columns)),
        NodeKind::TypePlaceholder => Type::Placeholder(node),
        NodeKind::TypeLiteral { ty } => ty.clone(),
    }
}

/// The instance type of `structure` with its type variables bound, in
/// order, to the given type annotations or expressions.
pub(crate) fn structure_type(
    ctx: &mut Context<'_>,
    structure: NodeId,
    type_inputs: &[NodeId],
) -> Type {
    let type_variables = match ctx.tree().kind(structure) {
        NodeKind::Structure { type_variables, .. } => type_variables.as_slice(),
        _ => &[],
    };
    Type::Structure {
        definition: structure,
        type_inputs: type_variables
            .iter()
            .zip(type_inputs)
            .map(|(variable, input)| (*variable, ctx.get_type(*input)))
            .collect(),
    }
}

/// The native family a built-in function was registered on.
pub(crate) fn native_family(ctx: &Context<'_>, function: NodeId) -> Option<NativeTypeName> {
    let tree = ctx.tree();
    let NodeKind::Function { body: Some(body), .. } = tree.kind(function) else {
        return None;
    };
    let NodeKind::Native { function: hash } = tree.kind(*body) else {
        return None;
    };
    ctx.registry().get_function(*hash).map(|f| f.on)
}

/// Specialize a type from a built-in's signature to the value it was
/// resolved on.
///
/// Measurement built-ins declare unitless measurements to mean "the
/// subject's unit".
pub(crate) fn specialize(
    ctx: &Context<'_>,
    function: NodeId,
    subject: Option<&Type>,
    ty: Type,
) -> Type {
    match (native_family(ctx, function), subject, &ty) {
        (
            Some(NativeTypeName::Measurement),
            Some(Type::Measurement(unit)),
            Type::Measurement(declared),
        ) if declared.is_unitless() => Type::Measurement(unit.clone()),
        _ => ty,
    }
}

/// Whether `ty` is known well enough to report a mismatch against it.
pub(crate) fn is_checkable(ty: &Type) -> bool {
    !ty.is_unresolved() && !matches!(ty, Type::Any | Type::TypeVariable(_))
}
