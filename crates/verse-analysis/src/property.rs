//! Member access: `subject.name`.
//!
//! Members of a structure value are its inputs and members. Every other
//! value answers with the built-in functions of its native family, so
//! `'hi'.length` names the built-in `length` on text.

use verse_core::{NodeId, NodeKind, Type};

use crate::context::Context;
use crate::definition::Definition;
use crate::dependencies::Dependency;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::narrowing::{self, Target};
use crate::typing;

fn parts<'p>(ctx: &Context<'p>, property: NodeId) -> Option<(NodeId, Option<&'p str>)> {
    match ctx.tree().kind(property) {
        NodeKind::Property { subject, name } => Some((*subject, name.as_deref())),
        _ => None,
    }
}

/// The type members are looked up on, unwrapped through streams.
pub fn subject_type(ctx: &mut Context<'_>, property: NodeId) -> Type {
    match parts(ctx, property) {
        Some((subject, _)) => ctx.get_type(subject).unwrap_stream().clone(),
        None => Type::Unknown,
    }
}

/// The structure definition of the subject, when the subject is a structure.
pub(crate) fn subject_structure(ctx: &mut Context<'_>, property: NodeId) -> Option<NodeId> {
    match subject_type(ctx, property) {
        Type::Structure { definition, .. } => Some(definition),
        _ => None,
    }
}

/// Every definition that could be named on the subject.
pub fn candidates(ctx: &mut Context<'_>, property: NodeId) -> Vec<Definition> {
    let subject = subject_type(ctx, property);
    let tree = ctx.tree();
    match &subject {
        Type::Structure { definition, .. } => match tree.kind(*definition) {
            NodeKind::Structure { inputs, members, .. } => inputs
                .iter()
                .chain(members)
                .filter_map(|n| Definition::from_node(tree, *n))
                .collect(),
            _ => Vec::new(),
        },
        other => match other.native_name() {
            Some(family) => ctx
                .registry()
                .functions_on(family)
                .into_iter()
                .map(|(_, function)| Definition::Function(function))
                .collect(),
            None => Vec::new(),
        },
    }
}

/// The definition a member access names, resolved once per pass.
pub fn resolve(ctx: &mut Context<'_>, property: NodeId) -> Option<Definition> {
    if let Some(cached) = ctx.cached_resolution(property) {
        return cached;
    }
    let definition = match parts(ctx, property) {
        Some((_, Some(name))) => {
            let project = ctx.project();
            candidates(ctx, property)
                .into_iter()
                .find(|d| d.has_name(project, name))
        }
        _ => None,
    };
    ctx.cache_resolution(property, definition);
    definition
}

pub(crate) fn compute_type(ctx: &mut Context<'_>, property: NodeId) -> Type {
    let subject = subject_type(ctx, property);
    let definition = match resolve(ctx, property) {
        Some(definition) if !definition.is_type_variable() => definition,
        _ => {
            return Type::UnknownName {
                node: property,
                name: parts(ctx, property).and_then(|(_, n)| n).map(str::to_string),
                subject: Some(Box::new(subject)),
            };
        }
    };

    let mut ty = ctx.definition_type(definition);
    if let Type::Stream(item) = ty {
        return *item;
    }
    let Definition::Bind(_) = definition else {
        return ty;
    };

    // Generic members take the subject's binding of their type variable.
    if let (Type::TypeVariable(variable), Type::Structure { type_inputs, .. }) = (&ty, &subject) {
        if let Some((_, bound)) = type_inputs.iter().find(|(v, _)| v == variable) {
            ty = bound.clone();
        }
    }

    if !ty.is_union() {
        return ty;
    }
    if let Some(narrowed) = ctx.get_reference_type(property) {
        return narrowed.clone();
    }
    match subject {
        Type::Structure { definition: structure, .. } => narrowing::narrow(
            ctx,
            property,
            Target::Member {
                structure,
                member: definition,
            },
            &ty,
        ),
        _ => ty,
    }
}

pub(crate) fn diagnostics(ctx: &mut Context<'_>, property: NodeId) -> Vec<Diagnostic> {
    if resolve(ctx, property).is_some() {
        return Vec::new();
    }
    let subject = subject_type(ctx, property);
    if !typing::is_checkable(&subject) {
        return Vec::new();
    }
    let name = parts(ctx, property)
        .and_then(|(_, n)| n)
        .unwrap_or_default()
        .to_string();
    vec![Diagnostic::new(DiagnosticKind::UnknownProperty {
        property,
        name,
        subject,
    })]
}

pub(crate) fn dependencies(ctx: &Context<'_>, property: NodeId) -> Vec<Dependency> {
    parts(ctx, property)
        .map(|(subject, _)| vec![Dependency::Node(subject)])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{finish, fixture};

    #[test]
    fn builtin_member_on_text() {
        let mut p = fixture();
        let b = p.builder();
        let text = b.text("hello");
        let length = b.property(text, "length");
        let call = b.evaluate(length, vec![]);
        let root = b.block(vec![call]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let builtin = project
            .registry()
            .function(verse_core::NativeTypeName::Text, "length")
            .unwrap();
        assert_eq!(resolve(&mut ctx, length), Some(Definition::Function(builtin)));
        assert_eq!(ctx.get_type(call), Type::number());
        assert!(diagnostics(&mut ctx, length).is_empty());
    }

    #[test]
    fn unknown_property() {
        let mut p = fixture();
        let b = p.builder();
        let yes = b.boolean(true);
        let missing = b.property(yes, "size");
        let root = b.block(vec![missing]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let found = diagnostics(&mut ctx, missing);
        assert!(matches!(
            found.as_slice(),
            [d] if matches!(d.kind(), DiagnosticKind::UnknownProperty { name, subject, .. }
                if name == "size" && *subject == Type::Boolean)
        ));
        assert!(matches!(
            ctx.get_type(missing),
            Type::UnknownName { subject: Some(s), .. } if *s == Type::Boolean
        ));
    }

    #[test]
    fn structure_members_and_generic_substitution() {
        let mut p = fixture();
        let b = p.builder();
        let t = b.type_variable("T");
        let t_type = b.name_type("T", vec![]);
        let item = b.bind("item", Some(t_type), None);
        let boxed = b.add(NodeKind::Structure {
            names: verse_core::Names::one("Box"),
            type_variables: vec![t],
            inputs: vec![item],
            members: vec![],
        });
        let box_ref = b.reference("Box");
        let text_type = b.text_type();
        let hello = b.text("hello");
        let make = b.add(NodeKind::Evaluate {
            fun: box_ref,
            type_inputs: vec![text_type],
            inputs: vec![hello],
        });
        let member = b.property(make, "item");
        let root = b.block(vec![boxed, member]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(resolve(&mut ctx, member), Some(Definition::Bind(item)));
        assert_eq!(ctx.get_type(member), Type::text());
        assert_eq!(candidates(&mut ctx, member), vec![Definition::Bind(item)]);
    }

    #[test]
    fn stream_subjects_are_unwrapped() {
        let mut p = fixture();
        let b = p.builder();
        let key = b.reference("Key");
        let length = b.property(key, "length");
        let root = b.block(vec![length]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(subject_type(&mut ctx, length), Type::text());
        assert!(resolve(&mut ctx, length).is_some());
    }
}
