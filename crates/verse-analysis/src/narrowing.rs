//! Flow-sensitive union narrowing.
//!
//! A reference to a definition declared with a union type can be narrowed
//! by type tests guarding the branch it sits in:
//!
//! ```text
//! x: # | '' = …
//! x • # ? x + 1 : x.length()
//! ```
//!
//! In the yes branch `x` is `#`, in the no branch it is `''`. The guards of
//! a reference are the conditionals among its ancestors whose condition
//! tests the same definition with `•`. Narrowing starts at the outermost
//! guard with the full set of declared types and walks down in execution
//! order, splitting the set at every conditional and short-circuiting
//! operator and recording the set that reaches each matching reference.
//! Nested guards therefore compose outer first. A set only ever shrinks; a
//! branch that contradicts an enclosing guard narrows to `Never`.

use tracing::trace;

use verse_core::{NodeId, NodeKind, Type, TypeSet};

use crate::context::Context;
use crate::definition::Definition;
use crate::{property, reference};

/// What is being narrowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A definition named by bare references.
    Name(Definition),
    /// A member of one structure type, named by member accesses.
    Member {
        structure: NodeId,
        member: Definition,
    },
}

/// Whether `node` reads the target.
fn matches(ctx: &mut Context<'_>, node: NodeId, target: Target) -> bool {
    match (ctx.tree().kind(node), target) {
        (NodeKind::Reference { .. }, Target::Name(definition)) => {
            reference::resolve(ctx, node) == Some(definition)
        }
        (NodeKind::Property { .. }, Target::Member { structure, member }) => {
            property::subject_structure(ctx, node) == Some(structure)
                && property::resolve(ctx, node) == Some(member)
        }
        _ => false,
    }
}

/// Whether `condition` contains a type test of the target.
fn tests_target(ctx: &mut Context<'_>, condition: NodeId, target: Target) -> bool {
    let tree = ctx.tree();
    tree.descendants(condition).into_iter().any(|node| {
        tree.parent(node)
            .is_some_and(|p| matches!(tree.kind(p), NodeKind::Is { expression, .. } if *expression == node))
            && matches(ctx, node, target)
    })
}

/// Conditionals guarding `node` with a test of the target, outermost first.
pub fn guards(ctx: &mut Context<'_>, node: NodeId, target: Target) -> Vec<NodeId> {
    let tree = ctx.tree();
    let mut out: Vec<NodeId> = tree
        .ancestors(node)
        .filter(|a| match tree.kind(*a) {
            NodeKind::Conditional { condition, .. } => tests_target(ctx, *condition, target),
            _ => false,
        })
        .collect();
    out.reverse();
    out
}

/// The type of `node` narrowed by its guards, given the target's declared
/// type. Without guards the declared type is returned unchanged.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn narrow(ctx: &mut Context<'_>, node: NodeId, target: Target, declared: &Type) -> Type {
    let Some(root) = guards(ctx, node, target).first().copied() else {
        return declared.clone();
    };
    let full = declared.type_set();
    trace!(%node, %root, candidates = full.len(), "narrowing from guard");
    walk(ctx, root, target, &full);
    ctx.get_reference_type(node)
        .cloned()
        .unwrap_or_else(|| declared.clone())
}

/// Record the set reaching every read of the target under `node`.
fn walk(ctx: &mut Context<'_>, node: NodeId, target: Target, current: &TypeSet) {
    if matches(ctx, node, target) {
        ctx.set_reference_type(node, Type::possible_union(current));
        return;
    }
    let tree = ctx.tree();
    match tree.kind(node) {
        NodeKind::Conditional {
            condition,
            yes,
            no,
        } => {
            walk(ctx, *condition, target, current);
            let positive = partition(ctx, *condition, true, target, current);
            walk(ctx, *yes, target, &positive);
            let negative = partition(ctx, *condition, false, target, current);
            walk(ctx, *no, target, &negative);
        }
        // The right operand only runs when the left did not decide.
        NodeKind::Binary {
            operator,
            left,
            right,
        } if operator == "&" || operator == "|" => {
            walk(ctx, *left, target, current);
            let reaching = partition(ctx, *left, operator == "&", target, current);
            walk(ctx, *right, target, &reaching);
        }
        kind => {
            for child in kind.children() {
                walk(ctx, child, target, current);
            }
        }
    }
}

/// The members of `current` for which `condition` evaluates to `positive`.
pub fn partition(
    ctx: &mut Context<'_>,
    condition: NodeId,
    positive: bool,
    target: Target,
    current: &TypeSet,
) -> TypeSet {
    let tree = ctx.tree();
    match tree.kind(condition) {
        NodeKind::Is { expression, ty } if matches(ctx, *expression, target) => {
            let tested = ctx.get_type(*ty);
            if positive {
                current.accepted_by(&tested)
            } else {
                current.rejected_by(&tested)
            }
        }
        NodeKind::Unary { operator, operand } if operator == "~" => {
            partition(ctx, *operand, !positive, target, current)
        }
        NodeKind::Binary {
            operator,
            left,
            right,
        } if operator == "&" || operator == "|" => {
            // `a & b` holds when both hold; `a | b` fails when both fail.
            let decisive = operator == "&";
            let left_taken = partition(ctx, *left, decisive, target, current);
            let both = partition(ctx, *right, decisive, target, &left_taken);
            if positive == decisive {
                both
            } else {
                let left_other = partition(ctx, *left, !decisive, target, current);
                let right_other = partition(ctx, *right, !decisive, target, &left_taken);
                either(current, &left_other, &right_other)
            }
        }
        _ => current.clone(),
    }
}

/// Members of `current` in either set, in `current`'s order.
fn either(current: &TypeSet, a: &TypeSet, b: &TypeSet) -> TypeSet {
    TypeSet::new(
        current
            .list()
            .iter()
            .filter(|t| a.contains(t) || b.contains(t))
            .cloned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use verse_core::TreeBuilder;

    use crate::testing::{finish, fixture};

    /// `x: # | '' = 1`
    fn union_bind(b: &mut TreeBuilder) -> NodeId {
        let number = b.measurement_type("");
        let text = b.text_type();
        let either = b.union_type(number, text);
        let one = b.number(1.0);
        b.bind("x", Some(either), Some(one))
    }

    fn is_number(b: &mut TreeBuilder) -> NodeId {
        let x = b.reference("x");
        let number = b.measurement_type("");
        b.is(x, number)
    }

    fn declared() -> Type {
        Type::union([Type::number(), Type::text()])
    }

    #[test]
    fn branches_of_a_guard() {
        let mut p = fixture();
        let b = p.builder();
        let x = union_bind(b);
        let test = is_number(b);
        let yes = b.reference("x");
        let no = b.reference("x");
        let guard = b.conditional(test, yes, no);
        let outside = b.reference("x");
        let root = b.block(vec![x, guard, outside]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(ctx.get_type(yes), Type::number());
        assert_eq!(ctx.get_type(no), Type::text());
        assert_eq!(ctx.get_type(outside), declared());
        assert_eq!(guards(&mut ctx, yes, Target::Name(Definition::Bind(x))), [guard]);
    }

    #[test]
    fn negation_flips_the_branches() {
        let mut p = fixture();
        let b = p.builder();
        let x = union_bind(b);
        let test = is_number(b);
        let not = b.unary("~", test);
        let yes = b.reference("x");
        let no = b.reference("x");
        let guard = b.conditional(not, yes, no);
        let root = b.block(vec![x, guard]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(ctx.get_type(yes), Type::text());
        assert_eq!(ctx.get_type(no), Type::number());
    }

    #[test]
    fn conjunction_narrows_its_right_operand() {
        let mut p = fixture();
        let b = p.builder();
        let x = union_bind(b);
        let test = is_number(b);
        let right = b.reference("x");
        let zero = b.number(0.0);
        let positive = b.binary(">", right, zero);
        let both = b.binary("&", test, positive);
        let yes = b.reference("x");
        let no = b.reference("x");
        let guard = b.conditional(both, yes, no);
        let root = b.block(vec![x, guard]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(ctx.get_type(right), Type::number());
        assert_eq!(ctx.get_type(yes), Type::number());
        // Either test may have failed.
        assert_eq!(ctx.get_type(no), declared());
        assert!(crate::diagnostics::analyze(&mut ctx).is_empty());
    }

    #[test]
    fn nested_guards_compose_and_contradictions_are_never() {
        let mut p = fixture();
        let b = p.builder();
        let x = union_bind(b);
        let outer_test = is_number(b);
        let inner_test = is_number(b);
        let consistent = b.reference("x");
        let contradiction = b.reference("x");
        let inner = b.conditional(inner_test, consistent, contradiction);
        let otherwise = b.reference("x");
        let outer = b.conditional(outer_test, inner, otherwise);
        let root = b.block(vec![x, outer]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let target = Target::Name(Definition::Bind(x));
        assert_eq!(guards(&mut ctx, contradiction, target), [outer, inner]);
        assert_eq!(ctx.get_type(consistent), Type::number());
        assert_eq!(ctx.get_type(contradiction), Type::Never);
        assert_eq!(ctx.get_type(otherwise), Type::text());
    }

    #[test]
    fn narrowed_sets_are_subsets_of_the_declaration() {
        let mut p = fixture();
        let b = p.builder();
        let x = union_bind(b);
        let test = is_number(b);
        let left = b.reference("x");
        let text = b.text_type();
        let is_text = b.is(left, text);
        let any = b.binary("|", test, is_text);
        let yes = b.reference("x");
        let no = b.reference("x");
        let guard = b.conditional(any, yes, no);
        let root = b.block(vec![x, guard]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let full = declared().type_set();
        for node in [yes, no, left] {
            assert!(ctx.get_type(node).type_set().is_subset_of(&full));
        }
        assert_eq!(ctx.get_type(yes), declared());
        assert_eq!(ctx.get_type(no), Type::Never);
        assert_eq!(ctx.get_type(left), Type::text());
    }

    #[test]
    fn members_narrow_per_structure() {
        let mut p = fixture();
        let b = p.builder();
        let number = b.measurement_type("");
        let text = b.text_type();
        let union = b.union_type(number, text);
        let value = b.bind("value", Some(union), None);
        let cell = b.structure("Cell", vec![], vec![value], vec![]);
        let cell_ref = b.reference("Cell");
        let one = b.number(1.0);
        let make = b.evaluate(cell_ref, vec![one]);
        let c = b.bind("c", None, Some(make));

        let c1 = b.reference("c");
        let tested = b.property(c1, "value");
        let number_type = b.measurement_type("");
        let test = b.is(tested, number_type);
        let c2 = b.reference("c");
        let yes = b.property(c2, "value");
        let c3 = b.reference("c");
        let no = b.property(c3, "value");
        let guard = b.conditional(test, yes, no);
        let root = b.block(vec![cell, c, guard]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(ctx.get_type(yes), Type::number());
        assert_eq!(ctx.get_type(no), Type::text());
    }
}
