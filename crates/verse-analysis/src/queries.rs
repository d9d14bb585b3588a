//! Read-only queries for editors.
//!
//! Nothing here changes a tree; editors build new nodes and a new context.
//! Both queries accept ids from outside the project's tree and answer
//! nothing for them.

use verse_core::{NodeId, NodeKind, Type};

use crate::context::Context;
use crate::definition::Definition;
use crate::{property, scope};

/// Definitions a name at `node` could refer to, nearest first.
///
/// For a member access these are the subject's members; otherwise every
/// definition in scope.
pub fn definitions_at(ctx: &mut Context<'_>, node: NodeId) -> Vec<Definition> {
    match ctx.tree().get(node).map(|n| &n.kind) {
        Some(NodeKind::Property { .. }) => property::candidates(ctx, node),
        Some(_) => scope::visible_definitions(ctx, node),
        None => Vec::new(),
    }
}

/// The analyzed type of `node`, or `None` when it is not in the project.
pub fn type_of(ctx: &mut Context<'_>, node: NodeId) -> Option<Type> {
    ctx.tree().get(node)?;
    Some(ctx.get_type(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{finish, fixture};
    use verse_core::TreeBuilder;

    #[test]
    fn names_in_scope_then_globals() {
        let mut p = fixture();
        let b = p.builder();
        let one = b.number(1.0);
        let x = b.bind("x", None, Some(one));
        let here = b.placeholder();
        let root = b.block(vec![x, here]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let found = definitions_at(&mut ctx, here);
        assert_eq!(found.first(), Some(&Definition::Bind(x)));
        assert!(found.iter().any(|d| matches!(d, Definition::Stream(_))));
        assert!(found.iter().any(|d| matches!(d, Definition::Value(_))));
        assert_eq!(type_of(&mut ctx, x), Some(Type::number()));
    }

    #[test]
    fn members_of_the_subject() {
        let mut p = fixture();
        let b = p.builder();
        let text = b.text("hi");
        let member = b.property(text, "len");
        let root = b.block(vec![member]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let names: Vec<String> = definitions_at(&mut ctx, member)
            .into_iter()
            .map(|d| d.names(&project).preferred().to_string())
            .collect();
        assert!(names.contains(&"length".to_string()));
        assert!(names.contains(&"repeat".to_string()));
    }

    #[test]
    fn ids_from_another_tree_answer_nothing() {
        let mut p = fixture();
        let b = p.builder();
        let one = b.number(1.0);
        let root = b.block(vec![one]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let mut other = TreeBuilder::new();
        let mut foreign = other.none();
        for _ in 0..project.tree().len() {
            foreign = other.none();
        }

        assert_eq!(type_of(&mut ctx, foreign), None);
        assert!(definitions_at(&mut ctx, foreign).is_empty());
    }
}
