//! Step compilation.
//!
//! An expression compiles to a flat list of [`Step`]s: a start bracket for
//! itself, the steps of its operands in evaluation order, and a finish
//! bracket. Nodes without operands compile to a single `StartFinish`.
//! Conditionals, short-circuiting operators and reactions add jumps.
//!
//! ```text
//! a ? b : c           a & b               init … cond … next
//!
//! start ?             start &             start …
//! <a>                 <a>                 jump-if-unset ─┐
//! jump-if-false ─┐    short-circuit ───┐  <cond>         │
//! <b>            │    <b>              │  jump-if-false ┐│
//! jump ─────────┐│    finish &         │  <next>        ││
//! <c> ◄─────────┼┘    ◄────────────────┘  jump ───────┐ ││
//! finish ? ◄────┘                         recall ◄────┼─┘│
//!                                         jump ──────┐│  │
//!                                         <init> ◄───┼┼──┘
//!                                         finish … ◄─┴┘
//! ```
//!
//! A [`Program`] bundles the steps of a source with the plans the runtime
//! enters when calling functions, constructing structures and running
//! select queries, and the static facts the finish handlers need.

mod emitter;
mod step;

pub use emitter::{JumpLabel, StepEmitter};
pub use step::{Step, StepKind};

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use verse_core::{Column, Names, NodeId, NodeKind, Tree, Type};
use verse_registry::StreamId;

use crate::context::Context;
use crate::definition::Definition;
use crate::dependencies::stream_dependencies;
use crate::reference;
use crate::typing::{column_types, selected_columns, stream_of};

/// The operands of `node`, in evaluation order.
///
/// Conditionals and reactions are compiled with jumps and have no generic
/// operand list. Type annotations, rows and definitions are never operands:
/// they are not evaluated as part of their parent.
pub fn operands(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    match tree.kind(node) {
        NodeKind::Block { statements } => statements.clone(),
        NodeKind::Bind { value, .. } => value.iter().copied().collect(),
        NodeKind::Property { subject, .. } => vec![*subject],
        NodeKind::Evaluate { fun, inputs, .. } => {
            std::iter::once(*fun).chain(inputs.iter().copied()).collect()
        }
        NodeKind::Binary { left, right, .. } => vec![*left, *right],
        NodeKind::Unary { operand, .. } => vec![*operand],
        NodeKind::Is { expression, .. } => vec![*expression],
        NodeKind::Previous { index, .. } => vec![*index],
        NodeKind::List { items } => items.clone(),
        NodeKind::Table { rows, .. } => rows
            .iter()
            .flat_map(|row| match tree.kind(*row) {
                NodeKind::Row { cells } => cells.clone(),
                _ => Vec::new(),
            })
            .collect(),
        NodeKind::Select { table, .. } => vec![*table],
        _ => Vec::new(),
    }
}

/// Whether `node` is `&` or `|`.
pub fn short_circuits(tree: &Tree, node: NodeId) -> bool {
    matches!(tree.kind(node), NodeKind::Binary { operator, .. } if operator == "&" || operator == "|")
}

/// The number of inputs a call must supply: every input up to the last one
/// without a default.
pub fn minimum_inputs(tree: &Tree, inputs: &[NodeId]) -> usize {
    inputs
        .iter()
        .rposition(|input| matches!(tree.kind(*input), NodeKind::Bind { value: None, .. }))
        .map_or(0, |i| i + 1)
}

/// Append the steps of `node`.
pub fn compile_node(emitter: &mut StepEmitter, tree: &Tree, node: NodeId) {
    match tree.kind(node) {
        NodeKind::Conditional {
            condition,
            yes,
            no,
        } => {
            emitter.emit(StepKind::Start, node);
            compile_node(emitter, tree, *condition);
            let to_no = emitter.emit_jump(StepKind::JumpIfFalse(0), node);
            compile_node(emitter, tree, *yes);
            let to_end = emitter.emit_jump(StepKind::Jump(0), node);
            emitter.patch_jump(to_no);
            compile_node(emitter, tree, *no);
            emitter.patch_jump(to_end);
            emitter.emit(StepKind::Finish, node);
        }
        NodeKind::Binary {
            operator,
            left,
            right,
        } if operator == "&" || operator == "|" => {
            emitter.emit(StepKind::Start, node);
            compile_node(emitter, tree, *left);
            // The decided left operand is the result; skip past the finish.
            let decided = emitter.emit_jump(
                StepKind::ShortCircuit {
                    when: operator == "|",
                    skip: 0,
                },
                node,
            );
            compile_node(emitter, tree, *right);
            emitter.emit(StepKind::Finish, node);
            emitter.patch_jump(decided);
        }
        NodeKind::Reaction {
            initial,
            condition,
            next,
        } => {
            emitter.emit(StepKind::Start, node);
            let to_initial = emitter.emit_jump(StepKind::JumpIfUnset(0), node);
            compile_node(emitter, tree, *condition);
            let to_recall = emitter.emit_jump(StepKind::JumpIfFalse(0), node);
            compile_node(emitter, tree, *next);
            let from_next = emitter.emit_jump(StepKind::Jump(0), node);
            emitter.patch_jump(to_recall);
            emitter.emit(StepKind::Recall, node);
            let from_recall = emitter.emit_jump(StepKind::Jump(0), node);
            emitter.patch_jump(to_initial);
            compile_node(emitter, tree, *initial);
            emitter.patch_jump(from_next);
            emitter.patch_jump(from_recall);
            emitter.emit(StepKind::Finish, node);
        }
        _ => {
            let operands = operands(tree, node);
            if operands.is_empty() {
                emitter.emit(StepKind::StartFinish, node);
                return;
            }
            emitter.emit(StepKind::Start, node);
            for operand in operands {
                compile_node(emitter, tree, operand);
            }
            emitter.emit(StepKind::Finish, node);
        }
    }
}

/// The steps of `node` on their own.
pub fn compile_steps(tree: &Tree, node: NodeId) -> Rc<[Step]> {
    let mut emitter = StepEmitter::new();
    compile_node(&mut emitter, tree, node);
    emitter.finish().into()
}

/// Defaults of the unsupplied inputs, then `rest`.
fn plan(tree: &Tree, inputs: &[NodeId], supplied: usize, rest: &[NodeId]) -> Rc<[Step]> {
    let mut emitter = StepEmitter::new();
    for input in inputs.iter().skip(supplied).chain(rest) {
        compile_node(&mut emitter, tree, *input);
    }
    emitter.finish().into()
}

// ============================================================================
// Program
// ============================================================================

/// A compiled source.
#[derive(Debug, Clone)]
pub struct Program {
    source: NodeId,
    root: Rc<[Step]>,
    /// Entry plans keyed by definition and number of supplied inputs.
    functions: FxHashMap<(NodeId, usize), Rc<[Step]>>,
    constructors: FxHashMap<(NodeId, usize), Rc<[Step]>>,
    queries: FxHashMap<NodeId, Rc<[Step]>>,
    streams_of: FxHashMap<NodeId, StreamId>,
    tested: FxHashMap<NodeId, Type>,
    reactions: FxHashMap<NodeId, Names>,
    references: FxHashMap<NodeId, Definition>,
    tables: FxHashMap<NodeId, Vec<Column>>,
    streams: FxHashSet<StreamId>,
}

impl Program {
    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn root(&self) -> &Rc<[Step]> {
        &self.root
    }

    /// The plan entered when calling `function` with `supplied` inputs.
    pub fn function(&self, function: NodeId, supplied: usize) -> Option<&Rc<[Step]>> {
        self.functions.get(&(function, supplied))
    }

    pub fn constructor(&self, structure: NodeId, supplied: usize) -> Option<&Rc<[Step]>> {
        self.constructors.get(&(structure, supplied))
    }

    /// The steps of a select's query, run once per row.
    pub fn query(&self, select: NodeId) -> Option<&Rc<[Step]>> {
        self.queries.get(&select)
    }

    /// The stream a `Changed`, `Previous` or stream reference reads.
    pub fn stream_of(&self, node: NodeId) -> Option<StreamId> {
        self.streams_of.get(&node).copied()
    }

    /// The type an `Is` tests against.
    pub fn tested(&self, is: NodeId) -> Option<&Type> {
        self.tested.get(&is)
    }

    /// The names a reaction's remembered value is bound to.
    pub fn reaction_names(&self, reaction: NodeId) -> Option<&Names> {
        self.reactions.get(&reaction)
    }

    /// What a reference resolves to, for references to functions,
    /// structures, streams and constants.
    pub fn reference(&self, reference: NodeId) -> Option<Definition> {
        self.references.get(&reference).copied()
    }

    /// Columns of a table literal, or the columns a select keeps.
    pub fn columns(&self, node: NodeId) -> Option<&[Column]> {
        self.tables.get(&node).map(Vec::as_slice)
    }

    /// Whether an emission on `stream` can change the program's value.
    pub fn depends_on(&self, stream: StreamId) -> bool {
        self.streams.contains(&stream)
    }

    pub fn streams(&self) -> &FxHashSet<StreamId> {
        &self.streams
    }
}

/// Compile the context's source and every definition it can call.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile(ctx: &mut Context<'_>) -> Program {
    let tree = ctx.tree();
    let source = ctx.source();
    let mut program = Program {
        source,
        root: compile_steps(tree, source),
        functions: FxHashMap::default(),
        constructors: FxHashMap::default(),
        queries: FxHashMap::default(),
        streams_of: FxHashMap::default(),
        tested: FxHashMap::default(),
        reactions: FxHashMap::default(),
        references: FxHashMap::default(),
        tables: FxHashMap::default(),
        streams: FxHashSet::default(),
    };

    let nodes = tree
        .descendants(source)
        .into_iter()
        .chain(tree.descendants(ctx.project().native_root()));
    for node in nodes {
        match tree.kind(node) {
            NodeKind::Function { inputs, body, .. } => {
                let body: Vec<NodeId> = body.iter().copied().collect();
                for supplied in minimum_inputs(tree, inputs)..=inputs.len() {
                    program
                        .functions
                        .insert((node, supplied), plan(tree, inputs, supplied, &body));
                }
            }
            NodeKind::Structure {
                inputs, members, ..
            } => {
                for supplied in minimum_inputs(tree, inputs)..=inputs.len() {
                    program
                        .constructors
                        .insert((node, supplied), plan(tree, inputs, supplied, members));
                }
            }
            NodeKind::Select { query, .. } => {
                program.queries.insert(node, compile_steps(tree, *query));
                let columns = selected_columns(ctx, node);
                program.tables.insert(node, columns);
            }
            NodeKind::Table { columns, .. } => {
                let columns = column_types(ctx, columns);
                program.tables.insert(node, columns);
            }
            NodeKind::Is { ty, .. } => {
                let tested = ctx.get_type(*ty);
                program.tested.insert(node, tested);
            }
            NodeKind::Changed { .. } | NodeKind::Previous { .. } => {
                if let Some(stream) = stream_of(ctx, node) {
                    program.streams_of.insert(node, stream);
                }
            }
            NodeKind::Reaction { .. } => {
                let names = tree
                    .ancestors(node)
                    .find_map(|a| match tree.kind(a) {
                        NodeKind::Bind { names, .. } => Some(names.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();
                program.reactions.insert(node, names);
            }
            NodeKind::Reference { .. } => match reference::resolve(ctx, node) {
                Some(Definition::Stream(stream)) => {
                    program.streams_of.insert(node, stream);
                    program.references.insert(node, Definition::Stream(stream));
                }
                Some(
                    definition @ (Definition::Function(_)
                    | Definition::Structure(_)
                    | Definition::Value(_)),
                ) => {
                    program.references.insert(node, definition);
                }
                _ => {}
            },
            _ => {}
        }
    }

    program.streams = stream_dependencies(ctx, source);
    debug!(
        %source,
        steps = program.root.len(),
        functions = program.functions.len(),
        streams = program.streams.len(),
        "compiled source"
    );
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use verse_core::TreeBuilder;

    use crate::testing::{finish, fixture};

    fn kinds(steps: &[Step]) -> Vec<StepKind> {
        steps.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn operands_are_bracketed() {
        let mut b = TreeBuilder::new();
        let one = b.number(1.0);
        let two = b.number(2.0);
        let sum = b.binary("+", one, two);
        let tree = b.finish().unwrap();

        let steps = compile_steps(&tree, sum);
        assert_eq!(
            steps.iter().map(|s| (s.kind, s.node)).collect::<Vec<_>>(),
            [
                (StepKind::Start, sum),
                (StepKind::StartFinish, one),
                (StepKind::StartFinish, two),
                (StepKind::Finish, sum),
            ]
        );
    }

    #[test]
    fn conditional_jumps() {
        let mut b = TreeBuilder::new();
        let condition = b.boolean(true);
        let yes = b.number(1.0);
        let no = b.number(2.0);
        let conditional = b.conditional(condition, yes, no);
        let tree = b.finish().unwrap();

        let steps = compile_steps(&tree, conditional);
        assert_eq!(
            kinds(&steps),
            [
                StepKind::Start,
                StepKind::StartFinish,
                StepKind::JumpIfFalse(2),
                StepKind::StartFinish,
                StepKind::Jump(1),
                StepKind::StartFinish,
                StepKind::Finish,
            ]
        );
        // The false branch lands on `no`, the true branch skips it.
        assert_eq!(steps[2 + 1 + 2].node, no);
        assert_eq!(steps[4 + 1 + 1].kind, StepKind::Finish);
    }

    #[test]
    fn short_circuit_skips_the_finish() {
        let mut b = TreeBuilder::new();
        let left = b.boolean(false);
        let right = b.boolean(true);
        let both = b.binary("&", left, right);
        let tree = b.finish().unwrap();

        let steps = compile_steps(&tree, both);
        assert_eq!(
            kinds(&steps),
            [
                StepKind::Start,
                StepKind::StartFinish,
                StepKind::ShortCircuit {
                    when: false,
                    skip: 2
                },
                StepKind::StartFinish,
                StepKind::Finish,
            ]
        );
        assert_eq!(2 + 1 + 2, steps.len());
    }

    #[test]
    fn reaction_layout() {
        let mut b = TreeBuilder::new();
        let initial = b.number(0.0);
        let condition = b.boolean(true);
        let next = b.number(1.0);
        let reaction = b.reaction(initial, condition, next);
        let tree = b.finish().unwrap();

        let steps = compile_steps(&tree, reaction);
        assert_eq!(
            kinds(&steps),
            [
                StepKind::Start,
                StepKind::JumpIfUnset(6),
                StepKind::StartFinish,
                StepKind::JumpIfFalse(2),
                StepKind::StartFinish,
                StepKind::Jump(3),
                StepKind::Recall,
                StepKind::Jump(1),
                StepKind::StartFinish,
                StepKind::Finish,
            ]
        );
        assert_eq!(steps[1 + 1 + 6].node, initial);
        assert_eq!(steps[3 + 1 + 2].kind, StepKind::Recall);
        assert_eq!(steps[5 + 1 + 3].kind, StepKind::Finish);
    }

    #[test]
    fn plans_per_supplied_input_count() {
        let mut p = fixture();
        let b = p.builder();
        let a = b.bind("a", None, None);
        let two = b.number(2.0);
        let c = b.bind("c", None, Some(two));
        let body = b.reference("a");
        let f = b.function("f", vec![a, c], None, Some(body));
        let root = b.block(vec![f]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let program = compile(&mut ctx);
        assert!(program.function(f, 0).is_none());
        let one_supplied = program.function(f, 1).unwrap();
        assert_eq!(
            one_supplied.iter().map(|s| s.node).collect::<Vec<_>>(),
            [c, two, c, body]
        );
        assert_eq!(program.function(f, 2).unwrap().len(), 1);
        assert_eq!(minimum_inputs(project.tree(), &[a, c]), 1);
    }

    #[test]
    fn static_tables() {
        let mut p = fixture();
        let b = p.builder();
        let time = b.reference("Time");
        let changed = b.changed(time);
        let zero = b.number(0.0);
        let one = b.number(1.0);
        let reaction = b.reaction(zero, changed, one);
        let ticks = b.bind("ticks", None, Some(reaction));
        let subject = b.reference("ticks");
        let number = b.measurement_type("");
        let is = b.is(subject, number);
        let root = b.block(vec![ticks, is]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let program = compile(&mut ctx);
        let stream = program.stream_of(changed).unwrap();
        assert!(program.depends_on(stream));
        assert_eq!(program.reaction_names(reaction), Some(&Names::one("ticks")));
        assert_eq!(program.tested(is), Some(&Type::number()));
        assert_eq!(program.reference(time), Some(Definition::Stream(stream)));
        assert_eq!(program.reference(subject), None);
    }
}
