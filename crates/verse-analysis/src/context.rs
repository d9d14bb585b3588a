//! Per-source analysis memo.
//!
//! A [`Context`] lives for one analysis pass over one source. It owns every
//! cache analysis uses, so nodes stay plain immutable data:
//!
//! - `types`: node -> computed type, written once per node
//! - `reference_types`: reference -> type narrowed by enclosing guards
//! - `resolutions`: reference -> the definition it names
//! - `stack`: nodes whose types are being computed, for cycle detection
//!
//! When a cycle closes at a node, the nodes computed above it on the stack
//! saw the cycle type instead of a real one. Their results are returned but
//! not cached; the node the cycle closed at is cached, so a later query of
//! any of them starts from a settled type.
//!
//! Nothing is ever invalidated. When the program changes, build a new
//! context.

use rustc_hash::FxHashMap;
use tracing::trace;

use verse_core::{NodeId, Tree, Type};
use verse_registry::NativeRegistry;

use crate::definition::Definition;
use crate::project::Project;
use crate::typing;

pub struct Context<'p> {
    project: &'p Project,
    source: NodeId,
    types: FxHashMap<NodeId, Type>,
    reference_types: FxHashMap<NodeId, Type>,
    resolutions: FxHashMap<NodeId, Option<Definition>>,
    stack: Vec<NodeId>,
    /// Lowest stack index a cycle closed at during the current computation.
    cycle_floor: Option<usize>,
}

impl<'p> Context<'p> {
    pub fn new(project: &'p Project, source: NodeId) -> Self {
        Self {
            project,
            source,
            types: FxHashMap::default(),
            reference_types: FxHashMap::default(),
            resolutions: FxHashMap::default(),
            stack: Vec::new(),
            cycle_floor: None,
        }
    }

    pub fn project(&self) -> &'p Project {
        self.project
    }

    pub fn tree(&self) -> &'p Tree {
        self.project.tree()
    }

    pub fn registry(&self) -> &'p NativeRegistry {
        self.project.registry()
    }

    /// Root of the source under analysis.
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// The cached type of `node`, if one was computed in this pass.
    pub fn get(&self, node: NodeId) -> Option<&Type> {
        self.types.get(&node)
    }

    // ==========================================================================
    // Recursion guard
    // ==========================================================================

    pub fn visit(&mut self, node: NodeId) {
        self.stack.push(node);
    }

    pub fn unvisit(&mut self) {
        self.stack.pop();
    }

    pub fn visited(&self, node: NodeId) -> bool {
        self.stack.contains(&node)
    }

    /// The type of `node`, computed at most once per pass.
    ///
    /// A node whose type is requested while it is already being computed
    /// gets a [`Type::Cycle`] listing the nodes from its first visit to the
    /// top of the stack. That cycle type is returned, not cached.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not in the project's tree. Use
    /// [`queries::type_of`](crate::queries::type_of) for ids from elsewhere.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn get_type(&mut self, node: NodeId) -> Type {
        if let Some(ty) = self.types.get(&node) {
            return ty.clone();
        }
        if let Some(index) = self.stack.iter().position(|n| *n == node) {
            let stack = self.stack[index..].to_vec();
            trace!(%node, depth = stack.len(), "type depends on itself");
            self.cycle_floor = Some(self.cycle_floor.map_or(index, |f| f.min(index)));
            return Type::Cycle { node, stack };
        }

        self.visit(node);
        let ty = typing::compute_type(self, node);
        self.unvisit();

        let depth = self.stack.len();
        match self.cycle_floor {
            Some(floor) if floor < depth => ty,
            Some(_) => {
                self.cycle_floor = None;
                self.types.entry(node).or_insert(ty).clone()
            }
            None => self.types.entry(node).or_insert(ty).clone(),
        }
    }

    // ==========================================================================
    // Narrowing and resolution caches
    // ==========================================================================

    pub fn get_reference_type(&self, reference: NodeId) -> Option<&Type> {
        self.reference_types.get(&reference)
    }

    /// Record the narrowed type of a reference. The first write wins.
    pub fn set_reference_type(&mut self, reference: NodeId, ty: Type) {
        self.reference_types.entry(reference).or_insert(ty);
    }

    pub(crate) fn cached_resolution(&self, node: NodeId) -> Option<Option<Definition>> {
        self.resolutions.get(&node).copied()
    }

    pub(crate) fn cache_resolution(&mut self, node: NodeId, definition: Option<Definition>) {
        self.resolutions.entry(node).or_insert(definition);
    }

    /// The type a definition declares.
    pub fn definition_type(&mut self, definition: Definition) -> Type {
        match definition {
            Definition::Bind(node) => self.get_type(node),
            // A structure named as a value is its constructor.
            Definition::Function(node) | Definition::Structure(node) => {
                Type::Function { definition: node }
            }
            Definition::TypeVariable(node) => Type::TypeVariable(node),
            Definition::Stream(id) => self
                .registry()
                .stream(id)
                .map_or(Type::Unknown, |s| s.ty()),
            Definition::Value(id) => self
                .registry()
                .constant(id)
                .map_or(Type::Unknown, |c| c.value.get_type()),
        }
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("source", &self.source)
            .field("types", &self.types.len())
            .field("reference_types", &self.reference_types.len())
            .field("stack", &self.stack)
            .finish()
    }
}
