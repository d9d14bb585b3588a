//! NativeRegistry - built-in definitions and their implementations.
//!
//! Built-in functions are installed as nodes of the project tree under a
//! native root that is never editable. The registry indexes those nodes by
//! native type family and member name, and keeps the implementation of each
//! one keyed by its [`DefHash`]. Stream sources and constants are globals:
//! they are visible from every scope and have no tree node.
//!
//! # Example
//!
//! ```
//! use verse_core::{NativeTypeName, TreeBuilder, Type, Value};
//! use verse_registry::{FunctionDecl, NativeRegistry};
//!
//! let mut builder = TreeBuilder::new();
//! let mut registry = NativeRegistry::new();
//! let length = registry
//!     .register_function(
//!         &mut builder,
//!         FunctionDecl::new(NativeTypeName::List, "length")
//!             .output(Type::number())
//!             .implement(|_, _| Value::number(0.0)),
//!     )
//!     .unwrap();
//!
//! assert_eq!(registry.function(NativeTypeName::List, "length"), Some(length));
//! ```

use rustc_hash::FxHashMap;
use tracing::debug;

use verse_core::{
    DefHash, NativeScope, NativeTypeName, NodeId, NodeKind, RegistrationError, Span, TreeBuilder,
    Type, Value,
};

use crate::declaration::{
    Constant, ConstantId, FunctionDecl, Global, NativeFn, StreamId, StreamSource,
};

/// Registered built-in function.
#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub definition: NodeId,
    pub hash: DefHash,
    pub on: NativeTypeName,
    pub name: String,
}

/// Central storage for built-in definitions.
#[derive(Default)]
pub struct NativeRegistry {
    /// Functions by hash (primary storage).
    functions: FxHashMap<DefHash, NativeFunction>,

    /// Family -> (member name -> definition node).
    by_family: FxHashMap<NativeTypeName, FxHashMap<String, NodeId>>,

    implementations: FxHashMap<DefHash, NativeFn>,

    streams: Vec<StreamSource>,
    constants: Vec<Constant>,
    globals: FxHashMap<String, Global>,

    /// Declared definition nodes, in registration order.
    declarations: Vec<NodeId>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Declare a built-in function as nodes in `builder` and store its
    /// implementation.
    pub fn register_function(
        &mut self,
        builder: &mut TreeBuilder,
        decl: FunctionDecl,
    ) -> Result<NodeId, RegistrationError> {
        let hash = decl.hash();
        if self.functions.contains_key(&hash) {
            return Err(RegistrationError::Duplicate {
                name: decl.qualified_name(),
            });
        }
        let implementation = decl
            .implementation
            .ok_or(RegistrationError::MissingImplementation { hash })?;

        builder.at(Span::default());
        let inputs = decl
            .inputs
            .iter()
            .map(|(name, ty)| {
                let annotation = builder.type_literal(ty.clone());
                builder.bind(name, Some(annotation), None)
            })
            .collect();
        let output = builder.type_literal(decl.output.clone());
        let body = builder.native(hash);
        let definition = builder.function(&decl.name, inputs, Some(output), Some(body));

        debug!(name = %decl.qualified_name(), %definition, "registered built-in");

        self.by_family
            .entry(decl.on)
            .or_default()
            .insert(decl.name.clone(), definition);
        self.implementations.insert(hash, implementation);
        self.functions.insert(
            hash,
            NativeFunction {
                definition,
                hash,
                on: decl.on,
                name: decl.name,
            },
        );
        self.declarations.push(definition);
        Ok(definition)
    }

    /// Register an external stream source emitting values of type `item`.
    pub fn register_stream(&mut self, name: &str, item: Type) -> Result<StreamId, RegistrationError> {
        let id = StreamId(self.streams.len() as u32);
        self.insert_global(name, Global::Stream(id))?;
        self.streams.push(StreamSource {
            id,
            name: name.to_string(),
            item,
        });
        Ok(id)
    }

    pub fn register_constant(
        &mut self,
        name: &str,
        value: Value,
    ) -> Result<ConstantId, RegistrationError> {
        let id = ConstantId(self.constants.len() as u32);
        self.insert_global(name, Global::Constant(id))?;
        self.constants.push(Constant {
            id,
            name: name.to_string(),
            value,
        });
        Ok(id)
    }

    fn insert_global(&mut self, name: &str, global: Global) -> Result<(), RegistrationError> {
        if self.globals.contains_key(name) {
            return Err(RegistrationError::DuplicateGlobal {
                name: name.to_string(),
            });
        }
        debug!(name, ?global, "registered global");
        self.globals.insert(name.to_string(), global);
        Ok(())
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// The definition node of the built-in `name` on family `on`.
    pub fn function(&self, on: NativeTypeName, name: &str) -> Option<NodeId> {
        self.by_family.get(&on).and_then(|m| m.get(name)).copied()
    }

    /// Every built-in on family `on`, ordered by name.
    pub fn functions_on(&self, on: NativeTypeName) -> Vec<(&str, NodeId)> {
        let mut out: Vec<_> = self
            .by_family
            .get(&on)
            .into_iter()
            .flat_map(|m| m.iter().map(|(name, id)| (name.as_str(), *id)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    pub fn get_function(&self, hash: DefHash) -> Option<&NativeFunction> {
        self.functions.get(&hash)
    }

    pub fn implementation(&self, hash: DefHash) -> Option<NativeFn> {
        self.implementations.get(&hash).copied()
    }

    /// Resolve the implementation behind a `Native` body node.
    pub fn implementation_of(&self, body: &NodeKind) -> Option<NativeFn> {
        match body {
            NodeKind::Native { function } => self.implementation(*function),
            _ => None,
        }
    }

    pub fn global(&self, name: &str) -> Option<Global> {
        self.globals.get(name).copied()
    }

    /// Every global, ordered by name.
    pub fn globals(&self) -> Vec<(&str, Global)> {
        let mut out: Vec<_> = self
            .globals
            .iter()
            .map(|(name, global)| (name.as_str(), *global))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    pub fn stream(&self, id: StreamId) -> Option<&StreamSource> {
        self.streams.get(id.0 as usize)
    }

    pub fn streams(&self) -> &[StreamSource] {
        &self.streams
    }

    pub fn constant(&self, id: ConstantId) -> Option<&Constant> {
        self.constants.get(id.0 as usize)
    }

    /// Declared definition nodes, to be gathered under the native root.
    pub fn declarations(&self) -> &[NodeId] {
        &self.declarations
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

impl NativeScope for NativeRegistry {
    fn native_function(&self, on: NativeTypeName, name: &str) -> Option<NodeId> {
        self.function(on, name)
    }
}

impl std::fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("functions", &self.functions.len())
            .field("streams", &self.streams.len())
            .field("constants", &self.constants.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(_: Option<&Value>, inputs: &[Value]) -> Value {
        inputs.first().cloned().unwrap_or(Value::None)
    }

    fn repeat() -> FunctionDecl {
        FunctionDecl::new(NativeTypeName::Text, "repeat")
            .input("count", Type::number())
            .output(Type::text())
            .implement(first)
    }

    #[test]
    fn function_becomes_nodes() {
        let mut builder = TreeBuilder::new();
        let mut registry = NativeRegistry::new();
        let definition = registry.register_function(&mut builder, repeat()).unwrap();

        match builder.kind(definition) {
            Some(NodeKind::Function { inputs, body, .. }) => {
                assert_eq!(inputs.len(), 1);
                let body = body.unwrap();
                assert!(matches!(builder.kind(body), Some(NodeKind::Native { .. })));
                assert!(registry.implementation_of(builder.kind(body).unwrap()).is_some());
            }
            other => panic!("expected function, got {other:?}"),
        }
        assert_eq!(registry.declarations(), &[definition]);
    }

    #[test]
    fn duplicate_function_is_rejected() {
        let mut builder = TreeBuilder::new();
        let mut registry = NativeRegistry::new();
        registry.register_function(&mut builder, repeat()).unwrap();
        assert_eq!(
            registry.register_function(&mut builder, repeat()),
            Err(RegistrationError::Duplicate {
                name: "text.repeat".into()
            })
        );
    }

    #[test]
    fn missing_implementation_is_rejected() {
        let mut builder = TreeBuilder::new();
        let mut registry = NativeRegistry::new();
        let decl = FunctionDecl::new(NativeTypeName::Text, "length");
        let hash = decl.hash();
        assert_eq!(
            registry.register_function(&mut builder, decl),
            Err(RegistrationError::MissingImplementation { hash })
        );
    }

    #[test]
    fn globals_share_one_namespace() {
        let mut registry = NativeRegistry::new();
        let time = registry.register_stream("Time", Type::measurement("ms")).unwrap();
        assert_eq!(registry.global("Time"), Some(Global::Stream(time)));
        assert!(registry.register_constant("Time", Value::None).is_err());
        let pi = registry
            .register_constant("π", Value::number(std::f64::consts::PI))
            .unwrap();
        assert_eq!(registry.global("π"), Some(Global::Constant(pi)));
        assert_eq!(registry.globals().len(), 2);
    }

    #[test]
    fn native_scope_lookup() {
        let mut builder = TreeBuilder::new();
        let mut registry = NativeRegistry::new();
        let definition = registry.register_function(&mut builder, repeat()).unwrap();
        let scope: &dyn NativeScope = &registry;
        assert_eq!(scope.native_function(NativeTypeName::Text, "repeat"), Some(definition));
        assert_eq!(scope.native_function(NativeTypeName::List, "repeat"), None);
    }
}
