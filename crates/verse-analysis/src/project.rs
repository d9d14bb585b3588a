//! Projects: sources plus the built-in definitions they can see.
//!
//! A [`Project`] owns a single [`Tree`] holding every source and every
//! built-in declaration. Built-ins live under a native root that is not
//! editable, so [`Project::contains`] answers whether a node belongs to the
//! program a user can change.

use tracing::debug;

use verse_core::{NodeId, ProjectError, RegistrationError, Span, Tree, TreeBuilder};
use verse_registry::NativeRegistry;

use crate::context::Context;

/// A named program root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub root: NodeId,
}

/// Collects built-ins and sources before the tree is frozen.
#[derive(Debug, Default)]
pub struct ProjectBuilder {
    builder: TreeBuilder,
    registry: NativeRegistry,
    sources: Vec<Source>,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run an installer that registers built-ins.
    pub fn install<F>(&mut self, install: F) -> Result<&mut Self, RegistrationError>
    where
        F: FnOnce(&mut NativeRegistry, &mut TreeBuilder) -> Result<(), RegistrationError>,
    {
        install(&mut self.registry, &mut self.builder)?;
        Ok(self)
    }

    /// The builder sources are written with.
    pub fn builder(&mut self) -> &mut TreeBuilder {
        &mut self.builder
    }

    pub fn registry(&self) -> &NativeRegistry {
        &self.registry
    }

    /// Name `root` as a source of the project.
    pub fn add_source(&mut self, name: &str, root: NodeId) -> Result<&mut Self, ProjectError> {
        if self.sources.iter().any(|s| s.name == name) {
            return Err(ProjectError::DuplicateSource {
                name: name.to_string(),
            });
        }
        self.sources.push(Source {
            name: name.to_string(),
            root,
        });
        Ok(self)
    }

    /// Gather the built-ins under the native root and freeze the tree.
    pub fn finish(mut self) -> Result<Project, ProjectError> {
        let declarations = self.registry.declarations().to_vec();
        self.builder.at(Span::default());
        let native_root = self.builder.block(declarations);
        let tree = self.builder.finish()?;

        for source in &self.sources {
            if tree.parent(source.root).is_some() {
                return Err(ProjectError::NotARoot {
                    name: source.name.clone(),
                    node: source.root,
                });
            }
        }

        debug!(
            sources = self.sources.len(),
            nodes = tree.len(),
            builtins = self.registry.function_count(),
            "project assembled"
        );

        Ok(Project {
            tree,
            registry: self.registry,
            native_root,
            sources: self.sources,
        })
    }
}

/// An immutable set of sources and the built-ins they are analyzed against.
#[derive(Debug)]
pub struct Project {
    tree: Tree,
    registry: NativeRegistry,
    native_root: NodeId,
    sources: Vec<Source>,
}

impl Project {
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn registry(&self) -> &NativeRegistry {
        &self.registry
    }

    pub fn native_root(&self) -> NodeId {
        self.native_root
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn source(&self, name: &str) -> Result<&Source, ProjectError> {
        self.sources
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ProjectError::UnknownSource {
                name: name.to_string(),
            })
    }

    /// The source whose tree contains `node`.
    pub fn source_of(&self, node: NodeId) -> Option<&Source> {
        let root = self.tree.root_of(node);
        self.sources.iter().find(|s| s.root == root)
    }

    /// Whether `node` is part of an editable source rather than a built-in.
    pub fn contains(&self, node: NodeId) -> bool {
        self.source_of(node).is_some()
    }

    pub fn is_native(&self, node: NodeId) -> bool {
        self.tree.root_of(node) == self.native_root
    }

    /// Start an analysis pass over the named source.
    pub fn context(&self, name: &str) -> Result<Context<'_>, ProjectError> {
        let source = self.source(name)?;
        Ok(Context::new(self, source.root))
    }
}
