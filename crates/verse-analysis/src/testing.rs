//! Fixtures shared by unit tests.

use verse_core::NodeId;

use crate::diagnostics::Diagnostic;
use crate::project::{Project, ProjectBuilder};

/// A project builder with the standard modules installed.
pub(crate) fn fixture() -> ProjectBuilder {
    let mut project = ProjectBuilder::new();
    project
        .install(verse_modules::install)
        .expect("standard modules install");
    project
}

/// Register `root` as the source `main` and freeze the project.
pub(crate) fn finish(mut project: ProjectBuilder, root: NodeId) -> Project {
    project.add_source("main", root).expect("source is unique");
    project.finish().expect("project is well-formed")
}

/// Names of the kinds of `diagnostics`, in order.
pub(crate) fn kinds(diagnostics: &[Diagnostic]) -> Vec<&'static str> {
    diagnostics.iter().map(|d| d.kind().name()).collect()
}
