//! Deferred explanations and their rendering.

use verse_core::{NodeId, NodeKind, Type};

use super::locale::Locales;
use crate::context::Context;

/// A value substituted into a localized message.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A node of the editable program.
    Node(NodeId),
    /// A named concept outside the program, such as a built-in's input.
    Concept(String),
    Type(Type),
    Text(String),
}

/// A localizable message: the key of a template and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub key: String,
    pub args: Vec<Argument>,
}

impl Explanation {
    pub fn new(key: impl Into<String>, args: Vec<Argument>) -> Self {
        Self {
            key: key.into(),
            args,
        }
    }

    /// Render against the first locale that has this message. Unknown keys
    /// render as the key itself.
    pub fn render(&self, locales: &Locales, ctx: &Context<'_>) -> String {
        let template = locales.get(&self.key).unwrap_or(&self.key);
        concretize(template, &self.args, ctx)
    }
}

/// Substitute `$1` … `$n` in `template` with the rendered arguments.
///
/// Placeholders without a matching argument are left as written.
pub fn concretize(template: &str, args: &[Argument], ctx: &Context<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let mut digits = String::new();
        while let Some(d) = chars.next_if(char::is_ascii_digit) {
            digits.push(d);
        }
        let argument = digits
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| args.get(i));
        match argument {
            Some(argument) => out.push_str(&render_argument(argument, ctx)),
            None => {
                out.push('$');
                out.push_str(&digits);
            }
        }
    }
    out
}

fn render_argument(argument: &Argument, ctx: &Context<'_>) -> String {
    match argument {
        Argument::Node(node) => describe(ctx, *node),
        Argument::Concept(concept) => concept.clone(),
        Argument::Type(ty) => ty.to_string(),
        Argument::Text(text) => text.clone(),
    }
}

/// A short description of a node: its name when it has one.
fn describe(ctx: &Context<'_>, node: NodeId) -> String {
    let tree = ctx.tree();
    let kind = tree.kind(node);
    if let Some(names) = kind.names() {
        return names.preferred().to_string();
    }
    match kind {
        NodeKind::Reference { name } => name.clone(),
        NodeKind::Property {
            name: Some(name), ..
        } => format!(".{name}"),
        NodeKind::Text { text } => format!("'{text}'"),
        other => {
            let span = tree.span(node);
            if span.is_synthetic() {
                other.label().to_string()
            } else {
                format!("{} at {span}", other.label())
            }
        }
    }
}
