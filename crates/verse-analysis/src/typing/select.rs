//! Table selection.
//!
//! `table ⎡? row query` keeps the rows of `table` for which `query` holds,
//! restricted to the columns the references in `row` name. An empty row keeps
//! every column. Inside the row and the query, column names are in scope.

use verse_core::{Column, NodeId, NodeKind, Type};

use super::is_checkable;
use crate::context::Context;
use crate::diagnostics::{Diagnostic, DiagnosticKind};

/// Columns declared by a list of column binds.
pub(crate) fn column_types(ctx: &mut Context<'_>, columns: &[NodeId]) -> Vec<Column> {
    columns
        .iter()
        .filter_map(|bind| {
            let name = ctx.tree().kind(*bind).names()?.preferred().to_string();
            Some(Column {
                name,
                ty: ctx.get_type(*bind),
                bind: Some(*bind),
            })
        })
        .collect()
}

fn parts(ctx: &Context<'_>, select: NodeId) -> Option<(NodeId, Vec<NodeId>, NodeId)> {
    let tree = ctx.tree();
    let NodeKind::Select { table, row, query } = tree.kind(select) else {
        return None;
    };
    let cells = match tree.kind(*row) {
        NodeKind::Row { cells } => cells.clone(),
        _ => Vec::new(),
    };
    Some((*table, cells, *query))
}

/// The columns of the selected table a select keeps, in row order.
pub(crate) fn selected_columns(ctx: &mut Context<'_>, select: NodeId) -> Vec<Column> {
    let Some((table, cells, _)) = parts(ctx, select) else {
        return Vec::new();
    };
    let table = ctx.get_type(table);
    let table = table.unwrap_stream();
    if cells.is_empty() {
        return table.columns().to_vec();
    }
    let tree = ctx.tree();
    cells
        .iter()
        .filter_map(|cell| match tree.kind(*cell) {
            NodeKind::Reference { name } => table.column(name).cloned(),
            _ => None,
        })
        .collect()
}

pub(crate) fn select_type(ctx: &mut Context<'_>, select: NodeId) -> Type {
    let Some((table, _, _)) = parts(ctx, select) else {
        return Type::Unknown;
    };
    match ctx.get_type(table).unwrap_stream() {
        Type::Table(_) => Type::Table(selected_columns(ctx, select)),
        _ => Type::Unknown,
    }
}

pub(crate) fn select_diagnostics(ctx: &mut Context<'_>, select: NodeId) -> Vec<Diagnostic> {
    let Some((table, cells, query)) = parts(ctx, select) else {
        return Vec::new();
    };
    let mut out = Vec::new();

    let table_type = ctx.get_type(table).unwrap_stream().clone();
    if !matches!(table_type, Type::Table(_)) {
        if is_checkable(&table_type) {
            out.push(Diagnostic::new(DiagnosticKind::NotATable {
                select,
                table,
                received: table_type,
            }));
        }
        return out;
    }

    let tree = ctx.tree();
    for cell in cells {
        match tree.kind(cell) {
            NodeKind::Reference { name } => {
                if table_type.column(name).is_none() {
                    out.push(Diagnostic::new(DiagnosticKind::UnknownColumn {
                        table_type: table_type.clone(),
                        cell,
                    }));
                }
            }
            _ => out.push(Diagnostic::new(DiagnosticKind::ExpectedSelectName { select, cell })),
        }
    }

    let received = ctx.get_type(query);
    if is_checkable(&received) && !Type::Boolean.accepts(&received) {
        out.push(Diagnostic::new(DiagnosticKind::NonBooleanQuery {
            select,
            query,
            received,
        }));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::analyze;
    use crate::testing::{finish, fixture, kinds};

    /// `⎡one•# two•''⎦ ⎡1 'a'⎦ ⎡2 'b'⎦`
    fn table(b: &mut verse_core::TreeBuilder) -> NodeId {
        let number = b.measurement_type("");
        let one = b.bind("one", Some(number), None);
        let text = b.text_type();
        let two = b.bind("two", Some(text), None);
        let first = [b.number(1.0), b.text("a")];
        let first = b.row(first.to_vec());
        let second = [b.number(2.0), b.text("b")];
        let second = b.row(second.to_vec());
        b.table(vec![one, two], vec![first, second])
    }

    #[test]
    fn selects_named_columns() {
        let mut p = fixture();
        let b = p.builder();
        let t = table(b);
        let two = b.reference("two");
        let row = b.row(vec![two]);
        let one = b.reference("one");
        let limit = b.number(1.0);
        let query = b.binary(">", one, limit);
        let select = b.select(t, row, query);
        let root = b.block(vec![select]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let Type::Table(columns) = ctx.get_type(select) else {
            panic!("expected a table");
        };
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "two");
        assert_eq!(columns[0].ty, Type::text());
        assert_eq!(ctx.get_type(one), Type::number());
        assert!(analyze(&mut ctx).is_empty());
    }

    #[test]
    fn unknown_column_is_reported_once() {
        let mut p = fixture();
        let b = p.builder();
        let number = b.measurement_type("");
        let one = b.bind("one", Some(number), None);
        let t = b.table(vec![one], vec![]);
        let two = b.reference("two");
        let row = b.row(vec![two]);
        let query = b.boolean(true);
        let select = b.select(t, row, query);
        let root = b.block(vec![select]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let found = analyze(&mut ctx);
        assert_eq!(found.len(), 1);
        let DiagnosticKind::UnknownColumn { table_type, cell } = found.as_slice()[0].kind() else {
            panic!("expected unknown column, got {found:?}");
        };
        assert_eq!(*cell, two);
        assert_eq!(table_type, &ctx.get_type(t));
        assert_eq!(table_type.to_string(), "⎡one•#⎦");
    }

    #[test]
    fn malformed_selects() {
        let mut p = fixture();
        let b = p.builder();
        let t = table(b);
        let literal = b.number(1.0);
        let row = b.row(vec![literal]);
        let query = b.text("yes");
        let select = b.select(t, row, query);

        let not_table = b.number(3.0);
        let empty = b.row(vec![]);
        let always = b.boolean(true);
        let bad = b.select(not_table, empty, always);
        let root = b.block(vec![select, bad]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(
            kinds(&select_diagnostics(&mut ctx, select)),
            ["ExpectedSelectName", "NonBooleanQuery"]
        );
        assert_eq!(kinds(&select_diagnostics(&mut ctx, bad)), ["NotATable"]);
        assert_eq!(ctx.get_type(bad), Type::Unknown);
    }
}
