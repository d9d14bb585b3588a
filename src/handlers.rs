//! Start and finish handlers shared by the evaluator and the interpreter.
//!
//! A start handler prepares a node's evaluation; a finish handler consumes
//! the values its operands pushed and produces the node's value. A finish
//! may instead ask its runtime to enter a function, construct a structure
//! or run a query ([`Finished::Call`]), or to wait for a stream
//! ([`Finished::Suspend`]). Both runtimes drive these handlers, so stepping
//! and direct evaluation share every evaluation rule.

use std::rc::Rc;

use verse_analysis::compile::minimum_inputs;
use verse_analysis::{Definition, Program, Project};
use verse_core::{
    DefHash, Exception, FunctionValue, NodeId, NodeKind, Scope, StructureValue, TableValue, Tree,
    Value,
};
use verse_registry::{StreamId, unary_function_name};

use crate::frame::Frame;
use crate::streams::StreamState;

/// What a finish handler asks of its runtime.
#[derive(Debug)]
pub(crate) enum Finished {
    Value(Value),
    Call(Call),
    /// The stream has not emitted yet.
    Suspend(StreamId),
}

#[derive(Debug)]
pub(crate) enum Call {
    Function {
        function: Rc<FunctionValue>,
        inputs: Vec<Value>,
    },
    Query {
        select: NodeId,
        table: Rc<TableValue>,
    },
}

/// How to run a call.
#[derive(Debug)]
pub(crate) enum Entry {
    /// The call failed before it started.
    Value(Value),
    Function {
        definition: NodeId,
        supplied: usize,
        frame: Frame,
    },
    Construct {
        definition: NodeId,
        supplied: usize,
        frame: Frame,
    },
    Query {
        select: NodeId,
        table: Rc<TableValue>,
        /// The scope the select was evaluated in; rows chain to it.
        base: Rc<Scope>,
    },
}

pub(crate) trait Runtime<'p> {
    fn project(&self) -> &'p Project;
    fn program(&self) -> &'p Program;
    fn frame(&self) -> &Frame;
    fn frame_mut(&mut self) -> &mut Frame;
    fn streams(&self) -> &StreamState;
    fn streams_mut(&mut self) -> &mut StreamState;
}

// ============================================================================
// Start
// ============================================================================

pub(crate) fn start<'p, R: Runtime<'p>>(rt: &mut R, node: NodeId) {
    match rt.project().tree().kind(node) {
        NodeKind::Block { .. } => rt.frame_mut().enter_block(),
        // The next value reads the bind the reaction defines.
        NodeKind::Reaction { .. } => {
            let remembered = rt.streams().memory(node).cloned();
            if let (Some(value), Some(names)) = (remembered, rt.program().reaction_names(node)) {
                rt.frame_mut().bind(names, value);
            }
        }
        _ => {}
    }
}

// ============================================================================
// Finish
// ============================================================================

/// Finish `node`. A `prior` value is the result of a finish that suspended
/// earlier and is returned unchanged.
pub(crate) fn finish<'p, R: Runtime<'p>>(rt: &mut R, node: NodeId, prior: Option<Value>) -> Finished {
    if let Some(prior) = prior {
        return Finished::Value(prior);
    }
    let project = rt.project();
    let tree = project.tree();
    let value = match tree.kind(node) {
        NodeKind::Block { statements } => {
            let values = rt.frame_mut().pop_many(statements.len());
            rt.frame_mut().exit_block();
            values.into_iter().last().unwrap_or(Value::None)
        }
        NodeKind::Bind { names, value, .. } => {
            let bound = match value {
                Some(_) => rt.frame_mut().pop(),
                None => Exception::MissingInput {
                    input: names.preferred().to_string(),
                }
                .into(),
            };
            rt.frame_mut().bind(names, bound.clone());
            bound
        }
        NodeKind::Function { names, .. } | NodeKind::Structure { names, .. } => {
            let closure = closure(rt.frame(), node);
            rt.frame_mut().bind(names, closure.clone());
            closure
        }
        NodeKind::Reference { name } => return reference(rt, node, name),
        NodeKind::Property { name, .. } => {
            let subject = rt.frame_mut().pop();
            let name = name.as_deref().unwrap_or_default();
            if subject.is_exception() {
                subject
            } else {
                subject
                    .resolve(name, project.registry())
                    .unwrap_or_else(|| Exception::Name { name: name.to_string() }.into())
            }
        }
        NodeKind::Evaluate { inputs, .. } => {
            let inputs = rt.frame_mut().pop_many(inputs.len());
            let fun = rt.frame_mut().pop();
            return call(fun, inputs);
        }
        NodeKind::Binary { operator, .. } => {
            let right = rt.frame_mut().pop();
            let left = rt.frame_mut().pop();
            return operate(project, left, operator, vec![right]);
        }
        NodeKind::Unary { operator, .. } => {
            let operand = rt.frame_mut().pop();
            return match unary_function_name(operator) {
                Some(name) => operate(project, operand, name, Vec::new()),
                None => Finished::Value(unknown_operator(operator, &operand)),
            };
        }
        NodeKind::Conditional { .. } => rt.frame_mut().pop(),
        NodeKind::Is { .. } => {
            let tested = rt.frame_mut().pop();
            match rt.program().tested(node) {
                Some(ty) if !tested.is_exception() => Value::Boolean(ty.accepts(&tested.get_type())),
                _ => Value::Boolean(false),
            }
        }
        NodeKind::Reaction { .. } => {
            let value = rt.frame_mut().pop();
            rt.streams_mut().remember(node, value.clone());
            value
        }
        NodeKind::Changed { .. } => {
            let stream = rt.program().stream_of(node);
            Value::Boolean(stream.is_some() && stream == rt.streams().changed())
        }
        NodeKind::Previous { .. } => {
            let index = rt.frame_mut().pop();
            previous(rt, node, &index)
        }
        NodeKind::Measurement { value, unit } => Value::Measurement {
            amount: *value,
            unit: unit.clone(),
        },
        NodeKind::Text { text } => Value::Text(text.clone()),
        NodeKind::Boolean { value } => Value::Boolean(*value),
        NodeKind::None => Value::None,
        NodeKind::List { items } => Value::list(rt.frame_mut().pop_many(items.len())),
        NodeKind::Table { rows, .. } => table(rt, node, rows),
        NodeKind::Select { .. } => match rt.frame_mut().pop() {
            Value::Table(table) => return Finished::Call(Call::Query { select: node, table }),
            exception @ Value::Exception(_) => exception,
            other => Exception::Type {
                expected: "table".to_string(),
                received: other.get_type().to_string(),
            }
            .into(),
        },
        NodeKind::Placeholder { .. } => Exception::Placeholder.into(),
        NodeKind::Native { function } => native(rt, node, *function),
        NodeKind::TypeVariable { .. }
        | NodeKind::Row { .. }
        | NodeKind::NameType { .. }
        | NodeKind::BooleanType
        | NodeKind::NoneType
        | NodeKind::TextType { .. }
        | NodeKind::MeasurementType { .. }
        | NodeKind::ListType { .. }
        | NodeKind::UnionType { .. }
        | NodeKind::StreamType { .. }
        | NodeKind::TableType { .. }
        | NodeKind::TypePlaceholder
        | NodeKind::TypeLiteral { .. } => Value::None,
    };
    Finished::Value(value)
}

fn closure(frame: &Frame, definition: NodeId) -> Value {
    Value::Function(Rc::new(FunctionValue {
        definition,
        subject: None,
        closure: Some(frame.snapshot()),
    }))
}

fn reference<'p, R: Runtime<'p>>(rt: &mut R, node: NodeId, name: &str) -> Finished {
    let definition = rt.program().reference(node);
    let value = match definition {
        Some(Definition::Stream(stream)) => {
            return match rt.streams().latest(stream) {
                Some(value) => Finished::Value(value.clone()),
                None => Finished::Suspend(stream),
            };
        }
        Some(Definition::Value(constant)) => rt
            .project()
            .registry()
            .constant(constant)
            .map(|c| c.value.clone()),
        _ => rt.frame().lookup(name),
    };
    Finished::Value(match (value, definition) {
        (Some(value), _) => value,
        // Functions are visible before the statement defining them runs.
        (None, Some(Definition::Function(definition) | Definition::Structure(definition))) => {
            closure(rt.frame(), definition)
        }
        (None, _) => Exception::Name {
            name: name.to_string(),
        }
        .into(),
    })
}

fn call(fun: Value, inputs: Vec<Value>) -> Finished {
    match fun {
        Value::Function(function) => Finished::Call(Call::Function { function, inputs }),
        exception @ Value::Exception(_) => Finished::Value(exception),
        other => Finished::Value(
            Exception::NotAFunction {
                name: other.to_string(),
            }
            .into(),
        ),
    }
}

/// Call the built-in `name` resolved on `subject`.
fn operate(project: &Project, subject: Value, name: &str, inputs: Vec<Value>) -> Finished {
    if subject.is_exception() {
        return Finished::Value(subject);
    }
    match subject.resolve(name, project.registry()) {
        Some(Value::Function(function)) => Finished::Call(Call::Function { function, inputs }),
        _ => Finished::Value(unknown_operator(name, &subject)),
    }
}

fn unknown_operator(operator: &str, on: &Value) -> Value {
    Exception::UnknownOperator {
        operator: operator.to_string(),
        on: on.get_type().to_string(),
    }
    .into()
}

fn previous<'p, R: Runtime<'p>>(rt: &R, node: NodeId, index: &Value) -> Value {
    let Some(stream) = rt.program().stream_of(node) else {
        return Exception::Value {
            message: "not a stream".to_string(),
        }
        .into();
    };
    match index.as_number() {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => rt
            .streams()
            .history(stream, n as usize)
            .cloned()
            .unwrap_or(Value::None),
        _ => Exception::Type {
            expected: "#".to_string(),
            received: index.get_type().to_string(),
        }
        .into(),
    }
}

fn table<'p, R: Runtime<'p>>(rt: &mut R, node: NodeId, rows: &[NodeId]) -> Value {
    let tree = rt.project().tree();
    let widths: Vec<usize> = rows
        .iter()
        .map(|row| match tree.kind(*row) {
            NodeKind::Row { cells } => cells.len(),
            _ => 0,
        })
        .collect();
    let mut cells = rt.frame_mut().pop_many(widths.iter().sum()).into_iter();
    let rows = widths
        .iter()
        .map(|width| cells.by_ref().take(*width).collect())
        .collect();
    let columns = rt.program().columns(node).unwrap_or_default().to_vec();
    Value::Table(Rc::new(TableValue { columns, rows }))
}

/// Run a built-in body on the inputs bound in the current frame.
fn native<'p, R: Runtime<'p>>(rt: &R, node: NodeId, function: DefHash) -> Value {
    let project = rt.project();
    let tree = project.tree();
    let Some(implementation) = project.registry().implementation(function) else {
        return Exception::Value {
            message: format!("no implementation for {function:?}"),
        }
        .into();
    };
    let inputs: Vec<Value> = match tree.parent(node).map(|p| tree.kind(p)) {
        Some(NodeKind::Function { inputs, .. }) => inputs
            .iter()
            .map(|input| {
                tree.kind(*input)
                    .names()
                    .and_then(|names| rt.frame().lookup(names.preferred()))
                    .unwrap_or(Value::None)
            })
            .collect(),
        _ => Vec::new(),
    };
    implementation(rt.frame().subject(), &inputs)
}

// ============================================================================
// Calls
// ============================================================================

/// Prepare a call: bind the supplied inputs in a fresh frame, or fail with
/// the first required input that is missing.
pub(crate) fn enter(tree: &Tree, caller: &Frame, call: Call) -> Entry {
    let (function, inputs) = match call {
        Call::Query { select, table } => {
            return Entry::Query {
                select,
                table,
                base: caller.snapshot(),
            };
        }
        Call::Function { function, inputs } => (function, inputs),
    };
    let (binds, constructs) = match tree.kind(function.definition) {
        NodeKind::Function { inputs, .. } => (inputs, false),
        NodeKind::Structure { inputs, .. } => (inputs, true),
        _ => {
            return Entry::Value(
                Exception::NotAFunction {
                    name: function.definition.to_string(),
                }
                .into(),
            );
        }
    };

    if inputs.len() < minimum_inputs(tree, binds) {
        let missing = binds[inputs.len()..]
            .iter()
            .find_map(|bind| match tree.kind(*bind) {
                NodeKind::Bind {
                    names, value: None, ..
                } => Some(names.preferred().to_string()),
                _ => None,
            })
            .unwrap_or_default();
        return Entry::Value(Exception::MissingInput { input: missing }.into());
    }

    let supplied = inputs.len().min(binds.len());
    let mut scope = Scope::new(function.closure.clone());
    for (bind, value) in binds.iter().zip(inputs) {
        if let Some(names) = tree.kind(*bind).names() {
            scope.bind(names, value);
        }
    }
    let frame = Frame::new(scope, function.subject.clone());
    let definition = function.definition;
    if constructs {
        Entry::Construct {
            definition,
            supplied,
            frame,
        }
    } else {
        Entry::Function {
            definition,
            supplied,
            frame,
        }
    }
}

/// Whether a function definition has a body to take its value from.
pub(crate) fn has_body(tree: &Tree, function: NodeId) -> bool {
    matches!(tree.kind(function), NodeKind::Function { body: Some(_), .. })
}

/// The structure a finished constructor frame describes.
pub(crate) fn construct(tree: &Tree, structure: NodeId, frame: &Frame) -> Value {
    let NodeKind::Structure {
        names,
        inputs,
        members,
        ..
    } = tree.kind(structure)
    else {
        return Value::None;
    };
    let fields = inputs
        .iter()
        .chain(members)
        .filter_map(|bind| {
            let names = tree.kind(*bind).names()?;
            let value = frame.lookup(names.preferred()).unwrap_or(Value::None);
            Some((names.clone(), value))
        })
        .collect();
    Value::Structure(Rc::new(StructureValue {
        definition: structure,
        name: names.preferred().to_string(),
        fields,
    }))
}

/// A frame with the cells of `row` bound to their column names.
pub(crate) fn row_frame(base: &Rc<Scope>, table: &TableValue, row: usize) -> Frame {
    let mut scope = Scope::new(Some(Rc::clone(base)));
    if let Some(cells) = table.rows.get(row) {
        for (column, cell) in table.columns.iter().zip(cells) {
            scope.bind_name(&column.name, cell.clone());
        }
    }
    Frame::new(scope, None)
}

/// The rows a query kept, restricted to the selected columns.
pub(crate) fn selection(program: &Program, select: NodeId, table: &TableValue, kept: &[usize]) -> Value {
    let columns = program
        .columns(select)
        .map(<[_]>::to_vec)
        .unwrap_or_else(|| table.columns.clone());
    let indices: Vec<Option<usize>> = columns
        .iter()
        .map(|c| table.column_index(&c.name))
        .collect();
    let rows = kept
        .iter()
        .filter_map(|row| table.rows.get(*row))
        .map(|cells| {
            indices
                .iter()
                .map(|i| i.and_then(|i| cells.get(i).cloned()).unwrap_or(Value::None))
                .collect()
        })
        .collect();
    Value::Table(Rc::new(TableValue { columns, rows }))
}
