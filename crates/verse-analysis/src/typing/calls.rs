//! Function evaluation and operators.
//!
//! Operators are calls in disguise: `a + b` evaluates the built-in `+` found
//! on the type of `a` with `b` as its only input, and `-a` evaluates the
//! prefix operator's word (`negate`) with no inputs.

use verse_core::{NativeTypeName, NodeId, NodeKind, Type};
use verse_registry::unary_function_name;

use super::{is_checkable, native_family, specialize, structure_type};
use crate::context::Context;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::property;

/// The function or structure definition an evaluate calls.
pub(crate) fn callee(ctx: &mut Context<'_>, evaluate: NodeId) -> Option<NodeId> {
    let NodeKind::Evaluate { fun, .. } = ctx.tree().kind(evaluate) else {
        return None;
    };
    match ctx.get_type(*fun) {
        Type::Function { definition } => Some(definition),
        _ => None,
    }
}

/// The type of the value a call is made on, for `subject.function()` calls.
fn call_subject(ctx: &mut Context<'_>, fun: NodeId) -> Option<Type> {
    match ctx.tree().kind(fun) {
        NodeKind::Property { .. } => Some(property::subject_type(ctx, fun)),
        _ => None,
    }
}

/// The built-in `name` on the family of `on`.
pub(crate) fn operator_function(ctx: &Context<'_>, on: &Type, name: &str) -> Option<NodeId> {
    ctx.registry().function(on.native_name()?, name)
}

/// Substitute a type variable of `definition` from explicit type inputs, or
/// from the bindings of a structure subject.
fn instantiate(
    ctx: &mut Context<'_>,
    definition: NodeId,
    type_inputs: &[NodeId],
    subject: Option<&Type>,
    ty: Type,
) -> Type {
    let Type::TypeVariable(variable) = ty else {
        return ty;
    };
    let type_variables = match ctx.tree().kind(definition) {
        NodeKind::Function { type_variables, .. } | NodeKind::Structure { type_variables, .. } => {
            type_variables.as_slice()
        }
        _ => &[],
    };
    if let Some(input) = type_variables
        .iter()
        .position(|v| *v == variable)
        .and_then(|i| type_inputs.get(i))
    {
        return ctx.get_type(*input);
    }
    if let Some(Type::Structure { type_inputs, .. }) = subject {
        if let Some((_, bound)) = type_inputs.iter().find(|(v, _)| *v == variable) {
            return bound.clone();
        }
    }
    ty
}

/// The type `input` of `definition` expects when called on `subject`.
fn expected_input(
    ctx: &mut Context<'_>,
    definition: NodeId,
    input: NodeId,
    type_inputs: &[NodeId],
    subject: Option<&Type>,
) -> Type {
    let declared = ctx.get_type(input);
    let declared = instantiate(ctx, definition, type_inputs, subject, declared);
    let specialized = specialize(ctx, definition, subject, declared.clone());

    // Scaling operators also take a plain number.
    let scales = native_family(ctx, definition) == Some(NativeTypeName::Measurement)
        && matches!(
            ctx.tree().kind(definition).names().map(|n| n.preferred()),
            Some("×" | "÷")
        );
    if scales && specialized != declared {
        Type::union([specialized, declared])
    } else {
        specialized
    }
}

/// Output annotation of a function, or its body's type when unannotated.
fn output_type(ctx: &mut Context<'_>, function: NodeId) -> Type {
    match ctx.tree().kind(function) {
        NodeKind::Function {
            output: Some(output),
            ..
        } => ctx.get_type(*output),
        NodeKind::Function {
            body: Some(body), ..
        } => ctx.get_type(*body),
        _ => Type::None,
    }
}

fn inputs_of<'p>(ctx: &Context<'p>, definition: NodeId) -> Option<&'p [NodeId]> {
    match ctx.tree().kind(definition) {
        NodeKind::Function { inputs, .. } | NodeKind::Structure { inputs, .. } => Some(inputs),
        _ => None,
    }
}

// ============================================================================
// Types
// ============================================================================

pub(crate) fn evaluate_type(ctx: &mut Context<'_>, evaluate: NodeId) -> Type {
    let NodeKind::Evaluate {
        fun, type_inputs, ..
    } = ctx.tree().kind(evaluate)
    else {
        return Type::Unknown;
    };
    let Some(definition) = callee(ctx, evaluate) else {
        return Type::Unknown;
    };
    match ctx.tree().kind(definition) {
        NodeKind::Function { .. } => {
            let subject = call_subject(ctx, *fun);
            let output = output_type(ctx, definition);
            let output = instantiate(ctx, definition, type_inputs, subject.as_ref(), output);
            specialize(ctx, definition, subject.as_ref(), output)
        }
        NodeKind::Structure { .. } => structure_type(ctx, definition, type_inputs),
        _ => Type::Unknown,
    }
}

pub(crate) fn binary_type(ctx: &mut Context<'_>, binary: NodeId) -> Type {
    let NodeKind::Binary { operator, left, .. } = ctx.tree().kind(binary) else {
        return Type::Unknown;
    };
    let left = ctx.get_type(*left);
    match operator_function(ctx, &left, operator) {
        Some(function) => {
            let output = output_type(ctx, function);
            specialize(ctx, function, Some(&left), output)
        }
        None => Type::Unknown,
    }
}

pub(crate) fn unary_type(ctx: &mut Context<'_>, unary: NodeId) -> Type {
    let NodeKind::Unary { operator, operand } = ctx.tree().kind(unary) else {
        return Type::Unknown;
    };
    let operand = ctx.get_type(*operand);
    match unary_function_name(operator).and_then(|name| operator_function(ctx, &operand, name)) {
        Some(function) => {
            let output = output_type(ctx, function);
            specialize(ctx, function, Some(&operand), output)
        }
        None => Type::Unknown,
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

fn incompatible(
    ctx: &mut Context<'_>,
    given: NodeId,
    expected: Type,
    out: &mut Vec<Diagnostic>,
) {
    let received = ctx.get_type(given);
    if is_checkable(&expected) && is_checkable(&received) && !expected.accepts(&received) {
        out.push(Diagnostic::new(DiagnosticKind::IncompatibleInput {
            given,
            expected,
            received,
        }));
    }
}

pub(crate) fn evaluate_diagnostics(ctx: &mut Context<'_>, evaluate: NodeId) -> Vec<Diagnostic> {
    let NodeKind::Evaluate {
        fun,
        type_inputs,
        inputs,
    } = ctx.tree().kind(evaluate)
    else {
        return Vec::new();
    };
    let mut out = Vec::new();

    let Some(definition) = callee(ctx, evaluate) else {
        let received = ctx.get_type(*fun);
        if !received.is_unresolved() && received != Type::Any {
            out.push(Diagnostic::new(DiagnosticKind::NotAFunction {
                evaluate,
                fun: *fun,
                received,
            }));
        }
        return out;
    };
    let Some(declared) = inputs_of(ctx, definition) else {
        return out;
    };
    let subject = call_subject(ctx, *fun);

    for (index, given) in inputs.iter().enumerate() {
        match declared.get(index) {
            Some(input) => {
                let expected =
                    expected_input(ctx, definition, *input, type_inputs, subject.as_ref());
                incompatible(ctx, *given, expected, &mut out);
            }
            None => out.push(Diagnostic::new(DiagnosticKind::UnexpectedInput {
                function: definition,
                input: *given,
            })),
        }
    }

    // Only the first required input that was not given is reported.
    let tree = ctx.tree();
    let missing = declared
        .iter()
        .skip(inputs.len())
        .find(|input| matches!(tree.kind(**input), NodeKind::Bind { value: None, .. }));
    if let Some(input) = missing {
        out.push(Diagnostic::new(DiagnosticKind::MissingInput {
            function: definition,
            evaluate,
            fun: *fun,
            last: inputs.last().copied().unwrap_or(*fun),
            input: *input,
        }));
    }
    out
}

pub(crate) fn binary_diagnostics(ctx: &mut Context<'_>, binary: NodeId) -> Vec<Diagnostic> {
    let NodeKind::Binary {
        operator,
        left,
        right,
    } = ctx.tree().kind(binary)
    else {
        return Vec::new();
    };
    let left = ctx.get_type(*left);
    if !is_checkable(&left) {
        return Vec::new();
    }
    let mut out = Vec::new();
    match operator_function(ctx, &left, operator) {
        None => out.push(Diagnostic::new(DiagnosticKind::UnknownOperator {
            node: binary,
            operator: operator.clone(),
            on: left,
        })),
        Some(function) => {
            if let Some(input) = inputs_of(ctx, function).and_then(|inputs| inputs.first()) {
                let expected = expected_input(ctx, function, *input, &[], Some(&left));
                incompatible(ctx, *right, expected, &mut out);
            }
        }
    }
    out
}

pub(crate) fn unary_diagnostics(ctx: &mut Context<'_>, unary: NodeId) -> Vec<Diagnostic> {
    let NodeKind::Unary { operator, operand } = ctx.tree().kind(unary) else {
        return Vec::new();
    };
    let on = ctx.get_type(*operand);
    if !is_checkable(&on) {
        return Vec::new();
    }
    let function =
        unary_function_name(operator).and_then(|name| operator_function(ctx, &on, name));
    match function {
        Some(_) => Vec::new(),
        None => vec![Diagnostic::new(DiagnosticKind::UnknownOperator {
            node: unary,
            operator: operator.clone(),
            on,
        })],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Argument, Locales};
    use crate::testing::{finish, fixture, kinds};

    #[test]
    fn missing_input_on_program_function() {
        let mut p = fixture();
        let b = p.builder();
        let a = b.bind("a", None, None);
        let second = b.bind("b", None, None);
        let zero = b.number(0.0);
        let f = b.function("f", vec![a, second], None, Some(zero));
        let f_ref = b.reference("f");
        let one = b.number(1.0);
        let call = b.evaluate(f_ref, vec![one]);
        let root = b.block(vec![f, call]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let found = evaluate_diagnostics(&mut ctx, call);
        assert_eq!(found.len(), 1);
        let DiagnosticKind::MissingInput {
            input, fun, last, ..
        } = found[0].kind()
        else {
            panic!("expected missing input, got {found:?}");
        };
        assert_eq!(*input, second);
        assert_eq!(*last, one);

        let primary = found[0].primary(&ctx);
        assert_eq!(primary.node, second);
        assert_eq!(primary.explanation.args, vec![Argument::Node(second)]);
        let secondary = found[0].secondary(&ctx).unwrap();
        assert_eq!(secondary.node, *fun);
        assert_eq!(secondary.node, f_ref);
        assert_eq!(
            secondary.explanation.render(&Locales::default(), &ctx),
            "f needs another input."
        );
    }

    #[test]
    fn missing_input_on_builtin_is_a_concept() {
        let mut p = fixture();
        let b = p.builder();
        let text = b.text("ab");
        let repeat = b.property(text, "repeat");
        let call = b.evaluate(repeat, vec![]);
        let root = b.block(vec![call]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        let found = evaluate_diagnostics(&mut ctx, call);
        assert_eq!(found.len(), 1);
        let primary = found[0].primary(&ctx);
        assert!(!project.contains(primary.node));
        assert_eq!(
            primary.explanation.args,
            vec![Argument::Concept("repeat/count".into())]
        );
        assert_eq!(
            primary.explanation.render(&Locales::default(), &ctx),
            "repeat/count is required, but wasn't given."
        );
        assert_eq!(found[0].secondary(&ctx).unwrap().node, repeat);
    }

    #[test]
    fn defaults_are_not_missing() {
        let mut p = fixture();
        let b = p.builder();
        let two = b.number(2.0);
        let a = b.bind("a", None, Some(two));
        let a_ref = b.reference("a");
        let f = b.function("f", vec![a], None, Some(a_ref));
        let f_ref = b.reference("f");
        let call = b.evaluate(f_ref, vec![]);
        let root = b.block(vec![f, call]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert!(evaluate_diagnostics(&mut ctx, call).is_empty());
    }

    #[test]
    fn extra_and_incompatible_inputs() {
        let mut p = fixture();
        let b = p.builder();
        let annotation = b.measurement_type("");
        let n = b.bind("n", Some(annotation), None);
        let n_ref = b.reference("n");
        let f = b.function("f", vec![n], None, Some(n_ref));
        let f_ref = b.reference("f");
        let text = b.text("no");
        let extra = b.number(3.0);
        let call = b.evaluate(f_ref, vec![text, extra]);
        let root = b.block(vec![f, call]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(
            kinds(&evaluate_diagnostics(&mut ctx, call)),
            ["IncompatibleInput", "UnexpectedInput"]
        );
        assert_eq!(ctx.get_type(call), Type::number());
    }

    #[test]
    fn not_a_function() {
        let mut p = fixture();
        let b = p.builder();
        let one = b.number(1.0);
        let x = b.bind("x", None, Some(one));
        let x_ref = b.reference("x");
        let call = b.evaluate(x_ref, vec![]);
        let root = b.block(vec![x, call]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(kinds(&evaluate_diagnostics(&mut ctx, call)), ["NotAFunction"]);
        assert_eq!(ctx.get_type(call), Type::Unknown);
    }

    #[test]
    fn operators_take_the_left_unit() {
        let mut p = fixture();
        let b = p.builder();
        let five = b.measurement(5.0, "m");
        let two = b.measurement(2.0, "m");
        let sum = b.binary("+", five, two);
        let three = b.number(3.0);
        let scaled = b.binary("×", sum, three);
        let limit = b.measurement(20.0, "m");
        let less = b.binary("<", scaled, limit);
        let ten = b.measurement(10.0, "m");
        let negated = b.unary("-", ten);
        let root = b.block(vec![less, negated]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(ctx.get_type(sum), Type::measurement("m"));
        assert_eq!(ctx.get_type(scaled), Type::measurement("m"));
        assert_eq!(ctx.get_type(less), Type::Boolean);
        assert_eq!(ctx.get_type(negated), Type::measurement("m"));
        for node in [sum, scaled, less] {
            assert!(binary_diagnostics(&mut ctx, node).is_empty());
        }
        assert!(unary_diagnostics(&mut ctx, negated).is_empty());
    }

    #[test]
    fn mismatched_units_and_unknown_operators() {
        let mut p = fixture();
        let b = p.builder();
        let five = b.measurement(5.0, "m");
        let two = b.measurement(2.0, "s");
        let sum = b.binary("+", five, two);
        let yes = b.boolean(true);
        let no = b.boolean(false);
        let product = b.binary("×", yes, no);
        let maybe = b.boolean(true);
        let negated = b.unary("-", maybe);
        let root = b.block(vec![sum, product, negated]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(kinds(&binary_diagnostics(&mut ctx, sum)), ["IncompatibleInput"]);
        assert_eq!(kinds(&binary_diagnostics(&mut ctx, product)), ["UnknownOperator"]);
        assert_eq!(kinds(&unary_diagnostics(&mut ctx, negated)), ["UnknownOperator"]);
        assert_eq!(ctx.get_type(product), Type::Unknown);
    }

    #[test]
    fn generic_output_from_type_inputs() {
        let mut p = fixture();
        let b = p.builder();
        let t = b.type_variable("T");
        let t_output = b.name_type("T", vec![]);
        let t_input = b.name_type("T", vec![]);
        let value = b.bind("value", Some(t_input), None);
        let value_ref = b.reference("value");
        let identity = b.add(NodeKind::Function {
            names: verse_core::Names::one("identity"),
            type_variables: vec![t],
            inputs: vec![value],
            output: Some(t_output),
            body: Some(value_ref),
        });
        let identity_ref = b.reference("identity");
        let text_type = b.text_type();
        let hello = b.text("hello");
        let call = b.add(NodeKind::Evaluate {
            fun: identity_ref,
            type_inputs: vec![text_type],
            inputs: vec![hello],
        });
        let root = b.block(vec![identity, call]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(ctx.get_type(call), Type::text());
        assert!(evaluate_diagnostics(&mut ctx, call).is_empty());
    }

    #[test]
    fn recursive_function_terminates() {
        let mut p = fixture();
        let b = p.builder();
        let annotation = b.measurement_type("");
        let n = b.bind("n", Some(annotation), None);
        let n1 = b.reference("n");
        let one = b.number(1.0);
        let base = b.binary("<", n1, one);
        let n2 = b.reference("n");
        let n3 = b.reference("n");
        let one_again = b.number(1.0);
        let smaller = b.binary("-", n3, one_again);
        let f_inner = b.reference("factorial");
        let recurse = b.evaluate(f_inner, vec![smaller]);
        let product = b.binary("×", n2, recurse);
        let result = b.number(1.0);
        let body = b.conditional(base, result, product);
        let factorial = b.function("factorial", vec![n], None, Some(body));
        let f_ref = b.reference("factorial");
        let five = b.number(5.0);
        let call = b.evaluate(f_ref, vec![five]);
        let root = b.block(vec![factorial, call]);
        let project = finish(p, root);
        let mut ctx = project.context("main").unwrap();

        assert_eq!(ctx.get_type(call), Type::number());
        assert!(!ctx.get_type(recurse).is_union());
        assert!(crate::diagnostics::analyze(&mut ctx).is_empty());
    }
}
