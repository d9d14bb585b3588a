//! Measurement arithmetic and comparison.
//!
//! Signatures are declared with unitless measurements; analysis reads a
//! unitless measurement in a measurement built-in as "the subject's unit",
//! so `1m + 2m` is typed `#m`. At runtime units must agree for every binary
//! operator except `×` and `÷`, whose right operand may be unitless.

use ordered_float::OrderedFloat;
use verse_core::{NativeTypeName, RegistrationError, TreeBuilder, Type, Unit, Value};
use verse_registry::{FunctionDecl, NativeFn, NativeRegistry};

use crate::mismatch;

pub fn install(
    registry: &mut NativeRegistry,
    builder: &mut TreeBuilder,
) -> Result<(), RegistrationError> {
    let on = NativeTypeName::Measurement;

    let arithmetic: [(&str, NativeFn); 4] =
        [("+", add), ("-", subtract), ("×", multiply), ("÷", divide)];
    for (operator, implementation) in arithmetic {
        registry.register_function(
            builder,
            FunctionDecl::new(on, operator)
                .input("number", Type::number())
                .output(Type::number())
                .implement(implementation),
        )?;
    }

    let comparisons: [(&str, NativeFn); 6] = [
        ("<", less),
        (">", greater),
        ("≤", at_most),
        ("≥", at_least),
        ("=", equal),
        ("≠", not_equal),
    ];
    for (operator, implementation) in comparisons {
        registry.register_function(
            builder,
            FunctionDecl::new(on, operator)
                .input("number", Type::number())
                .output(Type::Boolean)
                .implement(implementation),
        )?;
    }

    registry.register_function(
        builder,
        FunctionDecl::new(on, "negate")
            .output(Type::number())
            .implement(negate),
    )?;
    Ok(())
}

// =============================================================================
// IMPLEMENTATIONS
// =============================================================================

/// Both operands as measurements, or the exception to return instead.
fn operands<'v>(
    subject: Option<&'v Value>,
    inputs: &'v [Value],
) -> Result<((f64, &'v Unit), (f64, &'v Unit)), Value> {
    let left = match subject {
        Some(Value::Measurement { amount, unit }) => (amount.0, unit),
        other => return Err(mismatch("#", other)),
    };
    let right = match inputs.first() {
        Some(Value::Measurement { amount, unit }) => (amount.0, unit),
        other => return Err(mismatch("#", other)),
    };
    Ok((left, right))
}

/// Apply `op` when the units agree.
fn same_unit(subject: Option<&Value>, inputs: &[Value], op: fn(f64, f64) -> f64) -> Value {
    match operands(subject, inputs) {
        Ok(((a, unit), (b, other))) if unit == other => Value::Measurement {
            amount: OrderedFloat(op(a, b)),
            unit: unit.clone(),
        },
        Ok(((_, unit), _)) => mismatch(&format!("#{unit}"), inputs.first()),
        Err(exception) => exception,
    }
}

/// Apply `op` keeping the left unit; the right operand must share it or be unitless.
fn scaled(subject: Option<&Value>, inputs: &[Value], op: fn(f64, f64) -> f64) -> Value {
    match operands(subject, inputs) {
        Ok(((a, unit), (b, other))) if unit == other || other.is_unitless() => Value::Measurement {
            amount: OrderedFloat(op(a, b)),
            unit: unit.clone(),
        },
        Ok(((_, unit), _)) => mismatch(&format!("#{unit}"), inputs.first()),
        Err(exception) => exception,
    }
}

fn compare(subject: Option<&Value>, inputs: &[Value], op: fn(f64, f64) -> bool) -> Value {
    match operands(subject, inputs) {
        Ok(((a, unit), (b, other))) if unit == other => Value::Boolean(op(a, b)),
        Ok(((_, unit), _)) => mismatch(&format!("#{unit}"), inputs.first()),
        Err(exception) => exception,
    }
}

fn add(subject: Option<&Value>, inputs: &[Value]) -> Value {
    same_unit(subject, inputs, |a, b| a + b)
}

fn subtract(subject: Option<&Value>, inputs: &[Value]) -> Value {
    same_unit(subject, inputs, |a, b| a - b)
}

fn multiply(subject: Option<&Value>, inputs: &[Value]) -> Value {
    scaled(subject, inputs, |a, b| a * b)
}

fn divide(subject: Option<&Value>, inputs: &[Value]) -> Value {
    scaled(subject, inputs, |a, b| a / b)
}

fn less(subject: Option<&Value>, inputs: &[Value]) -> Value {
    compare(subject, inputs, |a, b| a < b)
}

fn greater(subject: Option<&Value>, inputs: &[Value]) -> Value {
    compare(subject, inputs, |a, b| a > b)
}

fn at_most(subject: Option<&Value>, inputs: &[Value]) -> Value {
    compare(subject, inputs, |a, b| a <= b)
}

fn at_least(subject: Option<&Value>, inputs: &[Value]) -> Value {
    compare(subject, inputs, |a, b| a >= b)
}

fn equal(subject: Option<&Value>, inputs: &[Value]) -> Value {
    Value::Boolean(subject.is_some() && subject == inputs.first())
}

fn not_equal(subject: Option<&Value>, inputs: &[Value]) -> Value {
    Value::Boolean(subject != inputs.first())
}

fn negate(subject: Option<&Value>, _: &[Value]) -> Value {
    match subject {
        Some(Value::Measurement { amount, unit }) => Value::Measurement {
            amount: OrderedFloat(-amount.0),
            unit: unit.clone(),
        },
        other => mismatch("#", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_keeps_units() {
        let two_m = Value::measurement(2.0, "m");
        assert_eq!(
            add(Some(&two_m), &[Value::measurement(3.0, "m")]),
            Value::measurement(5.0, "m")
        );
        assert_eq!(
            multiply(Some(&two_m), &[Value::number(4.0)]),
            Value::measurement(8.0, "m")
        );
    }

    #[test]
    fn mismatched_units_are_exceptions() {
        let two_m = Value::measurement(2.0, "m");
        assert!(add(Some(&two_m), &[Value::measurement(1.0, "s")]).is_exception());
        assert!(less(Some(&two_m), &[Value::text("x")]).is_exception());
    }

    #[test]
    fn comparisons() {
        let one = Value::number(1.0);
        assert_eq!(less(Some(&one), &[Value::number(2.0)]), Value::Boolean(true));
        assert_eq!(at_least(Some(&one), &[Value::number(2.0)]), Value::Boolean(false));
        assert_eq!(equal(Some(&one), &[Value::number(1.0)]), Value::Boolean(true));
    }

    #[test]
    fn negation() {
        assert_eq!(
            negate(Some(&Value::measurement(4.0, "s")), &[]),
            Value::measurement(-4.0, "s")
        );
    }
}
