//! Boolean logic.
//!
//! `&` and `|` are registered here so analysis can type them, but the
//! evaluator short-circuits them before the built-in would run.

use verse_core::{NativeTypeName, RegistrationError, TreeBuilder, Type, Value};
use verse_registry::{FunctionDecl, NativeFn, NativeRegistry};

use crate::mismatch;

pub fn install(
    registry: &mut NativeRegistry,
    builder: &mut TreeBuilder,
) -> Result<(), RegistrationError> {
    let on = NativeTypeName::Boolean;
    let binary: [(&str, NativeFn); 4] =
        [("&", and), ("|", or), ("=", equal), ("≠", not_equal)];
    for (operator, implementation) in binary {
        registry.register_function(
            builder,
            FunctionDecl::new(on, operator)
                .input("boolean", Type::Boolean)
                .output(Type::Boolean)
                .implement(implementation),
        )?;
    }
    registry.register_function(
        builder,
        FunctionDecl::new(on, "not")
            .output(Type::Boolean)
            .implement(not),
    )?;
    Ok(())
}

fn both(subject: Option<&Value>, inputs: &[Value]) -> Result<(bool, bool), Value> {
    let left = subject
        .and_then(Value::as_bool)
        .ok_or_else(|| mismatch("?", subject))?;
    let right = inputs
        .first()
        .and_then(Value::as_bool)
        .ok_or_else(|| mismatch("?", inputs.first()))?;
    Ok((left, right))
}

fn and(subject: Option<&Value>, inputs: &[Value]) -> Value {
    both(subject, inputs).map_or_else(|e| e, |(a, b)| Value::Boolean(a && b))
}

fn or(subject: Option<&Value>, inputs: &[Value]) -> Value {
    both(subject, inputs).map_or_else(|e| e, |(a, b)| Value::Boolean(a || b))
}

fn equal(subject: Option<&Value>, inputs: &[Value]) -> Value {
    both(subject, inputs).map_or_else(|e| e, |(a, b)| Value::Boolean(a == b))
}

fn not_equal(subject: Option<&Value>, inputs: &[Value]) -> Value {
    both(subject, inputs).map_or_else(|e| e, |(a, b)| Value::Boolean(a != b))
}

fn not(subject: Option<&Value>, _: &[Value]) -> Value {
    match subject.and_then(Value::as_bool) {
        Some(b) => Value::Boolean(!b),
        None => mismatch("?", subject),
    }
}
