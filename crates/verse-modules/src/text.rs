//! Text operations.

use verse_core::{NativeTypeName, RegistrationError, TreeBuilder, Type, Value};
use verse_registry::{FunctionDecl, NativeFn, NativeRegistry};

use crate::mismatch;

pub fn install(
    registry: &mut NativeRegistry,
    builder: &mut TreeBuilder,
) -> Result<(), RegistrationError> {
    let text = NativeTypeName::Text;
    registry.register_function(
        builder,
        FunctionDecl::new(text, "length")
            .output(Type::number())
            .implement(length),
    )?;
    registry.register_function(
        builder,
        FunctionDecl::new(text, "+")
            .input("text", Type::text())
            .output(Type::text())
            .implement(combine),
    )?;
    registry.register_function(
        builder,
        FunctionDecl::new(text, "repeat")
            .input("count", Type::number())
            .output(Type::text())
            .implement(repeat),
    )?;
    for (operator, implementation) in [("=", equal as NativeFn), ("≠", not_equal)] {
        registry.register_function(
            builder,
            FunctionDecl::new(text, operator)
                .input("text", Type::text())
                .output(Type::Boolean)
                .implement(implementation),
        )?;
    }
    Ok(())
}

fn length(subject: Option<&Value>, _: &[Value]) -> Value {
    match subject {
        Some(Value::Text(text)) => Value::number(text.chars().count() as f64),
        other => mismatch("''", other),
    }
}

fn combine(subject: Option<&Value>, inputs: &[Value]) -> Value {
    match (subject, inputs.first()) {
        (Some(Value::Text(left)), Some(Value::Text(right))) => Value::text(format!("{left}{right}")),
        (Some(Value::Text(_)), other) => mismatch("''", other),
        (other, _) => mismatch("''", other),
    }
}

fn repeat(subject: Option<&Value>, inputs: &[Value]) -> Value {
    match (subject, inputs.first().and_then(Value::as_number)) {
        (Some(Value::Text(text)), Some(count)) => {
            Value::text(text.repeat(count.max(0.0).floor() as usize))
        }
        (Some(Value::Text(_)), _) => mismatch("#", inputs.first()),
        (other, _) => mismatch("''", other),
    }
}

fn equal(subject: Option<&Value>, inputs: &[Value]) -> Value {
    Value::Boolean(subject.is_some() && subject == inputs.first())
}

fn not_equal(subject: Option<&Value>, inputs: &[Value]) -> Value {
    Value::Boolean(subject != inputs.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_counts_characters() {
        assert_eq!(length(Some(&Value::text("héllo")), &[]), Value::number(5.0));
    }

    #[test]
    fn repeat_text() {
        assert_eq!(
            repeat(Some(&Value::text("ab")), &[Value::number(3.0)]),
            Value::text("ababab")
        );
        assert!(repeat(Some(&Value::text("ab")), &[]).is_exception());
    }

    #[test]
    fn combine_and_compare() {
        let hello = Value::text("hello");
        assert_eq!(
            combine(Some(&hello), &[Value::text(" world")]),
            Value::text("hello world")
        );
        assert_eq!(equal(Some(&hello), &[Value::text("hello")]), Value::Boolean(true));
        assert_eq!(not_equal(Some(&hello), &[Value::text("hello")]), Value::Boolean(false));
    }
}
