//! Lists, tables and none.

use verse_core::{NativeTypeName, RegistrationError, TreeBuilder, Type, Value};
use verse_registry::{FunctionDecl, NativeFn, NativeRegistry};

use crate::mismatch;

pub fn install(
    registry: &mut NativeRegistry,
    builder: &mut TreeBuilder,
) -> Result<(), RegistrationError> {
    registry.register_function(
        builder,
        FunctionDecl::new(NativeTypeName::List, "length")
            .output(Type::number())
            .implement(length),
    )?;
    registry.register_function(
        builder,
        FunctionDecl::new(NativeTypeName::Table, "length")
            .output(Type::number())
            .implement(length),
    )?;
    for on in [NativeTypeName::List, NativeTypeName::None, NativeTypeName::Table] {
        let equality: [(&str, NativeFn); 2] = [("=", equal), ("≠", not_equal)];
        for (operator, implementation) in equality {
            registry.register_function(
                builder,
                FunctionDecl::new(on, operator)
                    .input("value", Type::Any)
                    .output(Type::Boolean)
                    .implement(implementation),
            )?;
        }
    }
    Ok(())
}

fn length(subject: Option<&Value>, _: &[Value]) -> Value {
    match subject {
        Some(Value::List(items)) => Value::number(items.len() as f64),
        Some(Value::Table(table)) => Value::number(table.rows.len() as f64),
        other => mismatch("[]", other),
    }
}

fn equal(subject: Option<&Value>, inputs: &[Value]) -> Value {
    Value::Boolean(subject.is_some() && subject == inputs.first())
}

fn not_equal(subject: Option<&Value>, inputs: &[Value]) -> Value {
    Value::Boolean(subject != inputs.first())
}
