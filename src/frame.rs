//! Value and scope stacks of one evaluation.

use std::rc::Rc;

use verse_core::{Names, Scope, Value};

/// Operands waiting for a finish step, and the scopes names are read from.
///
/// The first scope holds a call's inputs and chains to the closure the
/// callee was created in; blocks push and pop scopes above it.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    values: Vec<Value>,
    scopes: Vec<Scope>,
    subject: Option<Value>,
}

impl Frame {
    pub fn new(scope: Scope, subject: Option<Value>) -> Self {
        Self {
            values: Vec::new(),
            scopes: vec![scope],
            subject,
        }
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Pop the top value. An exhausted stack yields none.
    pub fn pop(&mut self) -> Value {
        self.values.pop().unwrap_or(Value::None)
    }

    /// The last `n` values, in push order.
    pub fn pop_many(&mut self, n: usize) -> Vec<Value> {
        let at = self.values.len().saturating_sub(n);
        self.values.split_off(at)
    }

    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes.iter().rev().find_map(|s| s.get(name)).cloned()
    }

    pub fn bind(&mut self, names: &Names, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.bind(names, value);
        }
    }

    pub fn enter_block(&mut self) {
        self.scopes.push(Scope::new(None));
    }

    pub fn exit_block(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// The value a built-in or member function was resolved on.
    pub fn subject(&self) -> Option<&Value> {
        self.subject.as_ref()
    }

    /// Every visible binding, flattened into one scope chained to the
    /// enclosing closure.
    pub fn snapshot(&self) -> Rc<Scope> {
        let base = self.scopes.first().and_then(|s| s.parent().cloned());
        let mut flat = Scope::new(base);
        for scope in &self.scopes {
            flat.absorb(scope);
        }
        Rc::new(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_shadow_and_unwind() {
        let mut frame = Frame::new(Scope::new(None), None);
        frame.bind(&Names::one("x"), Value::number(1.0));
        frame.enter_block();
        frame.bind(&Names::one("x"), Value::number(2.0));
        assert_eq!(frame.lookup("x"), Some(Value::number(2.0)));
        let snapshot = frame.snapshot();
        frame.exit_block();
        assert_eq!(frame.lookup("x"), Some(Value::number(1.0)));
        assert_eq!(snapshot.get("x"), Some(&Value::number(2.0)));
    }

    #[test]
    fn pop_many_keeps_order() {
        let mut frame = Frame::default();
        for n in 1..=3 {
            frame.push(Value::number(f64::from(n)));
        }
        assert_eq!(frame.pop_many(2), [Value::number(2.0), Value::number(3.0)]);
        assert_eq!(frame.pop(), Value::number(1.0));
        assert_eq!(frame.pop(), Value::None);
    }
}
