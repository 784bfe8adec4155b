// ABOUTME: Environment module for managing lexically scoped variable bindings

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a new global environment with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a new child environment enclosing `parent`.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Defines a binding in THIS scope (doesn't walk the parent chain). Shadows
    /// any existing binding of the same name in this scope.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Looks up a symbol in this scope and, recursively, in parent scopes.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.bindings.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }
        if let Some(parent) = &self.parent {
            return parent.get(name);
        }
        Err(RuntimeError::new(
            name.clone(),
            format!("Undefined variable '{}'.", name.lexeme),
        ))
    }

    /// Overwrites an existing binding, walking outward if necessary.
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if self.bindings.borrow().contains_key(&name.lexeme) {
            self.bindings.borrow_mut().insert(name.lexeme.clone(), value);
            return Ok(());
        }
        if let Some(parent) = &self.parent {
            return parent.assign(name, value);
        }
        Err(RuntimeError::new(
            name.clone(),
            format!("Undefined variable '{}'.", name.lexeme),
        ))
    }

    /// Walks `enclosing` `distance` times. Panics on underrun: the resolver
    /// guarantees a binding exists at exactly this depth, so running out of
    /// parents means the resolver and evaluator have drifted out of sync.
    fn ancestor(self: &Rc<Self>, distance: usize) -> Rc<Environment> {
        let mut env = Rc::clone(self);
        for _ in 0..distance {
            let parent = env
                .parent
                .clone()
                .expect("resolver distance exceeds environment chain depth");
            env = parent;
        }
        env
    }

    /// Reads a name from exactly `ancestor(distance)`'s local scope, no walking.
    pub fn get_at(self: &Rc<Self>, distance: usize, name: &str) -> Value {
        self.ancestor(distance)
            .bindings
            .borrow()
            .get(name)
            .cloned()
            .expect("resolver guaranteed binding at this depth")
    }

    /// Writes a name into exactly `ancestor(distance)`'s local scope, no walking.
    pub fn assign_at(self: &Rc<Self>, distance: usize, name: &Token, value: Value) {
        self.ancestor(distance)
            .bindings
            .borrow_mut()
            .insert(name.lexeme.clone(), value);
    }

    /// Snapshot of this scope's own bindings, for the REPL's `.env` dump.
    /// Does not walk into enclosing scopes.
    pub fn local_bindings(&self) -> Vec<(String, Value)> {
        self.bindings
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn ident(name: &str) -> Token {
        Token::new(TokenKind::Identifier, name, None, 1, 1)
    }

    #[test]
    fn define_and_get() {
        let env = Environment::new();
        env.define("x", Value::Number(42.0));
        match env.get(&ident("x")) {
            Ok(Value::Number(n)) => assert_eq!(n, 42.0),
            other => panic!("expected Number(42.0), got {:?}", other),
        }
    }

    #[test]
    fn undefined_symbol_errors() {
        let env = Environment::new();
        assert!(env.get(&ident("undefined")).is_err());
    }

    #[test]
    fn shadowing_in_child_scope() {
        let parent = Environment::new();
        parent.define("x", Value::Number(1.0));
        let child = Environment::with_parent(parent);
        child.define("x", Value::Number(2.0));
        match child.get(&ident("x")) {
            Ok(Value::Number(n)) => assert_eq!(n, 2.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parent_lookup_through_chain() {
        let grandparent = Environment::new();
        grandparent.define("a", Value::Number(1.0));
        let parent = Environment::with_parent(grandparent);
        parent.define("b", Value::Number(2.0));
        let child = Environment::with_parent(parent);
        child.define("c", Value::Number(3.0));

        assert!(matches!(child.get(&ident("a")), Ok(Value::Number(n)) if n == 1.0));
        assert!(matches!(child.get(&ident("b")), Ok(Value::Number(n)) if n == 2.0));
        assert!(matches!(child.get(&ident("c")), Ok(Value::Number(n)) if n == 3.0));
    }

    #[test]
    fn get_at_reads_exact_ancestor_without_walking() {
        let grandparent = Environment::new();
        grandparent.define("x", Value::Number(1.0));
        let parent = Environment::with_parent(grandparent);
        parent.define("x", Value::Number(2.0));
        let child = Environment::with_parent(parent);

        assert!(matches!(child.get_at(0, "x"), Value::Number(n) if n == 2.0));
        assert!(matches!(child.get_at(1, "x"), Value::Number(n) if n == 1.0));
    }

    #[test]
    fn assign_at_writes_exact_ancestor() {
        let parent = Environment::new();
        parent.define("x", Value::Number(1.0));
        let child = Environment::with_parent(parent.clone());
        child.assign_at(1, &ident("x"), Value::Number(9.0));

        assert!(matches!(parent.get(&ident("x")), Ok(Value::Number(n)) if n == 9.0));
    }

    #[test]
    fn assign_to_undefined_errors() {
        let env = Environment::new();
        assert!(env.assign(&ident("x"), Value::Number(1.0)).is_err());
    }
}
