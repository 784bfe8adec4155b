// ABOUTME: User-defined and native callables

use crate::ast::FunctionDecl;
use crate::callable::Callable;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::interpreter::{Interpreter, Signal};
use crate::token::Token;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// A `fun` declaration or lambda expression, closed over the environment
/// active at the point it was created.
#[derive(Debug)]
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<Environment>,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Rc<Environment>, is_initializer: bool) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    /// Returns a new function whose closure is a fresh scope binding `this`
    /// to `instance`. Used when a method is looked up off an instance.
    pub fn bind(&self, instance: Value) -> LoxFunction {
        let env = Environment::with_parent(Rc::clone(&self.closure));
        env.define("this", instance);
        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.declaration.name.as_ref().map(|t| t.lexeme.as_str())
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        _call_site: &Token,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let call_env = Environment::with_parent(Rc::clone(&self.closure));
        for (param, arg) in self.declaration.params.iter().zip(args) {
            call_env.define(param.lexeme.clone(), arg);
        }

        let signal = interpreter.execute_block(&self.declaration.body, call_env)?;

        match signal {
            Signal::Break(token) => Err(RuntimeError::new(
                token,
                crate::error::ERR_BREAK_OUTSIDE_LOOP.to_string(),
            )),
            _ if self.is_initializer => Ok(self.closure.get_at(0, "this")),
            Signal::Return(value) => Ok(value),
            Signal::Normal => Ok(Value::Nil),
        }
    }

    fn name(&self) -> Option<&str> {
        LoxFunction::name(self)
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "<fn {}>", name),
            None => write!(f, "<fn>"),
        }
    }
}

pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

/// A function implemented in Rust and exposed to Lox programs, e.g. `clock`.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction").field("name", &self.name).finish()
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        call_site: &Token,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        (self.func)(&args).map_err(|message| RuntimeError::new(call_site.clone(), message))
    }

    fn name(&self) -> Option<&str> {
        Some(self.name)
    }
}
