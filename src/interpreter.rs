// ABOUTME: Tree-walking evaluator executing a resolved AST against an environment chain

use crate::ast::{Expr, ExprKind, LitValue, NodeId, Stmt, StmtKind};
use crate::callable::Callable;
use crate::class::{LoxClass, LoxInstance};
use crate::diagnostics::Diagnostics;
use crate::environment::Environment;
use crate::error::{
    RuntimeError, ERR_BREAK_OUTSIDE_LOOP, ERR_DIVISION_BY_ZERO, ERR_NOT_CALLABLE, ERR_OPERANDS_NUMBERS,
    ERR_OPERANDS_NUMBERS_OR_STRINGS, ERR_SUPERCLASS_NOT_CLASS,
};
use crate::function::LoxFunction;
use crate::native;
use crate::token::{Token, TokenKind};
use crate::value::Value;
use std::collections::HashMap;
use std::rc::Rc;

/// What a statement's execution did, distinct from `Result`'s error channel:
/// `RuntimeError` unwinds because something went wrong, these unwind because
/// `return`/`break` say so.
#[derive(Debug)]
pub enum Signal {
    Normal,
    Return(Value),
    Break(Token),
}

pub struct Interpreter {
    pub globals: Rc<Environment>,
    environment: Rc<Environment>,
    resolution: HashMap<NodeId, usize>,
    repl_mode: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new();
        native::install(&globals);
        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            resolution: HashMap::new(),
            repl_mode: false,
        }
    }

    /// Records that the expression node `id` refers to a binding `depth`
    /// scopes outward from wherever it is evaluated. Called by the resolver.
    pub fn resolve(&mut self, id: NodeId, depth: usize) {
        self.resolution.insert(id, depth);
    }

    #[cfg(test)]
    pub fn resolved_depth(&self, id: NodeId) -> Option<usize> {
        self.resolution.get(&id).copied()
    }

    /// Executes every top-level statement, reporting and continuing past
    /// runtime errors so one broken statement doesn't abort the whole file
    /// or REPL turn.
    pub fn interpret(&mut self, stmts: &[Stmt], diagnostics: &Diagnostics, repl_mode: bool) {
        self.repl_mode = repl_mode;
        for stmt in stmts {
            match self.execute(stmt) {
                Ok(Signal::Break(token)) => {
                    diagnostics.runtime_error(&RuntimeError::new(token, ERR_BREAK_OUTSIDE_LOOP.to_string()));
                }
                Ok(_) => {}
                Err(err) => diagnostics.runtime_error(&err),
            }
        }
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<Signal, RuntimeError> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                let value = self.evaluate(expr)?;
                if self.repl_mode {
                    println!("{}", value);
                }
                Ok(Signal::Normal)
            }
            StmtKind::Echo(expr) => {
                let value = self.evaluate(expr)?;
                println!("{}", value);
                Ok(Signal::Normal)
            }
            StmtKind::Let(name, init) => {
                let value = match init {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme.clone(), value);
                Ok(Signal::Normal)
            }
            StmtKind::Block(stmts) => {
                let env = Environment::with_parent(Rc::clone(&self.environment));
                self.execute_block(stmts, env)
            }
            StmtKind::If(cond, then_branch, else_branch) => {
                if self.evaluate(cond)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Signal::Normal)
                }
            }
            StmtKind::While(cond, body) => {
                while self.evaluate(cond)?.is_truthy() {
                    match self.execute(body)? {
                        Signal::Normal => {}
                        Signal::Break(_) => break,
                        other @ Signal::Return(_) => return Ok(other),
                    }
                }
                Ok(Signal::Normal)
            }
            StmtKind::Break(token) => Ok(Signal::Break(token.clone())),
            StmtKind::Return(_, value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Signal::Return(value))
            }
            StmtKind::Function(name, decl) => {
                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment.define(name.lexeme.clone(), Value::Function(Rc::new(function)));
                Ok(Signal::Normal)
            }
            StmtKind::Class(name, superclass_expr, methods) => {
                self.execute_class(name, superclass_expr, methods)
            }
        }
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass_expr: &Option<Expr>,
        methods: &[(Token, Rc<crate::ast::FunctionDecl>)],
    ) -> Result<Signal, RuntimeError> {
        let superclass = match superclass_expr {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => return Err(RuntimeError::new(name.clone(), ERR_SUPERCLASS_NOT_CLASS.to_string())),
            },
            None => None,
        };

        self.environment.define(name.lexeme.clone(), Value::Nil);

        let method_closure = if let Some(superclass) = &superclass {
            let env = Environment::with_parent(Rc::clone(&self.environment));
            env.define("super", Value::Class(Rc::clone(superclass)));
            env
        } else {
            Rc::clone(&self.environment)
        };

        let mut method_map = HashMap::new();
        for (method_name, decl) in methods {
            let is_initializer = method_name.lexeme == "init";
            let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&method_closure), is_initializer);
            method_map.insert(method_name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass, method_map);
        self.environment.assign(name, Value::Class(Rc::new(class)))?;
        Ok(Signal::Normal)
    }

    /// Runs `stmts` in a fresh scope enclosing `env`, restoring the previous
    /// environment on every exit path: normal completion, an early signal,
    /// or a propagating error.
    pub fn execute_block(&mut self, stmts: &[Stmt], env: Rc<Environment>) -> Result<Signal, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, env);
        let mut result = Ok(Signal::Normal);
        for stmt in stmts {
            match self.execute(stmt) {
                Ok(Signal::Normal) => continue,
                Ok(other) => {
                    result = Ok(other);
                    break;
                }
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        self.environment = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(literal_value(lit)),
            ExprKind::Grouping(inner) => self.evaluate(inner),
            ExprKind::Unary(op, right) => self.evaluate_unary(op, right),
            ExprKind::Binary(left, op, right) => self.evaluate_binary(left, op, right),
            ExprKind::Logical(left, op, right) => self.evaluate_logical(left, op, right),
            ExprKind::Conditional(cond, then_expr, else_expr) => {
                if self.evaluate(cond)?.is_truthy() {
                    self.evaluate(then_expr)
                } else {
                    self.evaluate(else_expr)
                }
            }
            ExprKind::Variable(name) => self.lookup_variable(name, expr.id),
            ExprKind::Assign(name, value_expr) => {
                let value = self.evaluate(value_expr)?;
                match self.resolution.get(&expr.id) {
                    Some(&depth) => self.environment.assign_at(depth, name, value.clone()),
                    None => self.globals.assign(name, value.clone())?,
                }
                Ok(value)
            }
            ExprKind::Call(callee, paren, args) => {
                let callee_value = self.evaluate(callee)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.evaluate(arg)?);
                }
                self.call_value(callee_value, paren, arg_values)
            }
            ExprKind::Get(object, name) => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name),
                _ => Err(RuntimeError::new(name.clone(), "Only instances have properties.".to_string())),
            },
            ExprKind::Set(object, name, value_expr) => {
                let instance = match self.evaluate(object)? {
                    Value::Instance(instance) => instance,
                    _ => return Err(RuntimeError::new(name.clone(), "Only instances have fields.".to_string())),
                };
                let value = self.evaluate(value_expr)?;
                instance.set(name, value.clone());
                Ok(value)
            }
            ExprKind::This(keyword) => self.lookup_variable(keyword, expr.id),
            ExprKind::Super(_keyword, method) => self.evaluate_super(method, expr.id),
            ExprKind::FunctionExpr(decl) => {
                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                Ok(Value::Function(Rc::new(function)))
            }
        }
    }

    fn evaluate_unary(&mut self, op: &Token, right: &Expr) -> Result<Value, RuntimeError> {
        let right = self.evaluate(right)?;
        match op.kind {
            TokenKind::Bang => Ok(Value::Boolean(!right.is_truthy())),
            TokenKind::Minus => Ok(Value::Number(-number_operand(op, &right)?)),
            _ => unreachable!("unary operator token kind {:?} cannot appear in a unary expression", op.kind),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, RuntimeError> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;
        match op.kind {
            TokenKind::Plus => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::String(format!("{}{}", left, right)))
                }
                _ => Err(RuntimeError::new(op.clone(), ERR_OPERANDS_NUMBERS_OR_STRINGS.to_string())),
            },
            TokenKind::Minus => Ok(Value::Number(number_operand(op, &left)? - number_operand(op, &right)?)),
            TokenKind::Star => Ok(Value::Number(number_operand(op, &left)? * number_operand(op, &right)?)),
            TokenKind::Slash => {
                let divisor = number_operand(op, &right)?;
                if divisor == 0.0 {
                    return Err(RuntimeError::new(op.clone(), ERR_DIVISION_BY_ZERO.to_string()));
                }
                Ok(Value::Number(number_operand(op, &left)? / divisor))
            }
            TokenKind::Greater => Ok(Value::Boolean(number_operand(op, &left)? > number_operand(op, &right)?)),
            TokenKind::GreaterEqual => Ok(Value::Boolean(number_operand(op, &left)? >= number_operand(op, &right)?)),
            TokenKind::Less => Ok(Value::Boolean(number_operand(op, &left)? < number_operand(op, &right)?)),
            TokenKind::LessEqual => Ok(Value::Boolean(number_operand(op, &left)? <= number_operand(op, &right)?)),
            TokenKind::EqualEqual => Ok(Value::Boolean(left.lox_eq(&right))),
            TokenKind::BangEqual => Ok(Value::Boolean(!left.lox_eq(&right))),
            _ => unreachable!("binary operator token kind {:?} cannot appear in a binary expression", op.kind),
        }
    }

    fn evaluate_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, RuntimeError> {
        let left = self.evaluate(left)?;
        match op.kind {
            TokenKind::Or if left.is_truthy() => Ok(left),
            TokenKind::Or => self.evaluate(right),
            TokenKind::And if !left.is_truthy() => Ok(left),
            TokenKind::And => self.evaluate(right),
            _ => unreachable!("logical operator token kind {:?} cannot appear in a logical expression", op.kind),
        }
    }

    fn evaluate_super(&mut self, method: &Token, id: NodeId) -> Result<Value, RuntimeError> {
        let depth = *self
            .resolution
            .get(&id)
            .expect("resolver always resolves a valid 'super' reference");
        let superclass = match self.environment.get_at(depth, "super") {
            Value::Class(class) => class,
            _ => unreachable!("'super' slot never holds a non-class value"),
        };
        let instance = self.environment.get_at(depth - 1, "this");

        let bound = superclass
            .find_method(&method.lexeme)
            .ok_or_else(|| RuntimeError::new(method.clone(), format!("Undefined property '{}'.", method.lexeme)))?
            .bind(instance);
        Ok(Value::Function(Rc::new(bound)))
    }

    fn call_value(&mut self, callee: Value, paren: &Token, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(function) => {
                check_arity(paren, function.arity(), args.len())?;
                function.call(self, paren, args)
            }
            Value::NativeFunction(native) => {
                check_arity(paren, native.arity, args.len())?;
                native.call(self, paren, args)
            }
            Value::Class(class) => {
                check_arity(paren, class.arity(), args.len())?;
                let instance = Rc::new(LoxInstance::new(Rc::clone(&class)));
                if let Some(init) = class.find_method("init") {
                    let bound = init.bind(Value::Instance(Rc::clone(&instance)));
                    bound.call(self, paren, args)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => Err(RuntimeError::new(paren.clone(), ERR_NOT_CALLABLE.to_string())),
        }
    }

    fn lookup_variable(&self, name: &Token, id: NodeId) -> Result<Value, RuntimeError> {
        match self.resolution.get(&id) {
            Some(&depth) => Ok(self.environment.get_at(depth, &name.lexeme)),
            None => self.globals.get(name),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

fn literal_value(lit: &LitValue) -> Value {
    match lit {
        LitValue::Number(n) => Value::Number(*n),
        LitValue::Str(s) => Value::String(s.clone()),
        LitValue::Bool(b) => Value::Boolean(*b),
        LitValue::Nil => Value::Nil,
    }
}

fn number_operand(op: &Token, value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Number(n) => Ok(*n),
        _ => Err(RuntimeError::new(op.clone(), ERR_OPERANDS_NUMBERS.to_string())),
    }
}

fn check_arity(paren: &Token, expected: usize, actual: usize) -> Result<(), RuntimeError> {
    if expected != actual {
        return Err(RuntimeError::arity(paren.clone(), expected, actual));
    }
    Ok(())
}
