// ABOUTME: Static pass computing variable scope depth and enforcing scoping rules

use crate::ast::{Expr, ExprKind, FunctionDecl, Stmt, StmtKind};
use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;
use crate::token::Token;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarState {
    Declared,
    Defined,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

type Scope = HashMap<String, (VarState, Token)>;

pub struct Resolver<'a> {
    scopes: Vec<Scope>,
    current_function: FunctionType,
    current_class: ClassType,
    diagnostics: &'a Diagnostics,
}

pub fn resolve(stmts: &[Stmt], interpreter: &mut Interpreter, diagnostics: &Diagnostics) {
    let mut resolver = Resolver {
        scopes: Vec::new(),
        current_function: FunctionType::None,
        current_class: ClassType::None,
        diagnostics,
    };
    resolver.resolve_stmts(stmts, interpreter);
}

impl<'a> Resolver<'a> {
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for (name, (state, token)) in scope {
                if state == VarState::Defined {
                    self.diagnostics.warning_at_token(
                        &token,
                        &format!("Local variable '{}' is defined but never used.", name),
                    );
                }
            }
        }
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.contains_key(&name.lexeme) {
            self.diagnostics.error_at_token(name, "Variable with this name already declared in this scope.");
        }
        scope.insert(name.lexeme.clone(), (VarState::Declared, name.clone()));
    }

    fn define(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        scope.insert(name.lexeme.clone(), (VarState::Defined, name.clone()));
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt], interpreter: &mut Interpreter) {
        for stmt in stmts {
            self.resolve_stmt(stmt, interpreter);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt, interpreter: &mut Interpreter) {
        match &stmt.kind {
            StmtKind::Expression(expr) | StmtKind::Echo(expr) => self.resolve_expr(expr, interpreter),
            StmtKind::Let(name, init) => {
                self.declare(name);
                if let Some(init) = init {
                    self.resolve_expr(init, interpreter);
                }
                self.define(name);
            }
            StmtKind::Block(stmts) => {
                self.begin_scope();
                self.resolve_stmts(stmts, interpreter);
                self.end_scope();
            }
            StmtKind::If(cond, then_branch, else_branch) => {
                self.resolve_expr(cond, interpreter);
                self.resolve_stmt(then_branch, interpreter);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch, interpreter);
                }
            }
            StmtKind::While(cond, body) => {
                self.resolve_expr(cond, interpreter);
                self.resolve_stmt(body, interpreter);
            }
            StmtKind::Break(_) => {}
            StmtKind::Return(keyword, value) => {
                if self.current_function == FunctionType::None {
                    self.diagnostics.error_at_token(keyword, "Cannot return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.diagnostics
                            .error_at_token(keyword, "Cannot return a value from an initializer.");
                    }
                    self.resolve_expr(value, interpreter);
                }
            }
            StmtKind::Function(name, decl) => {
                self.declare(name);
                self.define(name);
                self.resolve_function(decl, FunctionType::Function, interpreter);
            }
            StmtKind::Class(name, superclass, methods) => {
                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                if let Some(superclass_expr) = superclass {
                    if let ExprKind::Variable(super_name) = &superclass_expr.kind {
                        if super_name.lexeme == name.lexeme {
                            self.diagnostics.error_at_token(super_name, "A class cannot inherit from itself.");
                        }
                    }
                    self.current_class = ClassType::Subclass;
                    self.resolve_expr(superclass_expr, interpreter);

                    self.begin_scope();
                    self.scopes.last_mut().unwrap().insert(
                        "super".to_string(),
                        (VarState::Read, name.clone()),
                    );
                }

                self.begin_scope();
                self.scopes
                    .last_mut()
                    .unwrap()
                    .insert("this".to_string(), (VarState::Read, name.clone()));

                for (method_name, decl) in methods {
                    let function_type = if method_name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };
                    self.resolve_function(decl, function_type, interpreter);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }
        }
    }

    fn resolve_function(&mut self, decl: &Rc<FunctionDecl>, function_type: FunctionType, interpreter: &mut Interpreter) {
        let enclosing_function = self.current_function;
        self.current_function = function_type;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&decl.body, interpreter);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr, interpreter: &mut Interpreter) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Grouping(inner) => self.resolve_expr(inner, interpreter),
            ExprKind::Unary(_, right) => self.resolve_expr(right, interpreter),
            ExprKind::Binary(left, _, right) | ExprKind::Logical(left, _, right) => {
                self.resolve_expr(left, interpreter);
                self.resolve_expr(right, interpreter);
            }
            ExprKind::Conditional(cond, then_expr, else_expr) => {
                self.resolve_expr(cond, interpreter);
                self.resolve_expr(then_expr, interpreter);
                self.resolve_expr(else_expr, interpreter);
            }
            ExprKind::Variable(name) => {
                // Walk outward to the nearest scope binding this name (matching
                // the order `resolve_local` resolves in) rather than only the
                // innermost scope, so a self-read nested inside e.g. a lambda
                // body still sees the enclosing `Declared` slot it closes over.
                for scope in self.scopes.iter().rev() {
                    if let Some((state, _)) = scope.get(&name.lexeme) {
                        if *state == VarState::Declared {
                            self.diagnostics
                                .error_at_token(name, "Cannot read local variable in its own initializer.");
                        }
                        break;
                    }
                }
                self.resolve_local(expr, name, interpreter, true);
            }
            ExprKind::Assign(name, value) => {
                self.resolve_expr(value, interpreter);
                self.resolve_local(expr, name, interpreter, false);
            }
            ExprKind::Call(callee, _, args) => {
                self.resolve_expr(callee, interpreter);
                for arg in args {
                    self.resolve_expr(arg, interpreter);
                }
            }
            ExprKind::Get(object, _) => self.resolve_expr(object, interpreter),
            ExprKind::Set(object, _, value) => {
                self.resolve_expr(value, interpreter);
                self.resolve_expr(object, interpreter);
            }
            ExprKind::This(keyword) => {
                if self.current_class == ClassType::None {
                    self.diagnostics.error_at_token(keyword, "Cannot use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(expr, keyword, interpreter, true);
            }
            ExprKind::Super(keyword, _method) => {
                match self.current_class {
                    ClassType::None => {
                        self.diagnostics.error_at_token(keyword, "Cannot use 'super' outside of a class.");
                    }
                    ClassType::Class => {
                        self.diagnostics
                            .error_at_token(keyword, "Cannot use 'super' in a class with no superclass.");
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(expr, keyword, interpreter, true);
            }
            ExprKind::FunctionExpr(decl) => {
                self.resolve_function(decl, FunctionType::Function, interpreter);
            }
        }
    }

    /// Walks the scope stack from innermost outward, recording the depth of
    /// the first match in the interpreter's resolution map. `mark_read`
    /// distinguishes a read (`Variable`, `this`, `super`) from a write
    /// (`Assign`), which per spec never promotes a slot out of `Defined`.
    fn resolve_local(&mut self, expr: &Expr, name: &Token, interpreter: &mut Interpreter, mark_read: bool) {
        for (i, scope) in self.scopes.iter_mut().enumerate().rev() {
            if let Some(entry) = scope.get_mut(&name.lexeme) {
                if mark_read {
                    entry.0 = VarState::Read;
                }
                interpreter.resolve(expr.id, self.scopes.len() - 1 - i);
                return;
            }
        }
        // Not found in any scope: treated as global, resolved by name at call time.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::LitValue;
    use crate::token::TokenKind;

    fn ident(name: &str) -> Token {
        Token::new(TokenKind::Identifier, name, None, 1, 1)
    }

    fn var_expr(name: &str) -> Expr {
        Expr::new(ExprKind::Variable(ident(name)))
    }

    #[test]
    fn block_scoped_local_resolves_to_depth_zero() {
        let mut interpreter = Interpreter::new();
        let diag = Diagnostics::new();
        let var = var_expr("a");
        let var_id = var.id;
        let stmts = vec![Stmt::new(StmtKind::Block(vec![
            Stmt::new(StmtKind::Let(ident("a"), Some(Expr::new(ExprKind::Literal(LitValue::Number(1.0)))))),
            Stmt::new(StmtKind::Echo(var)),
        ]))];
        resolve(&stmts, &mut interpreter, &diag);
        assert!(!diag.had_error());
        assert_eq!(interpreter.resolved_depth(var_id), Some(0));
    }

    #[test]
    fn self_read_nested_inside_a_lambda_initializer_still_errors() {
        use crate::ast::FunctionDecl;
        let mut interpreter = Interpreter::new();
        let diag = Diagnostics::new();
        let lambda_body = vec![Stmt::new(StmtKind::Return(ident("return"), Some(var_expr("a"))))];
        let lambda = Expr::new(ExprKind::FunctionExpr(Rc::new(FunctionDecl {
            name: None,
            params: vec![],
            body: lambda_body,
        })));
        let stmts = vec![Stmt::new(StmtKind::Block(vec![Stmt::new(StmtKind::Let(
            ident("a"),
            Some(lambda),
        ))]))];
        resolve(&stmts, &mut interpreter, &diag);
        assert!(diag.had_error());
    }

    #[test]
    fn self_read_in_initializer_errors() {
        let mut interpreter = Interpreter::new();
        let diag = Diagnostics::new();
        let stmts = vec![Stmt::new(StmtKind::Block(vec![Stmt::new(StmtKind::Let(
            ident("a"),
            Some(var_expr("a")),
        ))]))];
        resolve(&stmts, &mut interpreter, &diag);
        assert!(diag.had_error());
    }

    #[test]
    fn duplicate_declaration_in_same_scope_errors() {
        let mut interpreter = Interpreter::new();
        let diag = Diagnostics::new();
        let stmts = vec![Stmt::new(StmtKind::Block(vec![
            Stmt::new(StmtKind::Let(ident("a"), None)),
            Stmt::new(StmtKind::Let(ident("a"), None)),
        ]))];
        resolve(&stmts, &mut interpreter, &diag);
        assert!(diag.had_error());
    }

    #[test]
    fn unused_local_warns_without_setting_had_error() {
        let mut interpreter = Interpreter::new();
        let diag = Diagnostics::new();
        let stmts = vec![Stmt::new(StmtKind::Block(vec![Stmt::new(StmtKind::Let(
            ident("unused"),
            Some(Expr::new(ExprKind::Literal(LitValue::Number(1.0)))),
        ))]))];
        resolve(&stmts, &mut interpreter, &diag);
        assert!(!diag.had_error());
    }

    #[test]
    fn return_outside_function_errors() {
        let mut interpreter = Interpreter::new();
        let diag = Diagnostics::new();
        let stmts = vec![Stmt::new(StmtKind::Return(ident("return"), None))];
        resolve(&stmts, &mut interpreter, &diag);
        assert!(diag.had_error());
    }

    #[test]
    fn this_outside_class_errors() {
        let mut interpreter = Interpreter::new();
        let diag = Diagnostics::new();
        let stmts = vec![Stmt::new(StmtKind::Expression(Expr::new(ExprKind::This(ident("this")))))];
        resolve(&stmts, &mut interpreter, &diag);
        assert!(diag.had_error());
    }
}
