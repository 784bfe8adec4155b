// ABOUTME: Recursive-descent parser with panic-mode recovery building the typed AST

use crate::ast::{Expr, ExprKind, FunctionDecl, LitValue, Stmt, StmtKind};
use crate::diagnostics::Diagnostics;
use crate::error::ParseError;
use crate::token::{Literal, Token, TokenKind};
use std::rc::Rc;

const MAX_ARGS: usize = 255;

pub fn parse(tokens: Vec<Token>, diagnostics: &Diagnostics) -> Vec<Stmt> {
    let mut parser = Parser {
        tokens,
        current: 0,
        diagnostics,
    };
    let mut statements = Vec::new();
    while !parser.is_at_end() {
        if let Some(stmt) = parser.declaration() {
            statements.push(stmt);
        }
    }
    statements
}

struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: &'a Diagnostics,
}

impl<'a> Parser<'a> {
    // ===== token-stream primitives =====

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.current + 1)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.peek_next().is_some_and(|t| t.kind == kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|&k| self.match_kind(k))
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        Err(self.error(self.peek().clone(), message))
    }

    /// Reports and returns a `ParseError` to unwind to the nearest `?`.
    fn error(&self, token: Token, message: &str) -> ParseError {
        self.diagnostics.error_at_token(&token, message);
        ParseError
    }

    /// Reports without unwinding; used where the grammar says "report but
    /// keep parsing" (argument/parameter count caps).
    fn report_error(&self, token: &Token, message: &str) {
        self.diagnostics.error_at_token(token, message);
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Echo
                | TokenKind::Fn
                | TokenKind::For
                | TokenKind::If
                | TokenKind::Let
                | TokenKind::While
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ===== declarations =====

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_kind(TokenKind::Class) {
            self.class_declaration()
        } else if self.check(TokenKind::Fn) && self.check_next(TokenKind::Identifier) {
            self.advance();
            self.function_declaration("function")
        } else if self.match_kind(TokenKind::Let) {
            self.let_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(_) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenKind::Identifier, "Expect class name.")?;

        let superclass = if self.match_kind(TokenKind::Less) {
            let super_name = self.consume(TokenKind::Identifier, "Expect superclass name.")?;
            Some(Expr::new(ExprKind::Variable(super_name)))
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.")?;
        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            let method_name = self.consume(TokenKind::Identifier, "Expect method name.")?;
            let decl = self.function_body("method", Some(method_name.clone()))?;
            methods.push((method_name, Rc::new(decl)));
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::new(StmtKind::Class(name, superclass, methods)))
    }

    fn function_declaration(&mut self, kind: &str) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenKind::Identifier, &format!("Expect {} name.", kind))?;
        let decl = self.function_body(kind, Some(name.clone()))?;
        Ok(Stmt::new(StmtKind::Function(name, Rc::new(decl))))
    }

    fn function_body(&mut self, kind: &str, name: Option<Token>) -> Result<FunctionDecl, ParseError> {
        self.consume(TokenKind::LeftParen, &format!("Expect '(' after {} name.", kind))?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    let next = self.peek().clone();
                    self.report_error(&next, "Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenKind::LeftBrace, &format!("Expect '{{' before {} body.", kind))?;
        let body = self.block()?;
        Ok(FunctionDecl { name, params, body })
    }

    fn let_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;
        let initializer = if self.match_kind(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::new(StmtKind::Let(name, initializer)))
    }

    // ===== statements =====

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.match_kind(TokenKind::For) {
            self.for_statement()
        } else if self.match_kind(TokenKind::If) {
            self.if_statement()
        } else if self.match_kind(TokenKind::Echo) {
            self.echo_statement()
        } else if self.match_kind(TokenKind::Return) {
            self.return_statement()
        } else if self.match_kind(TokenKind::While) {
            self.while_statement()
        } else if self.match_kind(TokenKind::Break) {
            self.break_statement()
        } else if self.match_kind(TokenKind::LeftBrace) {
            Ok(Stmt::new(StmtKind::Block(self.block()?)))
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_kind(TokenKind::Semicolon) {
            None
        } else if self.match_kind(TokenKind::Let) {
            Some(self.let_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::new(StmtKind::Block(vec![body, Stmt::new(StmtKind::Expression(increment))]));
        }

        let condition = condition.unwrap_or_else(|| Expr::new(ExprKind::Literal(LitValue::Bool(true))));
        body = Stmt::new(StmtKind::While(condition, Box::new(body)));

        if let Some(initializer) = initializer {
            body = Stmt::new(StmtKind::Block(vec![initializer, body]));
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::new(StmtKind::If(condition, then_branch, else_branch)))
    }

    fn echo_statement(&mut self) -> Result<Stmt, ParseError> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::new(StmtKind::Echo(value)))
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::new(StmtKind::Return(keyword, value)))
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::new(StmtKind::While(condition, body)))
    }

    fn break_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.previous().clone();
        self.consume(TokenKind::Semicolon, "Expect ';' after 'break'.")?;
        Ok(Stmt::new(StmtKind::Break(keyword)))
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::new(StmtKind::Expression(expr)))
    }

    // ===== expressions, lowest to highest precedence =====

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.logic_or()?;

        if self.match_kind(TokenKind::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr.kind {
                ExprKind::Variable(name) => Ok(Expr::new(ExprKind::Assign(name, Box::new(value)))),
                ExprKind::Get(object, name) => Ok(Expr::new(ExprKind::Set(object, name, Box::new(value)))),
                other => {
                    self.report_error(&equals, "Invalid assignment target.");
                    Ok(Expr::new(other))
                }
            };
        }

        Ok(expr)
    }

    fn logic_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.logic_and()?;
        while self.match_kind(TokenKind::Or) {
            let op = self.previous().clone();
            let right = self.logic_and()?;
            expr = Expr::new(ExprKind::Logical(Box::new(expr), op, Box::new(right)));
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.conditional()?;
        while self.match_kind(TokenKind::And) {
            let op = self.previous().clone();
            let right = self.conditional()?;
            expr = Expr::new(ExprKind::Logical(Box::new(expr), op, Box::new(right)));
        }
        Ok(expr)
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let expr = self.equality()?;
        if self.match_kind(TokenKind::Question) {
            let then_expr = self.expression()?;
            self.consume(TokenKind::Colon, "Expect ':' after then branch of conditional expression.")?;
            let else_expr = self.conditional()?;
            return Ok(Expr::new(ExprKind::Conditional(
                Box::new(expr),
                Box::new(then_expr),
                Box::new(else_expr),
            )));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.comparison()?;
        while self.match_any(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::new(ExprKind::Binary(Box::new(expr), op, Box::new(right)));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.term()?;
        while self.match_any(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Expr::new(ExprKind::Binary(Box::new(expr), op, Box::new(right)));
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.factor()?;
        while self.match_any(&[TokenKind::Minus, TokenKind::Plus]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::new(ExprKind::Binary(Box::new(expr), op, Box::new(right)));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.unary()?;
        while self.match_any(&[TokenKind::Slash, TokenKind::Star]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::new(ExprKind::Binary(Box::new(expr), op, Box::new(right)));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.match_any(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::new(ExprKind::Unary(op, Box::new(right))));
        }
        self.call()
    }

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.match_kind(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_kind(TokenKind::Dot) {
                let name = self.consume(TokenKind::Identifier, "Expect property name after '.'.")?;
                expr = Expr::new(ExprKind::Get(Box::new(expr), name));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    let next = self.peek().clone();
                    self.report_error(&next, "Can't have more than 255 arguments.");
                }
                args.push(self.expression()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::new(ExprKind::Call(Box::new(callee), paren, args)))
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        if self.match_kind(TokenKind::False) {
            return Ok(Expr::new(ExprKind::Literal(LitValue::Bool(false))));
        }
        if self.match_kind(TokenKind::True) {
            return Ok(Expr::new(ExprKind::Literal(LitValue::Bool(true))));
        }
        if self.match_kind(TokenKind::Nil) {
            return Ok(Expr::new(ExprKind::Literal(LitValue::Nil)));
        }
        if self.match_kind(TokenKind::Number) {
            let n = match &self.previous().literal {
                Some(Literal::Number(n)) => *n,
                _ => unreachable!("NUMBER token always carries a decoded literal"),
            };
            return Ok(Expr::new(ExprKind::Literal(LitValue::Number(n))));
        }
        if self.match_kind(TokenKind::String) {
            let s = match &self.previous().literal {
                Some(Literal::Str(s)) => s.clone(),
                _ => unreachable!("STRING token always carries a decoded literal"),
            };
            return Ok(Expr::new(ExprKind::Literal(LitValue::Str(s))));
        }
        if self.match_kind(TokenKind::Super) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenKind::Identifier, "Expect superclass method name.")?;
            return Ok(Expr::new(ExprKind::Super(keyword, method)));
        }
        if self.match_kind(TokenKind::This) {
            return Ok(Expr::new(ExprKind::This(self.previous().clone())));
        }
        if self.match_kind(TokenKind::Identifier) {
            return Ok(Expr::new(ExprKind::Variable(self.previous().clone())));
        }
        if self.match_kind(TokenKind::LeftParen) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::new(ExprKind::Grouping(Box::new(expr))));
        }
        if self.match_kind(TokenKind::Fn) {
            let decl = self.function_body("function", None)?;
            return Ok(Expr::new(ExprKind::FunctionExpr(Rc::new(decl))));
        }

        let token = self.peek().clone();
        Err(self.error(token, "Expect expression."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;

    fn parse_source(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let diag = Diagnostics::new();
        let tokens = lexer::scan(source, &diag);
        let stmts = parse(tokens, &diag);
        (stmts, diag)
    }

    #[test]
    fn ternary_is_right_associative_and_sits_above_equality() {
        let (stmts, diag) = parse_source("echo 1 == 1 ? \"yes\" : \"no\";");
        assert!(!diag.had_error());
        match &stmts[0].kind {
            StmtKind::Echo(expr) => assert!(matches!(expr.kind, ExprKind::Conditional(..))),
            other => panic!("expected Echo, got {:?}", other),
        }
    }

    #[test]
    fn assignment_rewrites_variable_target() {
        let (stmts, diag) = parse_source("x = 1;");
        assert!(!diag.had_error());
        match &stmts[0].kind {
            StmtKind::Expression(expr) => assert!(matches!(expr.kind, ExprKind::Assign(..))),
            other => panic!("expected Expression, got {:?}", other),
        }
    }

    #[test]
    fn invalid_assignment_target_reports_without_aborting_parse() {
        let (stmts, diag) = parse_source("1 = 2;");
        assert!(diag.had_error());
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn fn_is_a_declaration_when_followed_by_identifier() {
        let (stmts, diag) = parse_source("fn f() { return 1; }");
        assert!(!diag.had_error());
        assert!(matches!(stmts[0].kind, StmtKind::Function(..)));
    }

    #[test]
    fn fn_is_a_lambda_expression_otherwise() {
        let (stmts, diag) = parse_source("let f = fn(x) { return x; };");
        assert!(!diag.had_error());
        match &stmts[0].kind {
            StmtKind::Let(_, Some(expr)) => assert!(matches!(expr.kind, ExprKind::FunctionExpr(_))),
            other => panic!("expected Let with initializer, got {:?}", other),
        }
    }

    #[test]
    fn for_loop_desugars_to_block_with_while() {
        let (stmts, diag) = parse_source("for (let i = 0; i < 3; i = i + 1) echo i;");
        assert!(!diag.had_error());
        match &stmts[0].kind {
            StmtKind::Block(inner) => {
                assert_eq!(inner.len(), 2);
                assert!(matches!(inner[0].kind, StmtKind::Let(..)));
                assert!(matches!(inner[1].kind, StmtKind::While(..)));
            }
            other => panic!("expected desugared Block, got {:?}", other),
        }
    }

    #[test]
    fn class_with_superclass_parses_methods() {
        let (stmts, diag) = parse_source("class B < A { greet() { return 1; } }");
        assert!(!diag.had_error());
        match &stmts[0].kind {
            StmtKind::Class(_, Some(_), methods) => assert_eq!(methods.len(), 1),
            other => panic!("expected Class with superclass, got {:?}", other),
        }
    }

    #[test]
    fn panic_mode_recovers_and_reports_multiple_errors() {
        let (stmts, diag) = parse_source("let = ; let y = 1;");
        assert!(diag.had_error());
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0].kind, StmtKind::Let(..)));
    }
}
