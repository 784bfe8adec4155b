// ABOUTME: Process-wide error/warning reporting shared by the lexer, parser, resolver, and interpreter

use crate::error::RuntimeError;
use crate::token::{Token, TokenKind};
use std::cell::Cell;

/// Tracks whether any stage has reported a static or runtime error, and
/// formats diagnostics the way every stage of the pipeline needs them.
#[derive(Debug, Default)]
pub struct Diagnostics {
    had_error: Cell<bool>,
    had_runtime_error: Cell<bool>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn had_error(&self) -> bool {
        self.had_error.get()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.get()
    }

    /// Reset the per-turn error flag. Called after every REPL turn; `had_runtime_error`
    /// is intentionally left alone since it is only consulted in file mode.
    pub fn reset_error(&self) {
        self.had_error.set(false);
    }

    /// Report a lex error at a raw line/column (the lexer has no token yet).
    pub fn lex_error(&self, line: usize, column: usize, message: &str) {
        self.report(line, column, "", message);
    }

    /// Report a parse or resolution error anchored at a token.
    pub fn error_at_token(&self, token: &Token, message: &str) {
        let location = if token.kind == TokenKind::Eof {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        self.report(token.line, token.column, &location, message);
    }

    fn report(&self, line: usize, column: usize, location: &str, message: &str) {
        eprintln!("[line {} : col {}] Error{}: {}", line, column, location, message);
        self.had_error.set(true);
    }

    /// Report a defined-but-unused-local warning. Never sets `had_error`.
    pub fn warning_at_token(&self, token: &Token, message: &str) {
        eprintln!(
            "[line {} : col {}] Warning at '{}': {}",
            token.line, token.column, token.lexeme, message
        );
    }

    /// Report a runtime error produced by the interpreter.
    pub fn runtime_error(&self, error: &RuntimeError) {
        eprintln!("{}\n[line {}]", error.message, error.token.line);
        self.had_runtime_error.set(true);
    }
}
