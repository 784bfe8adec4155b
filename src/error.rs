// ABOUTME: Error types for lexing, parsing, resolution, and evaluation failures

use crate::token::Token;
use thiserror::Error;

// ===== Common runtime error message strings (mirrors the teacher's shared-constant style) =====
pub const ERR_OPERANDS_NUMBERS: &str = "Operands must be numbers.";
pub const ERR_OPERANDS_NUMBERS_OR_STRINGS: &str = "Operands must be two numbers or two strings.";
pub const ERR_DIVISION_BY_ZERO: &str = "Division by zero is not allowed.";
pub const ERR_NOT_CALLABLE: &str = "Can only call functions and classes.";
pub const ERR_SUPERCLASS_NOT_CLASS: &str = "Superclass must be a class.";
pub const ERR_BREAK_OUTSIDE_LOOP: &str = "Break statement used outside of loop.";

/// A syntax error detected by the lexer or parser. Reporting has already
/// happened through the `Diagnostics` sink by the time this is constructed;
/// it exists purely to unwind the recursive-descent call stack to the
/// statement boundary where `synchronize` resumes.
#[derive(Debug, Clone, Copy, Error)]
#[error("parse error")]
pub struct ParseError;

/// A runtime error raised while evaluating a resolved, well-formed AST.
/// Carries the offending token so the diagnostics sink can print `[line L]`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        RuntimeError {
            token,
            message: message.into(),
        }
    }

    pub fn arity(token: Token, expected: usize, actual: usize) -> Self {
        RuntimeError::new(
            token,
            format!("Expected {} arguments but got {}.", expected, actual),
        )
    }
}
