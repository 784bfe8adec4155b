// ABOUTME: Owns the pipeline state (diagnostics, interpreter) that persists across REPL turns and file runs

use crate::ast::Stmt;
use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;
use crate::{lexer, parser, resolver};
use std::path::Path;

/// Runs source through lexer -> parser -> resolver -> interpreter, owning the
/// interpreter and diagnostics state that must survive between REPL turns
/// (global bindings, resolved variable depths, the error flags).
pub struct Lox {
    diagnostics: Diagnostics,
    interpreter: Interpreter,
}

impl Lox {
    pub fn new() -> Self {
        Lox {
            diagnostics: Diagnostics::new(),
            interpreter: Interpreter::new(),
        }
    }

    pub fn had_error(&self) -> bool {
        self.diagnostics.had_error()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.diagnostics.had_runtime_error()
    }

    pub fn reset_error(&self) {
        self.diagnostics.reset_error()
    }

    /// Runs one chunk of source: a whole file, or a single REPL turn.
    /// `repl_mode` makes bare expression statements print their value.
    /// Returns the parsed statements (even on a parse/resolve error) so a
    /// caller like the REPL's `.ast`/`.expr` toggles can inspect the same
    /// parse pass instead of re-lexing and double-reporting diagnostics.
    pub fn run_source(&mut self, source: &str, repl_mode: bool) -> Vec<Stmt> {
        let tokens = lexer::scan(source, &self.diagnostics);
        let stmts = parser::parse(tokens, &self.diagnostics);
        if self.diagnostics.had_error() {
            return stmts;
        }
        resolver::resolve(&stmts, &mut self.interpreter, &self.diagnostics);
        if self.diagnostics.had_error() {
            return stmts;
        }
        self.interpreter.interpret(&stmts, &self.diagnostics, repl_mode);
        stmts
    }

    pub fn run_file(&mut self, path: &Path) -> std::io::Result<()> {
        let source = std::fs::read_to_string(path)?;
        let _ = self.run_source(&source, false);
        Ok(())
    }

    /// Bindings in the global scope, for the REPL's `.env` command.
    pub fn global_bindings(&self) -> Vec<(String, String)> {
        let mut bindings: Vec<(String, String)> = self
            .interpreter
            .globals
            .local_bindings()
            .into_iter()
            .map(|(name, value)| (name, value.to_string()))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }
}

impl Default for Lox {
    fn default() -> Self {
        Lox::new()
    }
}
