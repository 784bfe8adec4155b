// ABOUTME: Interactive read-eval-print loop built on rustyline

use crate::ast::{Expr, ExprKind, Stmt, StmtKind};
use crate::config::{REPL_PROMPT, VERSION, WELCOME_MESSAGE};
use crate::driver::Lox;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::Path;

/// Presentation toggles set by `.ast`/`.expr`, independent of the driver's
/// own state so they survive across REPL turns without touching `Lox`.
#[derive(Default)]
struct ReplModes {
    dump_ast: bool,
    dump_expr: bool,
}

/// Runs the REPL until `.exit`, EOF (Ctrl-D), or Ctrl-C. Returns the process
/// exit code: 0 on a clean exit, 70 if the session ever hit a runtime error.
pub fn run() -> i32 {
    println!("{} v{}", WELCOME_MESSAGE, VERSION);
    println!("Type .exit to quit, .ast/.expr/.env/.load for REPL commands.");

    let mut editor = DefaultEditor::new().expect("failed to initialize line editor");
    let mut lox = Lox::new();
    let mut modes = ReplModes::default();

    loop {
        match editor.readline(REPL_PROMPT) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(input);

                if input.starts_with('.') {
                    if handle_command(input, &mut modes, &mut lox) {
                        break;
                    }
                } else {
                    let stmts = lox.run_source(input, true);
                    if modes.dump_ast {
                        for stmt in &stmts {
                            println!("{:#?}", stmt);
                        }
                    }
                    if modes.dump_expr {
                        for stmt in &stmts {
                            if let Some(expr) = expression_of(stmt) {
                                println!("{}", sexpr(expr));
                            }
                        }
                    }
                }
                lox.reset_error();
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Readline error: {}", err);
                break;
            }
        }
    }

    if lox.had_runtime_error() {
        70
    } else {
        0
    }
}

/// Dispatches a `.`-prefixed REPL command. Returns true when the REPL should exit.
fn handle_command(input: &str, modes: &mut ReplModes, lox: &mut Lox) -> bool {
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command {
        ".exit" => return true,
        ".ast" => {
            modes.dump_ast = !modes.dump_ast;
            println!("AST dump {}", if modes.dump_ast { "enabled" } else { "disabled" });
        }
        ".expr" => {
            modes.dump_expr = !modes.dump_expr;
            println!("Expression dump {}", if modes.dump_expr { "enabled" } else { "disabled" });
        }
        ".env" => {
            let bindings = lox.global_bindings();
            if bindings.is_empty() {
                println!("(empty environment)");
            } else {
                for (name, value) in bindings {
                    println!("{} = {}", name, value);
                }
            }
        }
        ".load" => {
            if rest.is_empty() {
                println!("Usage: .load <path>");
            } else if let Err(err) = lox.run_file(Path::new(rest)) {
                eprintln!("Cannot read file '{}': {}", rest, err);
            }
        }
        _ => println!("Unknown command '{}'", input),
    }
    false
}

/// The expression carried by a bare expression statement, if any — what
/// `.expr` renders. Other statement kinds have nothing to show.
fn expression_of(stmt: &Stmt) -> Option<&Expr> {
    match &stmt.kind {
        StmtKind::Expression(expr) | StmtKind::Echo(expr) => Some(expr),
        _ => None,
    }
}

/// Renders an expression as a parenthesized prefix form, for the REPL's
/// `.expr` debug toggle only; the interpreter never consumes this form.
fn sexpr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(lit) => format!("{:?}", lit),
        ExprKind::Grouping(inner) => format!("(group {})", sexpr(inner)),
        ExprKind::Unary(op, right) => format!("({} {})", op.lexeme, sexpr(right)),
        ExprKind::Binary(left, op, right) => format!("({} {} {})", op.lexeme, sexpr(left), sexpr(right)),
        ExprKind::Logical(left, op, right) => format!("({} {} {})", op.lexeme, sexpr(left), sexpr(right)),
        ExprKind::Conditional(cond, then_expr, else_expr) => {
            format!("(?: {} {} {})", sexpr(cond), sexpr(then_expr), sexpr(else_expr))
        }
        ExprKind::Variable(name) => name.lexeme.clone(),
        ExprKind::Assign(name, value) => format!("(= {} {})", name.lexeme, sexpr(value)),
        ExprKind::Call(callee, _, args) => {
            let rendered_args: Vec<String> = args.iter().map(sexpr).collect();
            format!("(call {} {})", sexpr(callee), rendered_args.join(" "))
        }
        ExprKind::Get(object, name) => format!("(get {} {})", sexpr(object), name.lexeme),
        ExprKind::Set(object, name, value) => {
            format!("(set {} {} {})", sexpr(object), name.lexeme, sexpr(value))
        }
        ExprKind::This(_) => "this".to_string(),
        ExprKind::Super(_, method) => format!("(super {})", method.lexeme),
        ExprKind::FunctionExpr(_) => "<fn>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::LitValue;
    use crate::token::{Token, TokenKind};

    #[test]
    fn sexpr_renders_binary_expression_in_prefix_form() {
        let left = Expr::new(ExprKind::Literal(LitValue::Number(1.0)));
        let right = Expr::new(ExprKind::Literal(LitValue::Number(2.0)));
        let plus = Token::new(TokenKind::Plus, "+", None, 1, 1);
        let expr = Expr::new(ExprKind::Binary(Box::new(left), plus, Box::new(right)));
        assert_eq!(sexpr(&expr), "(+ Number(1.0) Number(2.0))");
    }

    #[test]
    fn expression_of_ignores_non_expression_statements() {
        let stmt = Stmt::new(StmtKind::Break(Token::new(TokenKind::Break, "break", None, 1, 1)));
        assert!(expression_of(&stmt).is_none());
    }
}
