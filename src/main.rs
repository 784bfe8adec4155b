use lox_interpreter::driver::Lox;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let code = match args.as_slice() {
        [] => lox_interpreter::repl::run(),
        [path] => run_file(path),
        _ => {
            println!("Usage: lox [script]");
            69
        }
    };

    ExitCode::from(code as u8)
}

/// Executes a script file. Exit codes follow the sysexits(3) convention the
/// language uses throughout: 65 for a static (lex/parse/resolve) error, 70
/// for an uncaught runtime error, 66 if the file itself can't be read.
fn run_file(path: &str) -> i32 {
    let mut lox = Lox::new();
    if let Err(err) = lox.run_file(Path::new(path)) {
        eprintln!("Cannot read file '{}': {}", path, err);
        return 66;
    }
    if lox.had_error() {
        65
    } else if lox.had_runtime_error() {
        70
    } else {
        0
    }
}
