// ABOUTME: Version and REPL presentation constants

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const REPL_PROMPT: &str = "[lox]>";
pub const WELCOME_MESSAGE: &str = "Lox interpreter";
