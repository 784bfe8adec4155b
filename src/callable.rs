// ABOUTME: Capability shared by every callable runtime value (functions, natives, classes)

use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

pub trait Callable {
    fn arity(&self) -> usize;
    /// `call_site` is the closing `)` token, used to anchor arity/native
    /// errors at the call expression rather than the callee's declaration.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        call_site: &Token,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError>;
    /// Used only for diagnostics/stringify, never for dispatch.
    fn name(&self) -> Option<&str>;
}
