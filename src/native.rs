// ABOUTME: Native functions and globals installed into the top-level environment

use crate::environment::Environment;
use crate::function::NativeFunction;
use crate::value::Value;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Populates `globals` with the native functions and constants every Lox
/// program starts with.
pub fn install(globals: &Rc<Environment>) {
    define_native(globals, "clock", 0, native_clock);
    define_native(globals, "len", 1, native_len);
    define_native(globals, "type", 1, native_type);
    globals.define("PI", Value::Number(std::f64::consts::PI));
}

fn define_native(globals: &Rc<Environment>, name: &'static str, arity: usize, func: crate::function::NativeFn) {
    globals.define(
        name,
        Value::NativeFunction(Rc::new(NativeFunction { name, arity, func })),
    );
}

fn native_clock(_args: &[Value]) -> Result<Value, String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| "system clock is before the Unix epoch".to_string())?;
    Ok(Value::Number(now.as_millis() as f64))
}

fn native_len(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        other => Err(format!("len() expects a string, got {}.", other.type_name())),
    }
}

fn native_type(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(args[0].type_name().to_string()))
}
