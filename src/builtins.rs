use crate::callable::BuiltIn;
use crate::context::Context;
use crate::environment::Scope;
use crate::error::{Diagnostic, ErrorKind};
use crate::interpreter::Interpreter;
use crate::position::Span;
use crate::value::{Value, ValueKind};
use std::f64::consts;
use std::fs;
use std::io;
use std::rc::Rc;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[1;1H";
const SCRIPT_EXTENSIONS: [&str; 2] = [".poop", ".\u{1F4A9}"];
const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const EXAMPLE: &str = "PROC greet(name): \"Hello, \" + name\nPOOP_OUT(greet(\"poopy\"))";

/// Bind the constants and native procedures every program starts with.
pub fn install(scope: &Scope) {
    scope.set("NULL", Value::null());
    scope.set("TRUE", Value::boolean(true));
    scope.set("FALSE", Value::boolean(false));
    scope.set("MATH_PI", Value::float(consts::PI));
    scope.set("MATH_EULER", Value::float(consts::E));
    scope.set("MATH_TAU", Value::float(2.0 * consts::PI));
    scope.set("MATH_INF", Value::float(f64::INFINITY));
    scope.set("POOPY", Value::string(commands()));
    scope.set("POOPY_INFO", Value::string(info()));
    scope.set("POOPY_AUTHOR", Value::string(AUTHOR));
    scope.set("POOPY_VERSION", Value::string(VERSION));
    scope.set("POOPY_EXAMPLE", Value::string(EXAMPLE));
    scope.set("SYMBOL_TABLE", Value::string(format!("{:^50}", "\u{1F4A9}".repeat(10))));

    for builtin in natives() {
        let name = builtin.name.clone();
        scope.set(&name, Value::new(ValueKind::BuiltIn(Rc::new(builtin))));
    }
}

fn commands() -> String {
    let names = ["POOPY_AUTHOR", "POOPY_VERSION", "POOPY_EXAMPLE", "POOPY_INFO"];
    format!("Available PooPy commands -> {}", names.join(" "))
}

fn info() -> String {
    format!("AUTHOR\t->\t{}\nVERSION\t->\t{}", AUTHOR, VERSION)
}

#[rustfmt::skip]
fn natives() -> Vec<BuiltIn> {
    vec![
        BuiltIn::new("POOP_OUT",     &["value"],    poop_out),
        BuiltIn::new("POOP_OUT_RET", &["value"],    poop_out_ret),
        BuiltIn::new("POOP_IN",      &[],           poop_in),
        BuiltIn::new("POOP_IN_INT",  &[],           poop_in_int),
        BuiltIn::new("CLEAR",        &[],           clear),
        BuiltIn::new("IS_NUMBER",    &["value"],    is_number),
        BuiltIn::new("IS_STRING",    &["value"],    is_string),
        BuiltIn::new("IS_LIST",      &["value"],    is_list),
        BuiltIn::new("IS_PROC",      &["value"],    is_proc),
        BuiltIn::new("IS_BUILTIN",   &["value"],    is_builtin),
        BuiltIn::new("MATH_SQRT",    &["value"],    math_sqrt),
        BuiltIn::new("POOP_RUN",     &["filename"], poop_run),
    ]
}

fn argument(context: &Context, name: &str) -> Value {
    context.scope.get(name).unwrap_or_else(Value::null)
}

fn console_failure(error: io::Error, span: &Span, context: &Context) -> Diagnostic {
    Diagnostic::runtime(
        ErrorKind::Runtime,
        format!("console I/O failed: {}", error),
        span,
        context,
    )
}

fn poop_out(interpreter: &mut Interpreter, context: &Context, span: &Span) -> Result<Value, Diagnostic> {
    let value = argument(context, "value");
    writeln!(interpreter.output(), "{}", value)
        .and_then(|_| interpreter.output().flush())
        .map_err(|e| console_failure(e, span, context))?;
    Ok(Value::null())
}

fn poop_out_ret(_: &mut Interpreter, context: &Context, _: &Span) -> Result<Value, Diagnostic> {
    Ok(Value::string(argument(context, "value").to_string()))
}

fn poop_in(interpreter: &mut Interpreter, context: &Context, span: &Span) -> Result<Value, Diagnostic> {
    let line = interpreter
        .read_line()
        .map_err(|e| console_failure(e, span, context))?;
    Ok(Value::string(line.unwrap_or_default()))
}

fn poop_in_int(interpreter: &mut Interpreter, context: &Context, span: &Span) -> Result<Value, Diagnostic> {
    let line = interpreter
        .read_line()
        .map_err(|e| console_failure(e, span, context))?
        .unwrap_or_default();
    match line.trim().parse::<i64>() {
        Ok(n) => Ok(Value::int(n)),
        Err(_) => Err(Diagnostic::runtime(
            ErrorKind::Value,
            format!("'{}' must be an integer", line),
            span,
            context,
        )),
    }
}

fn clear(interpreter: &mut Interpreter, context: &Context, span: &Span) -> Result<Value, Diagnostic> {
    write!(interpreter.output(), "{}", CLEAR_SCREEN)
        .and_then(|_| interpreter.output().flush())
        .map_err(|e| console_failure(e, span, context))?;
    Ok(Value::null())
}

fn is_number(_: &mut Interpreter, context: &Context, _: &Span) -> Result<Value, Diagnostic> {
    let value = argument(context, "value");
    Ok(Value::boolean(matches!(value.kind, ValueKind::Number(_))))
}

fn is_string(_: &mut Interpreter, context: &Context, _: &Span) -> Result<Value, Diagnostic> {
    let value = argument(context, "value");
    Ok(Value::boolean(matches!(value.kind, ValueKind::String(_))))
}

fn is_list(_: &mut Interpreter, context: &Context, _: &Span) -> Result<Value, Diagnostic> {
    let value = argument(context, "value");
    Ok(Value::boolean(matches!(value.kind, ValueKind::List(_))))
}

fn is_proc(_: &mut Interpreter, context: &Context, _: &Span) -> Result<Value, Diagnostic> {
    let value = argument(context, "value");
    Ok(Value::boolean(matches!(value.kind, ValueKind::Procedure(_))))
}

fn is_builtin(_: &mut Interpreter, context: &Context, _: &Span) -> Result<Value, Diagnostic> {
    let value = argument(context, "value");
    Ok(Value::boolean(matches!(value.kind, ValueKind::BuiltIn(_))))
}

fn math_sqrt(_: &mut Interpreter, context: &Context, span: &Span) -> Result<Value, Diagnostic> {
    let value = argument(context, "value");
    match value.as_number() {
        Some(n) if !n.is_negative() => Ok(Value::float(n.as_f64().sqrt())),
        Some(n) => Err(Diagnostic::runtime(
            ErrorKind::Value,
            format!("cannot take the square root of {}", n),
            span,
            context,
        )),
        None => Err(Diagnostic::runtime(
            ErrorKind::Value,
            format!("'value' must be a Number, not {}", value.type_name()),
            span,
            context,
        )),
    }
}

/// Run another script on the same globals.
fn poop_run(interpreter: &mut Interpreter, context: &Context, span: &Span) -> Result<Value, Diagnostic> {
    let argument = argument(context, "filename");
    let filename = match argument.as_str() {
        Some(name) if SCRIPT_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) => name.to_string(),
        _ => {
            return Err(Diagnostic::runtime(
                ErrorKind::Runtime,
                format!("'{}' is not a .poop or .\u{1F4A9} script", argument),
                span,
                context,
            ))
        }
    };
    log::info!("running script {}", filename);
    let source = fs::read_to_string(&filename).map_err(|e| {
        Diagnostic::runtime(
            ErrorKind::Runtime,
            format!("Failed to load script \"{}\"\n{}", filename, e),
            span,
            context,
        )
    })?;
    interpreter.run(&filename, &source).map_err(|inner| {
        Diagnostic::runtime(
            ErrorKind::Runtime,
            format!("Failed executing script \"{}\"\n{}", filename, inner.render()),
            span,
            context,
        )
    })?;
    Ok(Value::null())
}
