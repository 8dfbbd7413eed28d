use crate::ast::ProcDef;
use crate::context::Context;
use crate::environment::Scope;
use crate::error::{Diagnostic, ErrorKind};
use crate::interpreter::Interpreter;
use crate::position::Span;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// A user-defined procedure, closed over the context it was defined in.
#[derive(Clone)]
pub struct Procedure {
    pub definition: Rc<ProcDef>,
    pub context: Context,
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Procedure {}>", self.name())
    }
}

impl Procedure {
    pub const ANONYMOUS: &'static str = "<anonymous>";

    pub fn new(definition: Rc<ProcDef>, context: Context) -> Procedure {
        Procedure {
            definition,
            context,
        }
    }

    pub fn name(&self) -> &str {
        self.definition
            .name
            .as_deref()
            .unwrap_or(Procedure::ANONYMOUS)
    }

    pub fn arity(&self) -> usize {
        self.definition.params.len()
    }

    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        call_site: &Span,
        caller: &Context,
    ) -> Result<Value, Diagnostic> {
        check_arity(self.name(), self.arity(), &arguments, call_site, caller)?;
        log::trace!("calling {} at depth {}", self.name(), caller.depth());
        let context = caller.enter(self.name(), call_site, Scope::child(&self.context.scope));
        bind(&self.definition.params, arguments, &context);
        let value = interpreter.evaluate(&self.definition.body, &context)?;
        if self.definition.block_form {
            Ok(Value::null())
        } else {
            Ok(value)
        }
    }
}

/// Host code behind a built-in. Arguments are bound by parameter name in
/// `context.scope`; the span is the call site.
pub type NativeHandler = fn(&mut Interpreter, &Context, &Span) -> Result<Value, Diagnostic>;

#[derive(Clone)]
pub struct BuiltIn {
    pub name: String,
    pub params: Vec<String>,
    pub handler: NativeHandler,
}

impl fmt::Debug for BuiltIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Built-in {}>", self.name)
    }
}

impl BuiltIn {
    pub fn new(name: &str, params: &[&str], handler: NativeHandler) -> BuiltIn {
        BuiltIn {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            handler,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    // Built-ins see the caller's scope, not the one they were registered in.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        call_site: &Span,
        caller: &Context,
    ) -> Result<Value, Diagnostic> {
        check_arity(&self.name, self.arity(), &arguments, call_site, caller)?;
        log::trace!("calling built-in {}", self.name);
        let context = caller.enter(&self.name, call_site, Scope::child(&caller.scope));
        bind(&self.params, arguments, &context);
        (self.handler)(interpreter, &context, call_site)
    }
}

fn check_arity(
    name: &str,
    arity: usize,
    arguments: &[Value],
    call_site: &Span,
    caller: &Context,
) -> Result<(), Diagnostic> {
    let message = if arguments.len() > arity {
        format!(
            "{} too many args passed into '{}'",
            arguments.len() - arity,
            name
        )
    } else if arguments.len() < arity {
        format!(
            "{} too few args passed into '{}'",
            arity - arguments.len(),
            name
        )
    } else {
        return Ok(());
    };
    Err(Diagnostic::runtime(ErrorKind::Runtime, message, call_site, caller))
}

fn bind(params: &[String], arguments: Vec<Value>, context: &Context) {
    for (param, mut argument) in params.iter().zip(arguments) {
        argument.set_context(context);
        context.scope.set(param, argument);
    }
}
