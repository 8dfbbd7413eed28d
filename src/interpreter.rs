use crate::ast::{BinaryOperator, ElseCase, IfCase, Node, NodeKind};
use crate::builtins;
use crate::callable::{BuiltIn, Procedure};
use crate::context::Context;
use crate::environment::Scope;
use crate::error::{Diagnostic, ErrorKind};
use crate::parser::parse;
use crate::scanner::scan_tokens;
use crate::value::{Number, Value, ValueKind};
use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

/// Owns the global scope and the console every run on it shares.
pub struct Interpreter {
    globals: Scope,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::new()
    }
}

impl Interpreter {
    /// An interpreter wired to stdin and stdout.
    pub fn new() -> Interpreter {
        Interpreter::with_io(Box::new(BufReader::new(io::stdin())), Box::new(io::stdout()))
    }

    pub fn with_io(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Interpreter {
        let mut interpreter = Interpreter {
            globals: Scope::new(),
            input,
            output,
        };
        interpreter.reset();
        interpreter
    }

    /// Drop every global binding and reinstall the built-ins.
    pub fn reset(&mut self) {
        self.globals = Scope::new();
        builtins::install(&self.globals);
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    pub fn register(&mut self, builtin: BuiltIn) {
        let name = builtin.name.clone();
        self.globals
            .set(&name, Value::new(ValueKind::BuiltIn(Rc::new(builtin))));
    }

    /// Lex, parse and evaluate `source` against the globals. On success the
    /// value is the list of each top-level statement's value.
    pub fn run(&mut self, file: &str, source: &str) -> Result<Value, Diagnostic> {
        let tokens = scan_tokens(file, source)?;
        let program = parse(&tokens)?;
        let context = Context::root(self.globals.clone());
        log::debug!("evaluating {}", file);
        self.evaluate(&program, &context)
    }

    /// Next input line without its terminator, or `None` at end of input.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    pub fn output(&mut self) -> &mut dyn Write {
        self.output.as_mut()
    }

    pub fn evaluate(&mut self, node: &Node, context: &Context) -> Result<Value, Diagnostic> {
        let value = match &node.kind {
            NodeKind::Number(n) => Value::number(*n),
            NodeKind::String(s) => Value::string(s.clone()),
            NodeKind::List(elements) => Value::list(self.evaluate_all(elements, context)?),
            NodeKind::VarAccess(name) => match context.scope.get(name) {
                Some(value) => value,
                None => {
                    return Err(Diagnostic::runtime(
                        ErrorKind::NotDefined,
                        format!("'{}' is not defined", name),
                        &node.span,
                        context,
                    ))
                }
            },
            NodeKind::VarAssign { name, value } => {
                let value = self.evaluate(value, context)?;
                context.scope.set(name, value.clone());
                value
            }
            NodeKind::BinaryOp {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left, context)?;
                let right = self.evaluate(right, context)?;
                left.binary(*operator, &right)?
            }
            NodeKind::UnaryOp { operator, operand } => {
                self.evaluate(operand, context)?.unary(*operator)?
            }
            NodeKind::If { cases, else_case } => {
                self.evaluate_if(cases, else_case.as_ref(), context)?
            }
            NodeKind::For {
                var_name,
                start,
                end,
                step,
                body,
                suppress_result,
            } => {
                let start = self.loop_bound(start, "start", context)?;
                let end = self.loop_bound(end, "end", context)?;
                let step = match step {
                    Some(step) => {
                        let n = self.loop_bound(step, "step", context)?;
                        if n.is_zero() {
                            return Err(Diagnostic::runtime(
                                ErrorKind::Runtime,
                                "loop step must not be zero",
                                &step.span,
                                context,
                            ));
                        }
                        n
                    }
                    None => Number::Int(1),
                };
                let values = self.evaluate_for(var_name, start, end, step, body, context)?;
                if *suppress_result {
                    Value::null()
                } else {
                    Value::list(values)
                }
            }
            NodeKind::ProcDef(definition) => {
                let procedure = Procedure::new(Rc::clone(definition), context.clone());
                let value = Value::new(ValueKind::Procedure(Rc::new(procedure)))
                    .stamped(&node.span, context);
                if let Some(name) = &definition.name {
                    context.scope.set(name, value.clone());
                }
                value
            }
            NodeKind::Call { callee, arguments } => {
                let target = self.evaluate(callee, context)?;
                let arguments = self.evaluate_all(arguments, context)?;
                match &target.kind {
                    ValueKind::Procedure(procedure) => {
                        procedure.call(self, arguments, &node.span, context)?
                    }
                    ValueKind::BuiltIn(builtin) => {
                        builtin.call(self, arguments, &node.span, context)?
                    }
                    _ => {
                        return Err(Diagnostic::runtime(
                            ErrorKind::IllegalOperation,
                            format!("{} is not callable", target.type_name()),
                            &callee.span,
                            context,
                        ))
                    }
                }
            }
            NodeKind::Block(statements) => Value::list(self.evaluate_all(statements, context)?),
        };
        Ok(value.stamped(&node.span, context))
    }

    fn evaluate_all(&mut self, nodes: &[Node], context: &Context) -> Result<Vec<Value>, Diagnostic> {
        let mut values = Vec::with_capacity(nodes.len());
        for node in nodes {
            values.push(self.evaluate(node, context)?);
        }
        Ok(values)
    }

    fn evaluate_if(
        &mut self,
        cases: &[IfCase],
        else_case: Option<&ElseCase>,
        context: &Context,
    ) -> Result<Value, Diagnostic> {
        for case in cases {
            if self.evaluate(&case.condition, context)?.is_true() {
                let value = self.evaluate(&case.body, context)?;
                return Ok(if case.suppress_result {
                    Value::null()
                } else {
                    value
                });
            }
        }
        match else_case {
            Some(else_case) => {
                let value = self.evaluate(&else_case.body, context)?;
                Ok(if else_case.suppress_result {
                    Value::null()
                } else {
                    value
                })
            }
            None => Ok(Value::null()),
        }
    }

    // The step's sign picks the direction; both bounds are inclusive.
    fn evaluate_for(
        &mut self,
        var_name: &str,
        start: Number,
        end: Number,
        step: Number,
        body: &Node,
        context: &Context,
    ) -> Result<Vec<Value>, Diagnostic> {
        let condition = if step.is_negative() {
            BinaryOperator::GreaterEqual
        } else {
            BinaryOperator::LessEqual
        };
        let mut values = Vec::new();
        let mut i = start;
        while i.compare(condition, end).unwrap_or(false) {
            context
                .scope
                .set(var_name, Value::number(i).stamped(&body.span, context));
            values.push(self.evaluate(body, context)?);
            i = i.add(step);
        }
        Ok(values)
    }

    fn loop_bound(&mut self, node: &Node, what: &str, context: &Context) -> Result<Number, Diagnostic> {
        let value = self.evaluate(node, context)?;
        value.as_number().ok_or_else(|| {
            Diagnostic::runtime(
                ErrorKind::IllegalOperation,
                format!("loop {} must be a Number, not {}", what, value.type_name()),
                &node.span,
                context,
            )
        })
    }
}
