use crate::ast::{BinaryOperator, UnaryOperator};
use crate::callable::{BuiltIn, Procedure};
use crate::context::{Context, Frame};
use crate::error::{Diagnostic, ErrorKind};
use crate::position::Span;
use crate::shared_list::SharedList;
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::rc::Rc;

/// Longest string, in bytes, that `*` may build.
pub const MAX_STRING_LEN: usize = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn from_bool(b: bool) -> Number {
        Number::Int(if b { 1 } else { 0 })
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(x) => x as f64,
            Number::Float(x) => x,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(x) => x == 0,
            Number::Float(x) => x == 0.0,
        }
    }

    pub fn is_negative(self) -> bool {
        match self {
            Number::Int(x) => x < 0,
            Number::Float(x) => x < 0.0,
        }
    }

    // Integer results overflow into floats rather than wrapping.
    pub fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_add(b)
                .map(Number::Int)
                .unwrap_or(Number::Float(a as f64 + b as f64)),
            _ => Number::Float(self.as_f64() + other.as_f64()),
        }
    }

    pub fn sub(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_sub(b)
                .map(Number::Int)
                .unwrap_or(Number::Float(a as f64 - b as f64)),
            _ => Number::Float(self.as_f64() - other.as_f64()),
        }
    }

    pub fn mul(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_mul(b)
                .map(Number::Int)
                .unwrap_or(Number::Float(a as f64 * b as f64)),
            _ => Number::Float(self.as_f64() * other.as_f64()),
        }
    }

    /// True division; `None` when dividing by zero.
    pub fn div(self, other: Number) -> Option<Number> {
        if other.is_zero() {
            None
        } else {
            Some(Number::Float(self.as_f64() / other.as_f64()))
        }
    }

    pub fn pow(self, other: Number) -> Number {
        if let (Number::Int(base), Number::Int(exponent)) = (self, other) {
            if let Some(result) = u32::try_from(exponent)
                .ok()
                .and_then(|exponent| base.checked_pow(exponent))
            {
                return Number::Int(result);
            }
        }
        Number::Float(self.as_f64().powf(other.as_f64()))
    }

    pub fn neg(self) -> Number {
        match self {
            Number::Int(x) => x
                .checked_neg()
                .map(Number::Int)
                .unwrap_or(Number::Float(-(x as f64))),
            Number::Float(x) => Number::Float(-x),
        }
    }

    fn ordering(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }

    /// Evaluate a comparison operator; `None` for arithmetic operators.
    pub fn compare(self, operator: BinaryOperator, other: Number) -> Option<bool> {
        let ordering = self.ordering(other);
        let result = match operator {
            BinaryOperator::Equal => ordering == Some(Ordering::Equal),
            BinaryOperator::NotEqual => ordering != Some(Ordering::Equal),
            BinaryOperator::Less => ordering == Some(Ordering::Less),
            BinaryOperator::LessEqual => {
                matches!(ordering, Some(Ordering::Less) | Some(Ordering::Equal))
            }
            BinaryOperator::Greater => ordering == Some(Ordering::Greater),
            BinaryOperator::GreaterEqual => {
                matches!(ordering, Some(Ordering::Greater) | Some(Ordering::Equal))
            }
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Power => return None,
        };
        Some(result)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(x) => write!(f, "{}", x),
            // Whole floats keep their ".0" so they read back as floats.
            Number::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{:.1}", x)
            }
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    /// What suppressed constructs evaluate to.
    Null,
    Number(Number),
    String(String),
    List(Rc<Vec<Value>>),
    Procedure(Rc<Procedure>),
    BuiltIn(Rc<BuiltIn>),
}

/// A runtime value, stamped with where it was produced.
///
/// Only the frames of the producing context are kept, never its scope, since
/// values are stored in symbol tables.
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub span: Option<Span>,
    pub frames: Option<SharedList<Frame>>,
}

impl Value {
    pub fn new(kind: ValueKind) -> Value {
        Value {
            kind,
            span: None,
            frames: None,
        }
    }

    pub fn null() -> Value {
        Value::new(ValueKind::Null)
    }

    pub fn number(n: Number) -> Value {
        Value::new(ValueKind::Number(n))
    }

    pub fn int(n: i64) -> Value {
        Value::number(Number::Int(n))
    }

    pub fn float(n: f64) -> Value {
        Value::number(Number::Float(n))
    }

    pub fn boolean(b: bool) -> Value {
        Value::number(Number::from_bool(b))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::new(ValueKind::String(s.into()))
    }

    pub fn list(elements: Vec<Value>) -> Value {
        Value::new(ValueKind::List(Rc::new(elements)))
    }

    pub fn set_span(&mut self, span: &Span) {
        self.span = Some(span.clone());
    }

    pub fn set_context(&mut self, context: &Context) {
        self.frames = Some(context.frames.clone());
    }

    /// Stamp with the span and context that produced this value.
    pub fn stamped(mut self, span: &Span, context: &Context) -> Value {
        self.set_span(span);
        self.set_context(context);
        self
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ValueKind::Null => "Null",
            ValueKind::Number(_) => "Number",
            ValueKind::String(_) => "String",
            ValueKind::List(_) => "List",
            ValueKind::Procedure(_) => "Procedure",
            ValueKind::BuiltIn(_) => "BuiltIn",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn is_true(&self) -> bool {
        match &self.kind {
            ValueKind::Null => false,
            ValueKind::Number(n) => !n.is_zero(),
            ValueKind::String(s) => !s.is_empty(),
            ValueKind::List(elements) => !elements.is_empty(),
            ValueKind::Procedure(_) | ValueKind::BuiltIn(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self.kind {
            ValueKind::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::List(elements) => Some(elements.as_slice()),
            _ => None,
        }
    }

    /// `self <operator> other`. The result is unstamped.
    pub fn binary(&self, operator: BinaryOperator, other: &Value) -> Result<Value, Diagnostic> {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(l), ValueKind::Number(r)) => self.arithmetic(*l, operator, *r, other),
            (ValueKind::String(l), ValueKind::String(r)) if operator == BinaryOperator::Add => {
                Ok(Value::string(format!("{}{}", l, r)))
            }
            (ValueKind::String(l), ValueKind::Number(Number::Int(times)))
                if operator == BinaryOperator::Multiply =>
            {
                self.repeated(l, *times, other)
            }
            (ValueKind::List(elements), _) if operator == BinaryOperator::Add => {
                let mut appended = Vec::clone(elements);
                appended.push(other.clone());
                Ok(Value::list(appended))
            }
            (ValueKind::List(elements), ValueKind::Number(Number::Int(index)))
                if operator == BinaryOperator::Subtract =>
            {
                self.removed(elements, *index, other)
            }
            _ => Err(self.illegal_operation(operator, other)),
        }
    }

    pub fn unary(&self, operator: UnaryOperator) -> Result<Value, Diagnostic> {
        match (operator, &self.kind) {
            (UnaryOperator::Identity, ValueKind::Number(n)) => Ok(Value::number(*n)),
            (UnaryOperator::Negate, ValueKind::Number(n)) => Ok(Value::number(n.neg())),
            (UnaryOperator::Not, ValueKind::Number(n)) => Ok(Value::boolean(n.is_zero())),
            _ => Err(self.failure(
                ErrorKind::IllegalOperation,
                format!("unary '{}' is not supported for {}", operator, self.type_name()),
                self,
            )),
        }
    }

    fn arithmetic(
        &self,
        l: Number,
        operator: BinaryOperator,
        r: Number,
        other: &Value,
    ) -> Result<Value, Diagnostic> {
        let result = match operator {
            BinaryOperator::Add => l.add(r),
            BinaryOperator::Subtract => l.sub(r),
            BinaryOperator::Multiply => l.mul(r),
            BinaryOperator::Divide => match l.div(r) {
                Some(quotient) => quotient,
                None => return Err(self.failure(ErrorKind::Runtime, "Division by Zero", other)),
            },
            BinaryOperator::Power => l.pow(r),
            comparison => match l.compare(comparison, r) {
                Some(b) => Number::from_bool(b),
                None => return Err(self.illegal_operation(operator, other)),
            },
        };
        Ok(Value::number(result))
    }

    fn repeated(&self, text: &str, times: i64, other: &Value) -> Result<Value, Diagnostic> {
        let times = usize::try_from(times.max(0)).unwrap_or(usize::MAX);
        match text.len().checked_mul(times) {
            Some(len) if len <= MAX_STRING_LEN => Ok(Value::string(text.repeat(times))),
            _ => Err(self.failure(ErrorKind::Runtime, "string too large", other)),
        }
    }

    // Copy-on-write: the receiver keeps all of its elements.
    fn removed(&self, elements: &[Value], index: i64, other: &Value) -> Result<Value, Diagnostic> {
        let len = elements.len() as i64;
        let position = if index < 0 { len + index } else { index };
        if position < 0 || position >= len {
            return Err(self.failure(ErrorKind::Runtime, "index out of bounds", other));
        }
        let mut remaining = elements.to_vec();
        remaining.remove(position as usize);
        Ok(Value::list(remaining))
    }

    fn illegal_operation(&self, operator: BinaryOperator, other: &Value) -> Diagnostic {
        let span = match (&self.span, &other.span) {
            (Some(left), Some(right)) => left.to(right),
            (Some(left), None) => left.clone(),
            (None, right) => right.clone().unwrap_or_default(),
        };
        let diagnostic = Diagnostic::at(
            ErrorKind::IllegalOperation,
            format!(
                "'{}' is not supported between {} and {}",
                operator,
                self.type_name(),
                other.type_name()
            ),
            &span,
        );
        self.with_frames(diagnostic)
    }

    /// A diagnostic pointing at `at`, traced through this value's context.
    fn failure(&self, kind: ErrorKind, message: impl Into<String>, at: &Value) -> Diagnostic {
        let span = at.span.clone().unwrap_or_default();
        self.with_frames(Diagnostic::at(kind, message, &span))
    }

    fn with_frames(&self, diagnostic: Diagnostic) -> Diagnostic {
        match &self.frames {
            Some(frames) => diagnostic.with_frames(frames.clone()),
            None => diagnostic,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Null => write!(f, "NULL"),
            ValueKind::Number(n) => write!(f, "{}", n),
            ValueKind::String(s) => write!(f, "{}", s),
            ValueKind::List(elements) => {
                write!(f, "{{")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "}}")
            }
            ValueKind::Procedure(procedure) => write!(f, "<Procedure {}>", procedure.name()),
            ValueKind::BuiltIn(builtin) => write!(f, "<Built-in {}>", builtin.name),
        }
    }
}

#[cfg(test)]
mod value_tests {
    use super::{Number, Value};
    use crate::ast::{BinaryOperator, UnaryOperator};
    use crate::error::{ErrorClass, ErrorKind};

    fn apply(l: Value, op: BinaryOperator, r: Value) -> String {
        match l.binary(op, &r) {
            Ok(v) => v.to_string(),
            Err(e) => format!("error: {}", e.kind),
        }
    }

    #[test]
    fn number_arithmetic_matches_host() {
        let pairs = [(7i64, 2i64), (-3, 5), (0, 9), (12, -4)];
        for &(a, b) in pairs.iter() {
            let l = Value::int(a);
            let r = Value::int(b);
            assert_eq!(apply(l.clone(), BinaryOperator::Add, r.clone()), (a + b).to_string());
            assert_eq!(apply(l.clone(), BinaryOperator::Subtract, r.clone()), (a - b).to_string());
            assert_eq!(apply(l.clone(), BinaryOperator::Multiply, r.clone()), (a * b).to_string());
            let quotient = Number::Float(a as f64 / b as f64).to_string();
            assert_eq!(apply(l, BinaryOperator::Divide, r), quotient);
        }
        assert_eq!(apply(Value::float(1.5), BinaryOperator::Add, Value::int(1)), "2.5");
        assert_eq!(apply(Value::int(2), BinaryOperator::Power, Value::int(10)), "1024");
        assert_eq!(apply(Value::int(2), BinaryOperator::Power, Value::int(-1)), "0.5");
        assert_eq!(apply(Value::float(2.0), BinaryOperator::Power, Value::int(2)), "4.0");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let err = Value::int(1).binary(BinaryOperator::Divide, &Value::int(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert_eq!(err.message, "Division by Zero");
        let err = Value::float(1.0).binary(BinaryOperator::Divide, &Value::float(0.0)).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Runtime);
    }

    #[test]
    fn integer_overflow_promotes_to_float() {
        let sum = Number::Int(i64::MAX).add(Number::Int(1));
        assert_eq!(sum, Number::Float(i64::MAX as f64 + 1.0));
        assert_eq!(Number::Int(i64::MIN).neg(), Number::Float(9223372036854775808.0));
    }

    #[test]
    fn comparisons_yield_one_or_zero() {
        assert_eq!(apply(Value::int(1), BinaryOperator::Less, Value::int(2)), "1");
        assert_eq!(apply(Value::int(2), BinaryOperator::LessEqual, Value::float(1.5)), "0");
        assert_eq!(apply(Value::int(2), BinaryOperator::Equal, Value::float(2.0)), "1");
        assert_eq!(apply(Value::int(2), BinaryOperator::NotEqual, Value::int(2)), "0");
        assert_eq!(
            apply(Value::string("a"), BinaryOperator::Equal, Value::string("a")),
            "error: Illegal Operation"
        );
    }

    #[test]
    fn strings() {
        assert_eq!(apply(Value::string("ab"), BinaryOperator::Add, Value::string("cd")), "abcd");
        assert_eq!(apply(Value::string("ab"), BinaryOperator::Multiply, Value::int(3)), "ababab");
        assert_eq!(apply(Value::string("ab"), BinaryOperator::Multiply, Value::int(-2)), "");
        let err = Value::string("ab")
            .binary(BinaryOperator::Multiply, &Value::int(i64::MAX))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert_eq!(err.message, "string too large");
        assert_eq!(
            apply(Value::string("ab"), BinaryOperator::Add, Value::int(1)),
            "error: Illegal Operation"
        );
        assert_eq!(
            apply(Value::string("ab"), BinaryOperator::Multiply, Value::float(2.0)),
            "error: Illegal Operation"
        );
    }

    #[test]
    fn lists_are_copy_on_write() {
        let original = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        let appended = original.binary(BinaryOperator::Add, &Value::int(4)).unwrap();
        assert_eq!(appended.to_string(), "{1, 2, 3, 4}");
        assert_eq!(original.to_string(), "{1, 2, 3}");

        let removed = original.binary(BinaryOperator::Subtract, &Value::int(1)).unwrap();
        assert_eq!(removed.to_string(), "{1, 3}");
        assert_eq!(original.to_string(), "{1, 2, 3}");

        let last = original.binary(BinaryOperator::Subtract, &Value::int(-1)).unwrap();
        assert_eq!(last.to_string(), "{1, 2}");

        let err = original.binary(BinaryOperator::Subtract, &Value::int(9)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert_eq!(err.message, "index out of bounds");
        assert_eq!(
            apply(original, BinaryOperator::Multiply, Value::int(2)),
            "error: Illegal Operation"
        );
    }

    #[test]
    fn unary_operators() {
        assert_eq!(Value::int(4).unary(UnaryOperator::Negate).unwrap().to_string(), "-4");
        assert_eq!(Value::float(0.5).unary(UnaryOperator::Identity).unwrap().to_string(), "0.5");
        assert_eq!(Value::int(0).unary(UnaryOperator::Not).unwrap().to_string(), "1");
        assert_eq!(Value::int(3).unary(UnaryOperator::Not).unwrap().to_string(), "0");
        let err = Value::string("x").unary(UnaryOperator::Negate).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalOperation);
    }

    #[test]
    fn truthiness_and_display() {
        assert!(Value::int(2).is_true());
        assert!(!Value::float(0.0).is_true());
        assert!(Value::string("x").is_true());
        assert!(!Value::string("").is_true());
        assert!(!Value::list(vec![]).is_true());
        assert!(!Value::null().is_true());
        assert_eq!(Value::float(2.0).to_string(), "2.0");
        assert_eq!(Value::null().to_string(), "NULL");
        assert_eq!(
            Value::list(vec![Value::string("a"), Value::list(vec![])]).to_string(),
            "{a, {}}"
        );
    }
}
