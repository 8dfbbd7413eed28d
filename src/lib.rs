pub mod ast;
pub mod builtins;
pub mod callable;
pub mod context;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod position;
pub mod scanner;
pub mod shared_list;
pub mod token;
pub mod value;

pub use crate::error::{Diagnostic, ErrorClass, ErrorKind, Severity};
pub use crate::interpreter::Interpreter;
pub use crate::value::{Number, Value, ValueKind};
