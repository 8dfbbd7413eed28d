use crate::environment::Scope;
use crate::position::{Position, Span};
use crate::shared_list::SharedList;

/// A call-stack entry: who is running, and where its caller called it from.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub name: String,
    pub entry: Option<Position>,
}

impl Frame {
    pub fn new(name: &str, entry: Option<Position>) -> Frame {
        Frame {
            name: name.to_string(),
            entry,
        }
    }
}

/// Everything an evaluation step needs to know about where it runs.
///
/// `scope` resolves names; `frames` only feeds tracebacks. A procedure call
/// takes its scope from the definition site but its frames from the caller.
#[derive(Debug, Clone)]
pub struct Context {
    pub scope: Scope,
    pub frames: SharedList<Frame>,
}

impl Context {
    pub const PROGRAM: &'static str = "<program>";

    pub fn root(scope: Scope) -> Context {
        let mut frames = SharedList::new();
        frames.push(Frame::new(Context::PROGRAM, None));
        Context { scope, frames }
    }

    /// The context a callee runs in.
    pub fn enter(&self, name: &str, call_site: &Span, scope: Scope) -> Context {
        Context {
            scope,
            frames: self
                .frames
                .pushed(Frame::new(name, Some(call_site.start.clone()))),
        }
    }

    pub fn display_name(&self) -> &str {
        self.frames
            .peek()
            .map(|frame| frame.name.as_str())
            .unwrap_or(Context::PROGRAM)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
