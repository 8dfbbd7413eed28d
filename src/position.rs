use std::fmt;
use std::rc::Rc;

/// A location in a named source text.
///
/// `index` is a byte offset into `text`; `line` and `column` are 0-based and
/// only rendered 1-based. Cloning is cheap, clones are the span endpoints.
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    pub index: usize,
    pub line: usize,
    pub column: usize,
    pub file: Rc<str>,
    pub text: Rc<str>,
}

impl Position {
    pub fn new(file: &str, text: &str) -> Position {
        Position {
            index: 0,
            line: 0,
            column: 0,
            file: Rc::from(file),
            text: Rc::from(text),
        }
    }

    /// Step past `current`, the character at `index`.
    pub fn advance(&mut self, current: char) {
        self.index += current.len_utf8();
        if current == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file
    }

    /// 1-based line number, as shown to users.
    pub fn line_number(&self) -> usize {
        self.line + 1
    }
}

impl Default for Position {
    fn default() -> Position {
        Position::new("<unknown>", "")
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}@{}",
            self.file, self.line, self.column, self.index
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Span {
        Span { start, end }
    }

    /// The source text this span covers.
    pub fn text(&self) -> &str {
        self.start
            .text
            .get(self.start.index..self.end.index)
            .unwrap_or("")
    }

    /// A span running from the start of `self` to the end of `other`.
    pub fn to(&self, other: &Span) -> Span {
        Span::new(self.start.clone(), other.end.clone())
    }
}
