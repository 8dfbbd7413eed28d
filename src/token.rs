use crate::position::{Position, Span};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Keyword {
    #[strum(serialize = "BUCKET")]
    Bucket,
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
    #[strum(serialize = "NOT")]
    Not,
    #[strum(serialize = "XOR")]
    Xor,
    #[strum(serialize = "IF")]
    If,
    #[strum(serialize = "THEN")]
    Then,
    #[strum(serialize = "ALTER")]
    Alter,
    #[strum(serialize = "ELSE")]
    Else,
    #[strum(serialize = "LOOP")]
    Loop,
    #[strum(serialize = "TILL")]
    Till,
    #[strum(serialize = "STEP")]
    Step,
    #[strum(serialize = "DO")]
    Do,
    #[strum(serialize = "PROC")]
    Proc,
    #[strum(serialize = "END")]
    End,
}

impl Keyword {
    /// Reserved logic keywords the parser does not implement yet.
    pub fn is_work_in_progress(self) -> bool {
        match self {
            Keyword::And | Keyword::Or | Keyword::Xor => true,
            _ => false,
        }
    }
}

#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen, RightParen, LeftBrace, RightBrace,
    Comma, Colon, Minus, Plus, Slash, Star, Caret,

    // One or two character tokens.
    BangEqual,
    Equal, EqualEqual,
    Greater, GreaterEqual,
    Less, LessEqual,

    // Literals.
    Identifier(String), String(String), Int(i64), Float(f64),

    Keyword(Keyword),

    // Produced by both ';' and '\n'.
    Newline,
    EOF
}

#[derive(Debug, Clone)]
pub struct Token {
    pub tokentype: TokenType,
    pub start: Position,
    pub end: Position,
}

impl Token {
    pub fn new(tokentype: TokenType, start: Position, end: Position) -> Token {
        Token {
            tokentype,
            start,
            end,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.start.clone(), self.end.clone())
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.tokentype == TokenType::Keyword(keyword)
    }
}
