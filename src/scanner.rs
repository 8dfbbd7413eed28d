use crate::error::{Diagnostic, ErrorKind};
use crate::position::{Position, Span};
use crate::token::{Keyword, Token, TokenType};
use phf::phf_map;
use std::iter::Peekable;
use std::str::Chars;

// Note: the character at `position` is always self.iter.peek()
struct Scanner<'a> {
    iter: Peekable<Chars<'a>>,
    start: Position,
    position: Position,
}

/// Lex `source`, stopping at the first character that cannot start a token.
pub fn scan_tokens(file: &str, source: &str) -> Result<Vec<Token>, Diagnostic> {
    let origin = Position::new(file, source);
    let mut scanner = Scanner {
        iter: source.chars().peekable(),
        start: origin.clone(),
        position: origin,
    };
    let mut tokens: Vec<Token> = Vec::new();

    while scanner.iter.peek().is_some() {
        scanner.start = scanner.position.clone();
        if let Some(token) = scanner.scan_token()? {
            tokens.push(token);
        }
    }
    scanner.start = scanner.position.clone();
    tokens.push(scanner.token(TokenType::EOF));
    log::debug!("scanned {} tokens from {}", tokens.len(), file);
    Ok(tokens)
}

impl<'a> Scanner<'a> {
    fn scan_token(&mut self) -> Result<Option<Token>, Diagnostic> {
        let c = match self.advance() {
            Some(c) => c,
            None => return Ok(None),
        };
        match c {
            '(' => Ok(Some(self.token(TokenType::LeftParen))),
            ')' => Ok(Some(self.token(TokenType::RightParen))),
            '{' => Ok(Some(self.token(TokenType::LeftBrace))),
            '}' => Ok(Some(self.token(TokenType::RightBrace))),
            ',' => Ok(Some(self.token(TokenType::Comma))),
            ':' => Ok(Some(self.token(TokenType::Colon))),
            '-' => Ok(Some(self.token(TokenType::Minus))),
            '+' => Ok(Some(self.token(TokenType::Plus))),
            '*' => Ok(Some(self.token(TokenType::Star))),
            '/' => Ok(Some(self.token(TokenType::Slash))),
            '^' => Ok(Some(self.token(TokenType::Caret))),
            ';' | '\n' => Ok(Some(self.token(TokenType::Newline))),
            '!' => {
                if self.next_if('=') {
                    Ok(Some(self.token(TokenType::BangEqual)))
                } else {
                    Err(self.error(ErrorKind::ExpectedCharacter, "expected '=' after '!'"))
                }
            }
            '=' => {
                if self.next_if('=') {
                    Ok(Some(self.token(TokenType::EqualEqual)))
                } else {
                    Ok(Some(self.token(TokenType::Equal)))
                }
            }
            '<' => {
                if self.next_if('=') {
                    Ok(Some(self.token(TokenType::LessEqual)))
                } else {
                    Ok(Some(self.token(TokenType::Less)))
                }
            }
            '>' => {
                if self.next_if('=') {
                    Ok(Some(self.token(TokenType::GreaterEqual)))
                } else {
                    Ok(Some(self.token(TokenType::Greater)))
                }
            }
            '@' => {
                // The line terminator is left for the next token.
                while let Some(c) = self.iter.peek() {
                    if *c == '\n' {
                        break;
                    }
                    self.advance();
                }
                Ok(None)
            }
            ' ' | '\r' | '\t' => Ok(None),
            '"' => Ok(Some(self.string()?)),
            '0'..='9' => Ok(Some(self.number()?)),
            'a'..='z' | 'A'..='Z' => Ok(Some(self.identifier())),
            other => Err(self.error(ErrorKind::IllegalCharacter, format!("'{}'", other))),
        }
    }
    fn token(&self, token_type: TokenType) -> Token {
        Token::new(token_type, self.start.clone(), self.position.clone())
    }
    fn lexeme(&self) -> String {
        Span::new(self.start.clone(), self.position.clone())
            .text()
            .to_string()
    }
    fn error(&self, kind: ErrorKind, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(kind, message, self.start.clone(), self.position.clone())
    }
    fn next_if(&mut self, expected: char) -> bool {
        if self.iter.peek() == Some(&expected) {
            self.advance();
            return true;
        }
        false
    }
    fn advance(&mut self) -> Option<char> {
        let c = self.iter.next()?;
        self.position.advance(c);
        Some(c)
    }
    fn string(&mut self) -> Result<Token, Diagnostic> {
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some(c) => text.push(c),
                None => {
                    return Err(self.error(
                        ErrorKind::UnterminatedString,
                        "expected '\"' before end of input",
                    ))
                }
            }
        }
        Ok(self.token(TokenType::String(text)))
    }
    fn number(&mut self) -> Result<Token, Diagnostic> {
        let mut seen_dot = false;
        while let Some(c) = self.iter.peek() {
            match c {
                '0'..='9' => {
                    self.advance();
                }
                '.' if !seen_dot => {
                    seen_dot = true;
                    self.advance();
                }
                _ => {
                    break;
                }
            }
        }

        let lexeme = self.lexeme();
        if seen_dot {
            match lexeme.parse::<f64>() {
                Ok(x) => Ok(self.token(TokenType::Float(x))),
                Err(_) => Err(self.error(
                    ErrorKind::Value,
                    format!("'{}' is not a valid float", lexeme),
                )),
            }
        } else {
            match lexeme.parse::<i64>() {
                Ok(x) => Ok(self.token(TokenType::Int(x))),
                Err(_) => Err(self.error(
                    ErrorKind::Value,
                    format!("integer literal '{}' is out of range", lexeme),
                )),
            }
        }
    }
    fn identifier(&mut self) -> Token {
        while let Some(c) = self.iter.peek() {
            match c {
                '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' => {
                    self.advance();
                }
                _ => {
                    break;
                }
            }
        }
        let lexeme = self.lexeme();
        match KEYWORDS.get(lexeme.as_str()) {
            None => self.token(TokenType::Identifier(lexeme)),
            Some(keyword) => self.token(TokenType::Keyword(*keyword)),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "BUCKET" => Keyword::Bucket,
    "AND" => Keyword::And,
    "OR" => Keyword::Or,
    "NOT" => Keyword::Not,
    "XOR" => Keyword::Xor,
    "IF" => Keyword::If,
    "THEN" => Keyword::Then,
    "ALTER" => Keyword::Alter,
    "ELSE" => Keyword::Else,
    "LOOP" => Keyword::Loop,
    "TILL" => Keyword::Till,
    "STEP" => Keyword::Step,
    "DO" => Keyword::Do,
    "PROC" => Keyword::Proc,
    "END" => Keyword::End,
};

#[cfg(test)]
mod scanner_tests {
    use crate::error::ErrorKind;
    use crate::scanner;
    use crate::token::{Keyword, TokenType};

    fn kinds(source: &str) -> Vec<TokenType> {
        scanner::scan_tokens("test", source)
            .unwrap()
            .into_iter()
            .map(|t| t.tokentype)
            .collect()
    }

    #[test]
    fn basic_scanner_test() {
        assert_eq!(
            kinds("1 + 2"),
            vec![
                TokenType::Int(1),
                TokenType::Plus,
                TokenType::Int(2),
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn number_parsing() {
        assert_eq!(kinds("3.25")[0], TokenType::Float(3.25));
        assert_eq!(kinds("7.")[0], TokenType::Float(7.0));
        for n in [0i64, 1, 42, 1_000_000, i64::MAX].iter() {
            assert_eq!(kinds(&n.to_string())[0], TokenType::Int(*n));
        }
        let err = scanner::scan_tokens("test", "9223372036854775808").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Value);
    }

    #[test]
    fn second_dot_is_illegal() {
        let err = scanner::scan_tokens("test", "1.2.3").unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalCharacter);
        assert_eq!(err.message, "'.'");
        assert_eq!(err.start.index, 3);
    }

    #[test]
    fn spans_slice_the_source() {
        let tokens = scanner::scan_tokens("test", "BUCKET name = \"hi\"").unwrap();
        let texts: Vec<String> = tokens.iter().map(|t| t.span().text().to_string()).collect();
        assert_eq!(texts, vec!["BUCKET", "name", "=", "\"hi\"", ""]);
        assert_eq!(tokens[0].tokentype, TokenType::Keyword(Keyword::Bucket));
        assert_eq!(tokens[1].tokentype, TokenType::Identifier("name".to_string()));
        assert_eq!(tokens[3].tokentype, TokenType::String("hi".to_string()));
    }

    #[test]
    fn comments_and_separators() {
        assert_eq!(
            kinds("1 @ the rest\n2;3 @ trailing"),
            vec![
                TokenType::Int(1),
                TokenType::Newline,
                TokenType::Int(2),
                TokenType::Newline,
                TokenType::Int(3),
                TokenType::EOF
            ]
        );
        assert_eq!(kinds("\r\n")[0], TokenType::Newline);
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("== != <= >= < > = ^"),
            vec![
                TokenType::EqualEqual,
                TokenType::BangEqual,
                TokenType::LessEqual,
                TokenType::GreaterEqual,
                TokenType::Less,
                TokenType::Greater,
                TokenType::Equal,
                TokenType::Caret,
                TokenType::EOF
            ]
        );
        let err = scanner::scan_tokens("test", "1 ! 2").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExpectedCharacter);
        assert_eq!(err.message, "expected '=' after '!'");
    }

    #[test]
    fn lexical_failures() {
        let err = scanner::scan_tokens("test", "\"open").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
        assert_eq!(err.start.index, 0);
        assert_eq!(err.end.index, 5);

        let err = scanner::scan_tokens("test", "x = 1\n$").unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalCharacter);
        assert_eq!(err.start.line_number(), 2);
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(kinds("PROC")[0], TokenType::Keyword(Keyword::Proc));
        assert_eq!(kinds("proc")[0], TokenType::Identifier("proc".to_string()));
        assert_eq!(kinds("x_1")[0], TokenType::Identifier("x_1".to_string()));
    }
}
