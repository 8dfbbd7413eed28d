use crate::ast::{BinaryOperator, ElseCase, IfCase, Node, NodeKind, ProcDef, UnaryOperator};
use crate::error::{Diagnostic, ErrorKind};
use crate::position::{Position, Span};
use crate::token::{Keyword, Token, TokenType};
use crate::value::Number;
use std::rc::Rc;

const EXPECTED_EXPRESSION: &str = "Expected 'BUCKET', int, float, string, identifier, '+', '-', '(', '{', 'IF', 'LOOP', 'PROC' or 'NOT'";

macro_rules! check {
    ($self:expr, $tt:tt) => {
        if let TokenType::$tt = $self.peek().tokentype {
            true
        } else {
            false
        }
    };
}

macro_rules! advance_if {
    ($self:expr, $tt:tt) => {
        if let TokenType::$tt = $self.peek().tokentype {
            $self.advance();
            true
        } else {
            false
        }
    };
}

/// Outcome of a speculative parse.
enum Attempt<T> {
    Committed(T),
    RolledBack,
}

/// Parse a whole program into its top-level block.
pub fn parse(tokens: &[Token]) -> Result<Node, Diagnostic> {
    match tokens.last() {
        Some(token) if token.tokentype == TokenType::EOF => {}
        last => {
            let span = last.map(Token::span).unwrap_or_default();
            return Err(Diagnostic::at(
                ErrorKind::InvalidSyntax,
                "Expected end of input",
                &span,
            ));
        }
    }
    let mut parser = Parser::new(tokens);
    let program = parser.program()?;
    log::debug!("parsed program spanning {} bytes", program.span.text().len());
    Ok(program)
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    // Where the latest speculative statement was abandoned, and why.
    rollback: Option<(usize, Diagnostic)>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Parser<'a> {
        Parser {
            tokens,
            current: 0,
            rollback: None,
        }
    }
    fn program(&mut self) -> Result<Node, Diagnostic> {
        let start = self.peek().start.clone();
        self.skip_newlines();
        if self.is_at_end() {
            let span = Span::new(start, self.peek().end.clone());
            return Ok(Node::new(NodeKind::Block(Vec::new()), span));
        }
        let block = self.statements()?;
        if self.is_at_end() {
            Ok(block)
        } else {
            Err(self.stray_token())
        }
    }
    fn statements(&mut self) -> Result<Node, Diagnostic> {
        self.skip_newlines();
        let first = self.expr()?;
        let mut span = first.span.clone();
        let mut statements = vec![first];
        loop {
            if self.skip_newlines() == 0 {
                break;
            }
            match self.speculate(Parser::expr) {
                Attempt::Committed(statement) => {
                    span = span.to(&statement.span);
                    statements.push(statement);
                }
                Attempt::RolledBack => break,
            }
        }
        Ok(Node::new(NodeKind::Block(statements), span))
    }
    fn speculate<T>(
        &mut self,
        attempt: fn(&mut Parser<'a>) -> Result<T, Diagnostic>,
    ) -> Attempt<T> {
        let checkpoint = self.current;
        match attempt(self) {
            Ok(value) => Attempt::Committed(value),
            Err(diagnostic) => {
                // Only an attempt that got past its first token is worth reporting.
                if self.current > checkpoint {
                    self.rollback = Some((checkpoint, diagnostic));
                }
                self.current = checkpoint;
                Attempt::RolledBack
            }
        }
    }
    fn expr(&mut self) -> Result<Node, Diagnostic> {
        if !self.peek().is_keyword(Keyword::Bucket) {
            return self.comparison();
        }
        let start = self.advance().start.clone();
        let name = self.identifier("Expected identifier")?;
        if !advance_if!(self, Equal) {
            return Err(self.error("Expected '='"));
        }
        let value = self.expr()?;
        let span = Span::new(start, value.span.end.clone());
        Ok(Node::new(
            NodeKind::VarAssign {
                name,
                value: Box::new(value),
            },
            span,
        ))
    }
    fn comparison(&mut self) -> Result<Node, Diagnostic> {
        if self.peek().is_keyword(Keyword::Not) {
            let start = self.advance().start.clone();
            let operand = self.comparison()?;
            return Ok(unary(start, UnaryOperator::Not, operand));
        }
        self.binary_chain(Parser::arith, |tokentype: &TokenType| match tokentype {
            TokenType::EqualEqual => Some(BinaryOperator::Equal),
            TokenType::BangEqual => Some(BinaryOperator::NotEqual),
            TokenType::Less => Some(BinaryOperator::Less),
            TokenType::LessEqual => Some(BinaryOperator::LessEqual),
            TokenType::Greater => Some(BinaryOperator::Greater),
            TokenType::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        })
    }
    fn arith(&mut self) -> Result<Node, Diagnostic> {
        self.binary_chain(Parser::term, |tokentype: &TokenType| match tokentype {
            TokenType::Plus => Some(BinaryOperator::Add),
            TokenType::Minus => Some(BinaryOperator::Subtract),
            _ => None,
        })
    }
    fn term(&mut self) -> Result<Node, Diagnostic> {
        self.binary_chain(Parser::factor, |tokentype: &TokenType| match tokentype {
            TokenType::Star => Some(BinaryOperator::Multiply),
            TokenType::Slash => Some(BinaryOperator::Divide),
            _ => None,
        })
    }
    /// Left-associative `operand (operator operand)*`.
    fn binary_chain(
        &mut self,
        operand: fn(&mut Parser<'a>) -> Result<Node, Diagnostic>,
        operator: fn(&TokenType) -> Option<BinaryOperator>,
    ) -> Result<Node, Diagnostic> {
        let mut left = operand(self)?;
        while let Some(op) = operator(&self.peek().tokentype) {
            self.advance();
            let right = operand(self)?;
            left = binary(left, op, right);
        }
        Ok(left)
    }
    fn factor(&mut self) -> Result<Node, Diagnostic> {
        let operator = match self.peek().tokentype {
            TokenType::Plus => UnaryOperator::Identity,
            TokenType::Minus => UnaryOperator::Negate,
            _ => return self.power(),
        };
        let start = self.advance().start.clone();
        let operand = self.factor()?;
        Ok(unary(start, operator, operand))
    }
    fn power(&mut self) -> Result<Node, Diagnostic> {
        let mut base = self.call()?;
        while advance_if!(self, Caret) {
            let exponent = self.factor()?;
            base = binary(base, BinaryOperator::Power, exponent);
        }
        Ok(base)
    }
    fn call(&mut self) -> Result<Node, Diagnostic> {
        let mut callee = self.atom()?;
        while advance_if!(self, LeftParen) {
            let mut arguments = Vec::new();
            if !check!(self, RightParen) {
                arguments.push(self.expr()?);
                while advance_if!(self, Comma) {
                    arguments.push(self.expr()?);
                }
            }
            if !check!(self, RightParen) {
                return Err(self.error("Expected ',' or ')'"));
            }
            let end = self.advance().end.clone();
            let span = Span::new(callee.span.start.clone(), end);
            callee = Node::new(
                NodeKind::Call {
                    callee: Box::new(callee),
                    arguments,
                },
                span,
            );
        }
        Ok(callee)
    }
    fn atom(&mut self) -> Result<Node, Diagnostic> {
        let token = self.peek();
        let kind = match &token.tokentype {
            TokenType::Int(x) => NodeKind::Number(Number::Int(*x)),
            TokenType::Float(x) => NodeKind::Number(Number::Float(*x)),
            TokenType::String(x) => NodeKind::String(x.clone()),
            TokenType::Identifier(name) => NodeKind::VarAccess(name.clone()),
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expr()?;
                if !advance_if!(self, RightParen) {
                    return Err(self.error("Expected ')'"));
                }
                return Ok(expr);
            }
            TokenType::LeftBrace => return self.list(),
            TokenType::Keyword(Keyword::If) => return self.if_expr(),
            TokenType::Keyword(Keyword::Loop) => return self.loop_expr(),
            TokenType::Keyword(Keyword::Proc) => return self.proc_def(),
            _ => return Err(self.error(EXPECTED_EXPRESSION)),
        };
        self.advance();
        Ok(Node::new(kind, token.span()))
    }
    fn list(&mut self) -> Result<Node, Diagnostic> {
        let start = self.advance().start.clone();
        let mut elements = Vec::new();
        if !check!(self, RightBrace) {
            elements.push(self.expr()?);
            while advance_if!(self, Comma) {
                elements.push(self.expr()?);
            }
        }
        if !check!(self, RightBrace) {
            return Err(self.error("Expected ',' or '}'"));
        }
        let end = self.advance().end.clone();
        Ok(Node::new(NodeKind::List(elements), Span::new(start, end)))
    }
    fn if_expr(&mut self) -> Result<Node, Diagnostic> {
        let start = self.advance().start.clone();
        let mut cases = Vec::new();
        let mut else_case = None;
        loop {
            let condition = self.expr()?;
            self.keyword(Keyword::Then)?;
            if advance_if!(self, Newline) {
                let body = self.statements()?;
                cases.push(IfCase {
                    condition,
                    body,
                    suppress_result: true,
                });
                if self.advance_if_keyword(Keyword::End) {
                    break;
                } else if self.advance_if_keyword(Keyword::Alter) {
                    continue;
                } else if self.advance_if_keyword(Keyword::Else) {
                    else_case = Some(self.else_case()?);
                    break;
                }
                return Err(self.stop_error("Expected 'END', 'ALTER' or 'ELSE'"));
            }
            let body = self.expr()?;
            cases.push(IfCase {
                condition,
                body,
                suppress_result: false,
            });
            if self.advance_if_keyword(Keyword::Alter) {
                continue;
            }
            if self.advance_if_keyword(Keyword::Else) {
                else_case = Some(self.else_case()?);
            }
            break;
        }
        let span = Span::new(start, self.previous().end.clone());
        Ok(Node::new(NodeKind::If { cases, else_case }, span))
    }
    fn else_case(&mut self) -> Result<ElseCase, Diagnostic> {
        if advance_if!(self, Newline) {
            let body = self.statements()?;
            self.end_keyword()?;
            Ok(ElseCase {
                body: Box::new(body),
                suppress_result: true,
            })
        } else {
            Ok(ElseCase {
                body: Box::new(self.expr()?),
                suppress_result: false,
            })
        }
    }
    fn loop_expr(&mut self) -> Result<Node, Diagnostic> {
        let start = self.advance().start.clone();
        let var_name = self.identifier("Expected identifier")?;
        if !advance_if!(self, Equal) {
            return Err(self.error("Expected '='"));
        }
        let from = self.expr()?;
        self.keyword(Keyword::Till)?;
        let to = self.expr()?;
        let step = if self.advance_if_keyword(Keyword::Step) {
            Some(Box::new(self.expr()?))
        } else {
            None
        };
        self.keyword(Keyword::Do)?;
        let (body, suppress_result) = if advance_if!(self, Newline) {
            let body = self.statements()?;
            self.end_keyword()?;
            (body, true)
        } else {
            (self.expr()?, false)
        };
        let span = Span::new(start, self.previous().end.clone());
        Ok(Node::new(
            NodeKind::For {
                var_name,
                start: Box::new(from),
                end: Box::new(to),
                step,
                body: Box::new(body),
                suppress_result,
            },
            span,
        ))
    }
    fn proc_def(&mut self) -> Result<Node, Diagnostic> {
        let start = self.advance().start.clone();
        let name = match &self.peek().tokentype {
            TokenType::Identifier(name) => {
                self.advance();
                Some(name.clone())
            }
            _ => None,
        };
        if !advance_if!(self, LeftParen) {
            return Err(self.error(if name.is_some() {
                "Expected '('"
            } else {
                "Expected identifier or '('"
            }));
        }
        let mut params = Vec::new();
        if !check!(self, RightParen) {
            params.push(self.identifier("Expected identifier or ')'")?);
            while advance_if!(self, Comma) {
                params.push(self.identifier("Expected identifier")?);
            }
        }
        if !advance_if!(self, RightParen) {
            return Err(self.error("Expected ',' or ')'"));
        }
        let (body, block_form) = if advance_if!(self, Colon) {
            (self.expr()?, false)
        } else if advance_if!(self, Newline) {
            let body = self.statements()?;
            self.end_keyword()?;
            (body, true)
        } else {
            return Err(self.error("Expected ':' or NEWLINE"));
        };
        let span = Span::new(start, self.previous().end.clone());
        Ok(Node::new(
            NodeKind::ProcDef(Rc::new(ProcDef {
                name,
                params,
                body,
                block_form,
            })),
            span,
        ))
    }
    fn identifier(&mut self, message: &str) -> Result<String, Diagnostic> {
        match &self.peek().tokentype {
            TokenType::Identifier(name) => {
                self.advance();
                Ok(name.clone())
            }
            _ => Err(self.error(message)),
        }
    }
    fn keyword(&mut self, keyword: Keyword) -> Result<(), Diagnostic> {
        if self.advance_if_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected '{}'", keyword)))
        }
    }
    fn end_keyword(&mut self) -> Result<(), Diagnostic> {
        if self.advance_if_keyword(Keyword::End) {
            Ok(())
        } else {
            Err(self.stop_error("Expected 'END'"))
        }
    }
    fn advance_if_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek().is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }
    fn skip_newlines(&mut self) -> usize {
        let mut count = 0;
        while advance_if!(self, Newline) {
            count += 1;
        }
        count
    }
    fn stray_token(&mut self) -> Diagnostic {
        let token = self.peek();
        if let TokenType::Keyword(keyword) = &token.tokentype {
            if keyword.is_work_in_progress() {
                return Diagnostic::at(
                    ErrorKind::FeatureInProgress,
                    "Will shortly be available for you ;)",
                    &token.span(),
                );
            }
        }
        self.stop_error("Expected an operator or end of input")
    }
    /// A statement list ended here; if a speculative statement was abandoned
    /// at this exact token, its diagnostic names the real problem.
    fn stop_error(&mut self, message: &str) -> Diagnostic {
        match self.rollback.take() {
            Some((index, diagnostic)) if index == self.current => {
                log::warn!("reporting abandoned statement: {}", diagnostic);
                diagnostic
            }
            _ => self.error(message),
        }
    }
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    fn is_at_end(&self) -> bool {
        match self.peek().tokentype {
            TokenType::EOF => true,
            _ => false,
        }
    }
    // `parse` guarantees a trailing EOF, so the index is always in range.
    fn peek(&self) -> &'a Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }
    fn previous(&self) -> &'a Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
    fn error(&self, message: &str) -> Diagnostic {
        Diagnostic::at(ErrorKind::InvalidSyntax, message, &self.peek().span())
    }
}

fn binary(left: Node, operator: BinaryOperator, right: Node) -> Node {
    let span = left.span.to(&right.span);
    Node::new(
        NodeKind::BinaryOp {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        },
        span,
    )
}

fn unary(start: Position, operator: UnaryOperator, operand: Node) -> Node {
    let end = operand.span.end.clone();
    Node::new(
        NodeKind::UnaryOp {
            operator,
            operand: Box::new(operand),
        },
        Span::new(start, end),
    )
}

#[cfg(test)]
mod parser_tests {
    use crate::ast::{AstPrinter, NodeKind};
    use crate::error::ErrorKind;
    use crate::parser::parse;
    use crate::scanner::scan_tokens;

    fn print(source: &str) -> String {
        let tokens = scan_tokens("test", source).unwrap();
        let program = parse(&tokens).unwrap();
        program.accept(&mut AstPrinter {})
    }

    fn fail(source: &str) -> crate::error::Diagnostic {
        let tokens = scan_tokens("test", source).unwrap();
        parse(&tokens).unwrap_err()
    }

    #[test]
    fn precedence() {
        assert_eq!(print("1 + 2 * 3"), "(block (+ 1 (* 2 3)))");
        assert_eq!(print("-2 ^ 2"), "(block (- (^ 2 2)))");
        assert_eq!(print("2 ^ 3 ^ 2"), "(block (^ 2 (^ 3 2)))");
        assert_eq!(print("(1 + 2) * 3"), "(block (* (+ 1 2) 3))");
        assert_eq!(print("NOT 1 == 2"), "(block (NOT (== 1 2)))");
        assert_eq!(print("1 - 2 - 3"), "(block (- (- 1 2) 3))");
    }

    #[test]
    fn statements_and_assignment() {
        assert_eq!(
            print("BUCKET x = {1, \"a\"}\n\nx"),
            "(block (assign x (list 1 \"a\")) x)"
        );
        assert_eq!(print("1; 2;"), "(block 1 2)");
    }

    #[test]
    fn empty_programs() {
        assert_eq!(print(""), "(block)");
        assert_eq!(print("@ nothing here\n\n"), "(block)");
    }

    #[test]
    fn conditionals() {
        assert_eq!(
            print("IF 1 THEN 2 ALTER 3 THEN 4 ELSE 5"),
            "(block (if (1 2) (3 4) (else 5)))"
        );
        let tokens = scan_tokens("test", "IF x THEN\n  1\nELSE\n  2\nEND").unwrap();
        let program = parse(&tokens).unwrap();
        match &program.kind {
            NodeKind::Block(statements) => match &statements[0].kind {
                NodeKind::If { cases, else_case } => {
                    assert!(cases[0].suppress_result);
                    assert!(else_case.as_ref().map_or(false, |e| e.suppress_result));
                }
                other => panic!("expected if, got {:?}", other),
            },
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn loops_and_procedures() {
        assert_eq!(print("LOOP i = 0 TILL 3 DO i"), "(block (loop i 0 3 i))");
        assert_eq!(
            print("LOOP i = 9 TILL 0 STEP -3 DO\n i\nEND"),
            "(block (loop i 9 0 step (- 3) (block i)))"
        );
        assert_eq!(print("PROC add(a, b): a + b"), "(block (proc add (a b) (+ a b)))");
        assert_eq!(print("PROC (): 1"), "(block (proc _ () 1))");
        assert_eq!(print("f(1)(2)"), "(block (call (call f 1) 2))");
        assert_eq!(print("f()"), "(block (call f))");
    }

    #[test]
    fn spans_cover_their_source() {
        let source = "BUCKET total = add(1, 2) * 3";
        let tokens = scan_tokens("test", source).unwrap();
        let program = parse(&tokens).unwrap();
        assert_eq!(program.span.text(), source);
        if let NodeKind::Block(statements) = &program.kind {
            if let NodeKind::VarAssign { value, .. } = &statements[0].kind {
                assert_eq!(value.span.text(), "add(1, 2) * 3");
            }
        }
    }

    #[test]
    fn syntax_errors() {
        let err = fail("1 +");
        assert_eq!(err.kind, ErrorKind::InvalidSyntax);

        let err = fail("1 2");
        assert_eq!(err.message, "Expected an operator or end of input");

        let err = fail("1 AND 2");
        assert_eq!(err.kind, ErrorKind::FeatureInProgress);

        let err = fail("IF 1 THEN\n 2\n");
        assert_eq!(err.message, "Expected 'END', 'ALTER' or 'ELSE'");

        let err = fail("PROC f(a b): a");
        assert_eq!(err.message, "Expected ',' or ')'");
    }

    #[test]
    fn abandoned_statement_is_reported() {
        let err = fail("BUCKET x = 1\nBUCKET = 2");
        assert_eq!(err.kind, ErrorKind::InvalidSyntax);
        assert_eq!(err.message, "Expected identifier");
        assert_eq!(err.start.line_number(), 2);

        let err = fail("PROC f()\n BUCKET y 2\nEND");
        assert_eq!(err.message, "Expected '='");
    }
}
