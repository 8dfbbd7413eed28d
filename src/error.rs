use crate::context::{Context, Frame};
use crate::position::{Position, Span};
use crate::shared_list::SharedList;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt::Write;
use strum_macros::{Display, EnumIter};
use thiserror::Error;

const RESET: &str = "\x1b[0m";
const YELLOW: &str = "\x1b[93m";
const ORANGE_BACKGROUND: &str = "\x1b[48;2;255;165;0m";
const RED: &str = "\x1b[91m";
const SIREN: &str = "\u{1F6A8}";

/// How loudly a diagnostic is reported: 1 lexical, 2 advisory, 3 syntax and
/// runtime failures, 4 reserved for critical failures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum Severity {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl Severity {
    fn colour(self) -> &'static str {
        match self {
            Severity::Low => YELLOW,
            Severity::Medium => ORANGE_BACKGROUND,
            Severity::High | Severity::Critical => RED,
        }
    }
}

/// The broad family a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorClass {
    #[strum(serialize = "LexicalError")]
    Lexical,
    #[strum(serialize = "SyntaxError")]
    Syntax,
    #[strum(serialize = "NameError")]
    Name,
    #[strum(serialize = "RuntimeError")]
    Runtime,
    #[strum(serialize = "ValueError")]
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum ErrorKind {
    #[strum(serialize = "Illegal Character")]
    IllegalCharacter,
    #[strum(serialize = "Expected Character")]
    ExpectedCharacter,
    #[strum(serialize = "Unterminated String")]
    UnterminatedString,
    #[strum(serialize = "Invalid Syntax")]
    InvalidSyntax,
    #[strum(serialize = "Feature is Work in Progress")]
    FeatureInProgress,
    #[strum(serialize = "Not Defined")]
    NotDefined,
    #[strum(serialize = "Illegal Operation")]
    IllegalOperation,
    #[strum(serialize = "RunTime Error")]
    Runtime,
    #[strum(serialize = "Value Error")]
    Value,
}

impl ErrorKind {
    pub fn class(self) -> ErrorClass {
        match self {
            ErrorKind::IllegalCharacter
            | ErrorKind::ExpectedCharacter
            | ErrorKind::UnterminatedString => ErrorClass::Lexical,
            ErrorKind::InvalidSyntax | ErrorKind::FeatureInProgress => ErrorClass::Syntax,
            ErrorKind::NotDefined => ErrorClass::Name,
            ErrorKind::IllegalOperation | ErrorKind::Runtime => ErrorClass::Runtime,
            ErrorKind::Value => ErrorClass::Value,
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            ErrorKind::IllegalCharacter
            | ErrorKind::ExpectedCharacter
            | ErrorKind::UnterminatedString => Severity::Low,
            ErrorKind::FeatureInProgress | ErrorKind::NotDefined => Severity::Medium,
            ErrorKind::InvalidSyntax
            | ErrorKind::IllegalOperation
            | ErrorKind::Runtime
            | ErrorKind::Value => Severity::High,
        }
    }
}

/// A failure from any stage of the pipeline.
///
/// Diagnostics raised while evaluating carry the call frames that were active
/// at the failure, which `render` turns into a traceback.
#[derive(Debug, Clone, Error)]
#[error("{kind} : {message} in File: {file} at Line {line}", file = .start.file_name(), line = .start.line_number())]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub start: Position,
    pub end: Position,
    pub frames: Option<SharedList<Frame>>,
}

impl Diagnostic {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        start: Position,
        end: Position,
    ) -> Diagnostic {
        Diagnostic {
            kind,
            severity: kind.severity(),
            message: message.into(),
            start,
            end,
            frames: None,
        }
    }

    pub fn at(kind: ErrorKind, message: impl Into<String>, span: &Span) -> Diagnostic {
        Diagnostic::new(kind, message, span.start.clone(), span.end.clone())
    }

    /// A diagnostic raised during evaluation of `context`.
    pub fn runtime(
        kind: ErrorKind,
        message: impl Into<String>,
        span: &Span,
        context: &Context,
    ) -> Diagnostic {
        Diagnostic::at(kind, message, span).with_frames(context.frames.clone())
    }

    pub fn with_frames(mut self, frames: SharedList<Frame>) -> Diagnostic {
        self.frames = Some(frames);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Diagnostic {
        self.severity = severity;
        self
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    /// One line per active frame, outermost first.
    pub fn traceback(&self) -> Option<String> {
        let frames = self.frames.as_ref()?;
        let mut lines = Vec::new();
        let mut position = Some(&self.start);
        for frame in frames.iter() {
            let at = match position {
                Some(at) => at,
                None => break,
            };
            lines.push(format!(
                "  File {}, line {}, in {}",
                at.file_name(),
                at.line_number(),
                frame.name
            ));
            position = frame.entry.as_ref();
        }
        lines.reverse();
        let mut out = String::from("Traceback (most recent call last):\n");
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        Some(out)
    }

    pub fn render(&self) -> String {
        let mut out = self.traceback().unwrap_or_default();
        let marker = if self.severity == Severity::Critical {
            SIREN
        } else {
            ""
        };
        let _ = write!(
            out,
            "{colour}{marker}{kind}{marker}{reset} [severity {level}] : {message} in File: {file} at Line {line}",
            colour = self.severity.colour(),
            marker = marker,
            kind = self.kind,
            reset = RESET,
            level = u8::from(self.severity),
            message = self.message,
            file = self.start.file_name(),
            line = self.start.line_number(),
        );
        out
    }
}

#[cfg(test)]
mod error_tests {
    use super::{Diagnostic, ErrorClass, ErrorKind, Severity};
    use crate::context::{Context, Frame};
    use crate::environment::Scope;
    use crate::position::{Position, Span};
    use std::convert::TryFrom;
    use strum::IntoEnumIterator;

    fn span_of(text: &str, from: usize, to: usize) -> Span {
        let mut start = Position::new("demo.poop", text);
        for c in text[..from].chars() {
            start.advance(c);
        }
        let mut end = start.clone();
        for c in text[from..to].chars() {
            end.advance(c);
        }
        Span::new(start, end)
    }

    #[test]
    fn severity_follows_kind() {
        assert_eq!(ErrorKind::IllegalCharacter.severity(), Severity::Low);
        assert_eq!(ErrorKind::FeatureInProgress.severity(), Severity::Medium);
        assert_eq!(ErrorKind::Runtime.severity(), Severity::High);
        assert_eq!(Severity::try_from(4u8).ok(), Some(Severity::Critical));
        assert!(Severity::try_from(5u8).is_err());
        assert_eq!(u8::from(Severity::Medium), 2);
    }

    #[test]
    fn classes() {
        assert_eq!(ErrorKind::UnterminatedString.class(), ErrorClass::Lexical);
        assert_eq!(ErrorKind::IllegalOperation.class(), ErrorClass::Runtime);
        assert_eq!(ErrorKind::NotDefined.class(), ErrorClass::Name);
        assert_eq!(ErrorClass::Value.to_string(), "ValueError");
    }

    #[test]
    fn every_kind_is_classified_and_ranked() {
        for kind in ErrorKind::iter() {
            let severity = kind.severity();
            match kind.class() {
                ErrorClass::Lexical => assert_eq!(severity, Severity::Low, "{}", kind),
                ErrorClass::Name => assert_eq!(severity, Severity::Medium, "{}", kind),
                ErrorClass::Syntax => assert!(severity >= Severity::Medium, "{}", kind),
                ErrorClass::Runtime | ErrorClass::Value => {
                    assert_eq!(severity, Severity::High, "{}", kind)
                }
            }
            assert!(severity < Severity::Critical, "{}", kind);
            assert!(!kind.to_string().is_empty());
        }
        assert_eq!(ErrorKind::iter().count(), 9);
    }

    #[test]
    fn display_is_one_line() {
        let text = "1 +\n$";
        let diagnostic = Diagnostic::at(ErrorKind::IllegalCharacter, "'$'", &span_of(text, 4, 5));
        assert_eq!(
            diagnostic.to_string(),
            "Illegal Character : '$' in File: demo.poop at Line 2"
        );
        assert!(diagnostic.traceback().is_none());
    }

    #[test]
    fn traceback_lists_frames_outermost_first() {
        let text = "f()\n\n1/0";
        let root = Context::root(Scope::new());
        let call_site = span_of(text, 0, 3);
        let inner = root.enter("f", &call_site, Scope::child(&root.scope));
        let diagnostic = Diagnostic::runtime(
            ErrorKind::Runtime,
            "Division by Zero",
            &span_of(text, 5, 8),
            &inner,
        );
        let rendered = diagnostic.render();
        let expected_frames = "Traceback (most recent call last):\n  \
             File demo.poop, line 1, in <program>\n  \
             File demo.poop, line 3, in f\n";
        assert!(rendered.starts_with(expected_frames), "{}", rendered);
        assert!(rendered.contains("RunTime Error"));
        assert!(rendered.contains("[severity 3] : Division by Zero in File: demo.poop at Line 3"));
    }

    #[test]
    fn critical_gets_a_siren() {
        let diagnostic = Diagnostic::at(ErrorKind::Runtime, "boom", &span_of("x", 0, 1))
            .with_severity(Severity::Critical);
        let rendered = diagnostic.render();
        assert_eq!(rendered.matches('\u{1F6A8}').count(), 2);
        assert!(rendered.contains("[severity 4]"));
        let frame = Frame::new("<program>", None);
        assert_eq!(frame.name, "<program>");
    }
}
