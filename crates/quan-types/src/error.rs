use crate::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of diagnostics stored before fail-fast.
pub const MAX_ERRORS: usize = 20;

/// Error taxonomy exposed to hosts.
///
/// The serialized names are part of the response contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    LexError,
    ParseError,
    UndefinedVariableError,
    UndefinedPropertyError,
    TypeMismatchError,
    ArityError,
    RecursionLimitError,
    ArithmeticError,
    BuiltinError,
    BoundaryError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LexError => "LexError",
            Self::ParseError => "ParseError",
            Self::UndefinedVariableError => "UndefinedVariableError",
            Self::UndefinedPropertyError => "UndefinedPropertyError",
            Self::TypeMismatchError => "TypeMismatchError",
            Self::ArityError => "ArityError",
            Self::RecursionLimitError => "RecursionLimitError",
            Self::ArithmeticError => "ArithmeticError",
            Self::BuiltinError => "BuiltinError",
            Self::BoundaryError => "BoundaryError",
        };
        f.write_str(name)
    }
}

/// Numeric error code (E100–E499).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Lexical errors (E100–E199) ──
    pub const UNTERMINATED_STRING: Self = Self(100);
    pub const UNTERMINATED_TEMPLATE: Self = Self(101);
    pub const ILLEGAL_CHARACTER: Self = Self(102);
    pub const INVALID_ESCAPE: Self = Self(103);

    // ── Syntax errors (E200–E299) ──
    pub const UNEXPECTED_TOKEN: Self = Self(200);
    pub const MISSING_TERMINATOR: Self = Self(201);
    pub const INVALID_ASSIGNMENT_TARGET: Self = Self(202);
    pub const CHAINED_COMPARISON: Self = Self(203);
    pub const EMPTY_INTERPOLATION: Self = Self(204);
    pub const NESTING_LIMIT_EXCEEDED: Self = Self(205);

    // ── Runtime errors (E300–E399) ──
    pub const UNDEFINED_VARIABLE: Self = Self(300);
    pub const UNDEFINED_PROPERTY: Self = Self(301);
    pub const TYPE_MISMATCH: Self = Self(302);
    pub const ARITY_MISMATCH: Self = Self(303);
    pub const RECURSION_LIMIT: Self = Self(304);
    pub const ARITHMETIC_TRAP: Self = Self(305);
    pub const BUILTIN_FAILED: Self = Self(306);

    // ── Boundary errors (E400–E499) ──
    pub const INVALID_REQUEST: Self = Self(400);
    pub const UNSUPPORTED_VAR: Self = Self(401);
    pub const UNKNOWN_MODE: Self = Self(402);
    pub const UNKNOWN_DEBUG_LEVEL: Self = Self(403);

    /// Get the taxonomy kind for this error code.
    pub fn kind(self) -> ErrorKind {
        match self.0 {
            100..=199 => ErrorKind::LexError,
            200..=299 => ErrorKind::ParseError,
            300 => ErrorKind::UndefinedVariableError,
            301 => ErrorKind::UndefinedPropertyError,
            302 => ErrorKind::TypeMismatchError,
            303 => ErrorKind::ArityError,
            304 => ErrorKind::RecursionLimitError,
            305 => ErrorKind::ArithmeticError,
            306..=399 => ErrorKind::BuiltinError,
            _ => ErrorKind::BoundaryError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured QuanLang diagnostic.
///
/// Every stage (lexer, parser, evaluator, request validation) reports
/// failures in this shape so hosts never have to parse free-form strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuanError {
    /// Error code (e.g., E300).
    pub code: ErrorCode,
    /// Taxonomy kind (derived from code).
    pub kind: ErrorKind,
    /// Human-readable error message.
    pub message: String,
    /// Source location, absent for request-level errors.
    #[serde(flatten)]
    pub span: Option<Span>,
    /// The source line the span points into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<String>,
    /// Optional fix suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl QuanError {
    /// Create an error without a source location.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            kind: code.kind(),
            message: message.into(),
            span: None,
            source_line: None,
            suggestion: None,
        }
    }

    /// Create an error located at `span` inside `source`.
    pub fn at(code: ErrorCode, message: impl Into<String>, span: Span, source: &SourceFile) -> Self {
        Self::new(code, message).with_span(span, source)
    }

    /// Attach a location, capturing the source line for context.
    pub fn with_span(mut self, span: Span, source: &SourceFile) -> Self {
        self.span = Some(span);
        self.source_line = source.line(span.start_line).map(str::to_string);
        self
    }

    /// Attach a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for QuanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = self.span {
            write!(f, "{}: ", span)?;
        }
        write!(f, "{} [{}] {}", self.code, self.kind, self.message)
    }
}

impl std::error::Error for QuanError {}

/// Diagnostics collected by the lexer and parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<QuanError>,
    pub total_errors: usize,
}

impl Diagnostics {
    /// Create an empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Returns `true` once the storage cap has been reached.
    pub fn is_full(&self) -> bool {
        self.total_errors >= MAX_ERRORS
    }

    /// Add an error, respecting the MAX_ERRORS limit.
    pub fn push(&mut self, error: QuanError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Move every error from `other` into `self`.
    pub fn extend(&mut self, other: Diagnostics) {
        let dropped = other.total_errors - other.errors.len();
        for err in other.errors {
            self.push(err);
        }
        self.total_errors += dropped;
    }

    /// The first error, which is the one reported to hosts.
    pub fn into_first(self) -> Option<QuanError> {
        self.errors.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_kind() {
        assert_eq!(ErrorCode::UNTERMINATED_STRING.kind(), ErrorKind::LexError);
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.kind(), ErrorKind::ParseError);
        assert_eq!(
            ErrorCode::UNDEFINED_VARIABLE.kind(),
            ErrorKind::UndefinedVariableError
        );
        assert_eq!(
            ErrorCode::UNDEFINED_PROPERTY.kind(),
            ErrorKind::UndefinedPropertyError
        );
        assert_eq!(ErrorCode::TYPE_MISMATCH.kind(), ErrorKind::TypeMismatchError);
        assert_eq!(ErrorCode::ARITY_MISMATCH.kind(), ErrorKind::ArityError);
        assert_eq!(
            ErrorCode::RECURSION_LIMIT.kind(),
            ErrorKind::RecursionLimitError
        );
        assert_eq!(ErrorCode::ARITHMETIC_TRAP.kind(), ErrorKind::ArithmeticError);
        assert_eq!(ErrorCode::BUILTIN_FAILED.kind(), ErrorKind::BuiltinError);
        assert_eq!(ErrorCode::UNSUPPORTED_VAR.kind(), ErrorKind::BoundaryError);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::TYPE_MISMATCH), "E302");
        assert_eq!(format!("{}", ErrorCode::UNTERMINATED_STRING), "E100");
    }

    #[test]
    fn test_error_display_with_and_without_span() {
        let sf = SourceFile::new("main.qlang", "print(y)");
        let located = QuanError::at(
            ErrorCode::UNDEFINED_VARIABLE,
            "undefined variable 'y'",
            Span::new(1, 7, 1, 7),
            &sf,
        );
        assert_eq!(
            located.to_string(),
            "1:7: E300 [UndefinedVariableError] undefined variable 'y'"
        );
        assert_eq!(located.source_line.as_deref(), Some("print(y)"));

        let bare = QuanError::new(ErrorCode::UNKNOWN_MODE, "unknown mode 'FAST'");
        assert_eq!(bare.to_string(), "E402 [BoundaryError] unknown mode 'FAST'");
    }

    #[test]
    fn test_error_json_shape() {
        let sf = SourceFile::new("main.qlang", "a = b");
        let err = QuanError::at(
            ErrorCode::UNDEFINED_VARIABLE,
            "undefined variable 'b'",
            Span::new(1, 5, 1, 5),
            &sf,
        )
        .with_suggestion("pass 'b' through vars");
        let json: serde_json::Value = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "UndefinedVariableError");
        assert_eq!(json["code"], 300);
        assert_eq!(json["line"], 1);
        assert_eq!(json["column"], 5);
        assert_eq!(json["source_line"], "a = b");
        assert_eq!(json["suggestion"], "pass 'b' through vars");

        let bare = serde_json::to_value(QuanError::new(ErrorCode::INVALID_REQUEST, "bad")).unwrap();
        assert!(bare.get("line").is_none());
        assert!(bare.get("source_line").is_none());
    }

    #[test]
    fn test_diagnostics_max_limit() {
        let mut diags = Diagnostics::empty();
        for i in 0..25 {
            diags.push(QuanError::new(ErrorCode::UNEXPECTED_TOKEN, format!("Error {i}")));
        }
        assert_eq!(diags.errors.len(), 20);
        assert_eq!(diags.total_errors, 25);
        assert!(diags.is_full());
        assert_eq!(diags.into_first().unwrap().message, "Error 0");
    }

    #[test]
    fn test_diagnostics_extend_keeps_totals() {
        let mut a = Diagnostics::empty();
        a.push(QuanError::new(ErrorCode::UNEXPECTED_TOKEN, "a"));
        let mut b = Diagnostics::empty();
        b.push(QuanError::new(ErrorCode::ILLEGAL_CHARACTER, "b"));
        b.push(QuanError::new(ErrorCode::ILLEGAL_CHARACTER, "c"));
        a.extend(b);
        assert_eq!(a.total_errors, 3);
        assert_eq!(a.errors[1].message, "b");
    }
}
