//! Runtime error types for the QuanLang evaluator.

use quan_types::{ErrorCode, QuanError, SourceFile, Span};
use thiserror::Error;

/// Evaluation error. Every variant halts the program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Identifier with no binding and no builtin of that name.
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String, span: Span },

    /// Member read or write through a missing key or a non-object.
    #[error("{message}")]
    UndefinedProperty { message: String, span: Span },

    /// Operand or condition of the wrong type, or a call to a non-function.
    #[error("{message}")]
    TypeMismatch { message: String, span: Span },

    /// Wrong number of call arguments.
    #[error("'{callee}' expects {expected} argument{}, got {got}", plural(.expected))]
    Arity {
        callee: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    /// Call depth exceeded the configured limit.
    #[error("maximum call depth of {limit} exceeded")]
    RecursionLimit { limit: usize, span: Span },

    /// Division or modulo by zero.
    #[error("{message}")]
    Arithmetic { message: String, span: Span },

    /// A builtin rejected its input.
    #[error("{name}(): {message}")]
    Builtin {
        name: &'static str,
        message: String,
        span: Span,
    },
}

impl EvalError {
    /// Source location of the failing node.
    pub fn span(&self) -> Span {
        match self {
            Self::UndefinedVariable { span, .. }
            | Self::UndefinedProperty { span, .. }
            | Self::TypeMismatch { span, .. }
            | Self::Arity { span, .. }
            | Self::RecursionLimit { span, .. }
            | Self::Arithmetic { span, .. }
            | Self::Builtin { span, .. } => *span,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UndefinedVariable { .. } => ErrorCode::UNDEFINED_VARIABLE,
            Self::UndefinedProperty { .. } => ErrorCode::UNDEFINED_PROPERTY,
            Self::TypeMismatch { .. } => ErrorCode::TYPE_MISMATCH,
            Self::Arity { .. } => ErrorCode::ARITY_MISMATCH,
            Self::RecursionLimit { .. } => ErrorCode::RECURSION_LIMIT,
            Self::Arithmetic { .. } => ErrorCode::ARITHMETIC_TRAP,
            Self::Builtin { .. } => ErrorCode::BUILTIN_FAILED,
        }
    }

    /// Convert into the structured diagnostic returned to hosts.
    pub fn to_diagnostic(&self, source: &SourceFile) -> QuanError {
        let error = QuanError::at(self.code(), self.to_string(), self.span(), source);
        match self {
            Self::RecursionLimit { .. } => {
                error.with_suggestion("check that every recursive function has a base case")
            }
            _ => error,
        }
    }

    pub(crate) fn type_mismatch(message: impl Into<String>, span: Span) -> Self {
        Self::TypeMismatch {
            message: message.into(),
            span,
        }
    }

    pub(crate) fn undefined_property(message: impl Into<String>, span: Span) -> Self {
        Self::UndefinedProperty {
            message: message.into(),
            span,
        }
    }
}

fn plural(n: &usize) -> &'static str {
    if *n == 1 {
        ""
    } else {
        "s"
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
