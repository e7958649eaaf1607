//! Engine-level error types.

use quan_types::{ErrorCode, QuanError};
use thiserror::Error;

/// Failure of one `execute` call.
///
/// Request validation problems are reported before any source is read;
/// lexer, parser and evaluator failures arrive as located diagnostics.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request itself could not be decoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown mode '{0}', expected RELEASE or DEBUG")]
    UnknownMode(String),

    #[error("unknown debug level '{0}', expected LEXER_TOKENS or AST_TREE")]
    UnknownDebugLevel(String),

    /// A `vars` entry has no QuanLang counterpart.
    #[error("unsupported vars: {0}")]
    UnsupportedVars(String),

    /// A debug artifact could not be serialized.
    #[error("failed to serialize {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A lex, parse or runtime diagnostic.
    #[error(transparent)]
    Diagnostic(#[from] QuanError),
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest(_) | Self::Serialization { .. } => ErrorCode::INVALID_REQUEST,
            Self::UnknownMode(_) => ErrorCode::UNKNOWN_MODE,
            Self::UnknownDebugLevel(_) => ErrorCode::UNKNOWN_DEBUG_LEVEL,
            Self::UnsupportedVars(_) => ErrorCode::UNSUPPORTED_VAR,
            Self::Diagnostic(err) => err.code,
        }
    }

    /// Convert into the structured error placed in the response payload.
    pub fn into_diagnostic(self) -> QuanError {
        match self {
            Self::Diagnostic(err) => err,
            other => QuanError::new(other.code(), other.to_string()),
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use quan_types::ErrorKind;

    #[test]
    fn test_boundary_errors_have_no_span() {
        let diag = EngineError::UnknownMode("FAST".into()).into_diagnostic();
        assert_eq!(diag.code, ErrorCode::UNKNOWN_MODE);
        assert_eq!(diag.kind, ErrorKind::BoundaryError);
        assert_eq!(diag.message, "unknown mode 'FAST', expected RELEASE or DEBUG");
        assert!(diag.span.is_none());
    }

    #[test]
    fn test_diagnostics_pass_through() {
        let inner = QuanError::new(ErrorCode::UNDEFINED_VARIABLE, "undefined variable 'x'");
        let err = EngineError::from(inner.clone());
        assert_eq!(err.code(), ErrorCode::UNDEFINED_VARIABLE);
        assert_eq!(err.to_string(), inner.to_string());
        assert_eq!(err.into_diagnostic(), inner);
    }
}
