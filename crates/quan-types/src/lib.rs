//! Shared types for the QuanLang engine.
//!
//! This crate defines the AST node types, source spans, error types,
//! and other shared data structures used across all engine stages.

mod error;
mod span;
pub mod ast;

pub use error::{Diagnostics, ErrorCode, ErrorKind, QuanError, MAX_ERRORS};
pub use span::{SourceFile, Span};

/// Result type used throughout the QuanLang engine.
pub type Result<T> = std::result::Result<T, QuanError>;
