//! QuanLang tree-walking evaluator.
//!
//! Walks a parsed [`Program`](quan_types::ast::Program) against a root
//! [`Environment`] seeded with external variables, and produces the root
//! bindings plus the console text written by `print`/`println`.
//!
//! Maps are shared by reference, closures capture their defining scope, and
//! `return` unwinds through an explicit [`Flow`] value rather than an error.

mod builtins;
mod env;
mod error;
mod evaluator;
mod stack;
mod value;

pub use builtins::{Builtin, Console, DEFAULT_CONSOLE_LIMIT};
pub use env::Environment;
pub use error::{EvalError, EvalResult};
pub use evaluator::{evaluate, EvalLimits, Evaluation, Evaluator, Flow, DEFAULT_MAX_CALL_DEPTH};
pub use value::{format_number, ArrayRef, Closure, MapRef, Value};
