//! QuanLang engine: the single `execute` entry point.
//!
//! ```text
//! request → validate → Lexer → Parser → Evaluator → response
//! ```
//!
//! Every failure, from an unknown `mode` to a runtime error deep in user
//! code, comes back as a structured error inside an [`ExecuteResponse`];
//! `execute` itself never fails.
//!
//! ```
//! use quan_engine::{Engine, ExecuteRequest};
//!
//! let engine = Engine::default();
//! let resp = engine.execute(&ExecuteRequest::new("w = 40\nprintln('''${w * 2}''')"));
//! assert!(resp.success);
//! assert_eq!(resp.payload.console, "80\n");
//! ```

mod config;
mod engine;
mod error;
mod request;
mod response;

pub use config::EngineConfig;
pub use engine::{Engine, PROGRAM_FILE_NAME};
pub use error::{EngineError, EngineResult};
pub use request::{validate, DebugLevels, ExecuteRequest, Mode, ValidatedRequest};
pub use response::{ExecuteResponse, Payload, FAILURE_MESSAGE, SUCCESS_MESSAGE};
