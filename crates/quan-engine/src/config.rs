//! Engine configuration.

use crate::error::{EngineError, EngineResult};
use quan_eval::{EvalLimits, DEFAULT_CONSOLE_LIMIT, DEFAULT_MAX_CALL_DEPTH};
use serde::{Deserialize, Serialize};

/// Limits applied to every execution run by an [`Engine`](crate::Engine).
///
/// Serialized in camelCase; missing fields take their defaults, so `{}` is
/// a valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum nesting of user function calls.
    pub max_call_depth: usize,
    /// Maximum console output per execution, in bytes.
    pub max_console_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_console_bytes: DEFAULT_CONSOLE_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration object.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidRequest(format!("bad engine config: {e}")))
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_max_console_bytes(mut self, bytes: usize) -> Self {
        self.max_console_bytes = bytes;
        self
    }

    /// The evaluator limits this configuration describes.
    pub fn limits(&self) -> EvalLimits {
        EvalLimits {
            max_call_depth: self.max_call_depth,
            max_console_bytes: self.max_console_bytes,
        }
    }
}
