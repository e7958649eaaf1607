//! The `execute` request and its boundary validation.

use crate::error::{EngineError, EngineResult};
use quan_eval::{Environment, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// One call to the engine entry point.
///
/// Fields are kept loosely typed so that bad values are reported as
/// boundary errors in the response rather than as decode failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    /// `"RELEASE"` (default) or `"DEBUG"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Program source text.
    #[serde(default)]
    pub program: String,
    /// External variables injected into the root environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<JsonValue>,
    /// Debug artifacts to include in the response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub debug_lv: Vec<String>,
}

impl ExecuteRequest {
    /// A RELEASE request with no variables.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_vars(mut self, vars: JsonValue) -> Self {
        self.vars = Some(vars);
        self
    }

    pub fn with_debug(mut self, level: impl Into<String>) -> Self {
        self.debug_lv.push(level.into());
        self
    }

    /// The `vars` object echoed back as `inputs`.
    pub fn inputs(&self) -> JsonValue {
        match &self.vars {
            Some(vars) if !vars.is_null() => vars.clone(),
            _ => JsonValue::Object(serde_json::Map::new()),
        }
    }
}

/// Execution mode. Neither mode changes evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Release,
    /// Raises engine log verbosity.
    Debug,
}

impl Mode {
    pub fn parse(s: &str) -> EngineResult<Self> {
        match s {
            "RELEASE" => Ok(Mode::Release),
            "DEBUG" => Ok(Mode::Debug),
            other => Err(EngineError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Release => f.write_str("RELEASE"),
            Mode::Debug => f.write_str("DEBUG"),
        }
    }
}

/// Requested debug artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugLevels {
    pub lexer_tokens: bool,
    pub ast_tree: bool,
}

impl DebugLevels {
    pub fn parse<S: AsRef<str>>(levels: &[S]) -> EngineResult<Self> {
        let mut result = Self::default();
        for level in levels {
            match level.as_ref() {
                "LEXER_TOKENS" => result.lexer_tokens = true,
                "AST_TREE" | "PARSER_TREE" => result.ast_tree = true,
                other => return Err(EngineError::UnknownDebugLevel(other.to_string())),
            }
        }
        Ok(result)
    }
}

/// A request that passed boundary validation.
#[derive(Debug)]
pub struct ValidatedRequest {
    pub mode: Mode,
    pub debug: DebugLevels,
    /// Root environment seeded with the request's variables.
    pub globals: Environment,
}

/// Check mode, debug levels and `vars`, converting variables to values.
pub fn validate(request: &ExecuteRequest) -> EngineResult<ValidatedRequest> {
    let mode = request.mode.as_deref().map_or(Ok(Mode::Release), Mode::parse)?;
    let debug = DebugLevels::parse(&request.debug_lv)?;
    let globals = Environment::new();
    match &request.vars {
        None | Some(JsonValue::Null) => {}
        Some(JsonValue::Object(fields)) => {
            for (name, value) in fields {
                let value = Value::from_json(value).ok_or_else(|| {
                    EngineError::UnsupportedVars(format!("variable '{name}' is out of range"))
                })?;
                globals.define(name.clone(), value);
            }
        }
        Some(other) => {
            return Err(EngineError::UnsupportedVars(format!(
                "expected an object, got {}",
                json_type_name(other)
            )))
        }
    }
    Ok(ValidatedRequest {
        mode,
        debug,
        globals,
    })
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
