//! Built-in functions and the console buffer they write to.
//!
//! A builtin is resolved only when no binding of the same name is visible,
//! so user code can shadow any of them.

use crate::error::{EvalError, EvalResult};
use crate::value::Value;
use quan_types::Span;
use serde_json::Value as JsonValue;

/// Default cap on console output, in bytes.
pub const DEFAULT_CONSOLE_LIMIT: usize = 1024 * 1024;

/// Accumulated `print` output for one execution.
#[derive(Debug, Clone)]
pub struct Console {
    text: String,
    limit: usize,
}

impl Console {
    pub fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
        }
    }

    /// Append `chunk`, or return `false` without writing anything if the
    /// buffer would grow past its limit.
    fn write(&mut self, chunk: &str) -> bool {
        if self.text.len() + chunk.len() > self.limit {
            return false;
        }
        self.text.push_str(chunk);
        true
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(DEFAULT_CONSOLE_LIMIT)
    }
}

/// The builtin function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Println,
    Type,
    String,
    Int,
    Float,
    Bool,
    ToMap,
}

impl Builtin {
    pub const ALL: [Builtin; 8] = [
        Builtin::Print,
        Builtin::Println,
        Builtin::Type,
        Builtin::String,
        Builtin::Int,
        Builtin::Float,
        Builtin::Bool,
        Builtin::ToMap,
    ];

    pub fn lookup(name: &str) -> Option<Builtin> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Type => "type",
            Builtin::String => "string",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Bool => "bool",
            Builtin::ToMap => "toMap",
        }
    }

    /// Fixed argument count, or `None` for variadic builtins.
    fn arity(self) -> Option<usize> {
        match self {
            Builtin::Print | Builtin::Println => None,
            _ => Some(1),
        }
    }

    /// Invoke the builtin on already-evaluated arguments.
    pub fn call(self, args: &[Value], console: &mut Console, span: Span) -> EvalResult<Value> {
        if let Some(expected) = self.arity() {
            if args.len() != expected {
                return Err(EvalError::Arity {
                    callee: self.name().to_string(),
                    expected,
                    got: args.len(),
                    span,
                });
            }
        }
        let fail = |message: String| EvalError::Builtin {
            name: self.name(),
            message,
            span,
        };

        match self {
            Builtin::Print | Builtin::Println => {
                let mut chunk: String = args.iter().map(Value::to_string).collect();
                if self == Builtin::Println {
                    chunk.push('\n');
                }
                if !console.write(&chunk) {
                    return Err(fail(format!(
                        "console output exceeds the limit of {} bytes",
                        console.limit
                    )));
                }
                Ok(Value::Null)
            }
            Builtin::Type => Ok(Value::from(args[0].type_name())),
            Builtin::String => Ok(Value::String(args[0].to_string())),
            Builtin::Int => to_number(&args[0], true).map(Value::Number).map_err(fail),
            Builtin::Float => to_number(&args[0], false).map(Value::Number).map_err(fail),
            Builtin::Bool => to_bool(&args[0]).map(Value::Bool).map_err(fail),
            Builtin::ToMap => to_map(&args[0]).map_err(fail),
        }
    }
}

/// Numeric conversion shared by `int` and `float`. `int` truncates and only
/// parses integer strings.
fn to_number(value: &Value, truncate: bool) -> Result<f64, String> {
    let target = if truncate { "int" } else { "float" };
    let n = match value {
        Value::Number(n) => *n,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) if s == "true" => 1.0,
        Value::String(s) if s == "false" => 0.0,
        Value::String(s) => {
            let parsed = if truncate {
                s.parse::<i64>().ok().map(|n| n as f64)
            } else {
                s.parse::<f64>().ok()
            };
            parsed.ok_or_else(|| format!("'{s}' is not a valid {target}"))?
        }
        other => return Err(format!("cannot convert {} to {target}", other.type_name())),
    };
    if !n.is_finite() {
        return Err(format!("{} is not a finite number", crate::value::format_number(n)));
    }
    Ok(if truncate { n.trunc() } else { n })
}

fn to_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(*n != 0.0),
        Value::String(s) => match s.as_str() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err(format!("'{s}' is not a valid bool")),
        },
        other => Err(format!("cannot convert {} to bool", other.type_name())),
    }
}

fn to_map(value: &Value) -> Result<Value, String> {
    let Value::String(text) = value else {
        return Err(format!("expected a JSON string, got {}", value.type_name()));
    };
    let json: JsonValue =
        serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?;
    if !json.is_object() {
        return Err("JSON text must be an object".to_string());
    }
    Value::from_json(&json).ok_or_else(|| "number out of range".to_string())
}
