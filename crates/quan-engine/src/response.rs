//! The `execute` response.
//!
//! Serializes to exactly the JSON body hosts hand back to callers.

use crate::error::EngineError;
use quan_types::QuanError;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

pub const SUCCESS_MESSAGE: &str = "Program executed successfully";
pub const FAILURE_MESSAGE: &str = "Fail to run program";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub message: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Program source, echoed.
    pub program: String,
    /// The request's `vars`, echoed.
    pub inputs: JsonValue,
    /// Root bindings after evaluation, functions excluded.
    pub outputs: JsonMap<String, JsonValue>,
    /// Text written by `print`/`println`.
    pub console: String,
    /// Token stream as a JSON string, when `LEXER_TOKENS` was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<String>,
    /// AST as a JSON string, when `AST_TREE` was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ast: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<QuanError>,
}

impl ExecuteResponse {
    /// Build a response; it is successful exactly when `payload.error` is empty.
    pub fn from_payload(payload: Payload) -> Self {
        let success = payload.error.is_none();
        Self {
            success,
            message: if success { SUCCESS_MESSAGE } else { FAILURE_MESSAGE }.to_string(),
            payload,
        }
    }

    /// A failure response for a request that could not be decoded.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::from_payload(Payload {
            inputs: JsonValue::Object(JsonMap::new()),
            error: Some(EngineError::InvalidRequest(reason.into()).into_diagnostic()),
            ..Payload::default()
        })
    }

    /// Serialize to the JSON body.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"success":false,"message":"{FAILURE_MESSAGE}","payload":{{"error":{{"message":"Serialization error: {}"}}}}}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}
