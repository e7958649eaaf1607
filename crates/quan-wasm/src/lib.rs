//! QuanLang engine as a WASM module for browser hosts.
//!
//! The host loads the module, constructs an [`Engine`] and calls it
//! explicitly; nothing is installed on the global object.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { Engine } from 'quan-wasm';
//!
//! await init();
//!
//! const engine = new Engine('{"maxCallDepth": 500}');
//! const result = engine.execute({
//!   mode: "RELEASE",
//!   program: "w = 40\nprintln('''${w * 2}''')",
//!   vars: {},
//!   debugLv: ["AST_TREE"],
//! });
//! console.log(result.payload.console); // "80\n"
//! ```

use quan_engine::{EngineConfig, ExecuteRequest, ExecuteResponse};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// A reusable engine handle.
#[wasm_bindgen]
pub struct Engine {
    inner: quan_engine::Engine,
}

#[wasm_bindgen]
impl Engine {
    /// Create an engine, optionally from a JSON configuration such as
    /// `{"maxCallDepth": 500, "maxConsoleBytes": 65536}`.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<Engine, JsError> {
        let config = match config_json.as_deref() {
            Some(json) => EngineConfig::from_json(json).map_err(|e| JsError::new(&e.to_string()))?,
            None => EngineConfig::default(),
        };
        Ok(Engine {
            inner: quan_engine::Engine::new(config),
        })
    }

    /// Execute a request object and return the response object.
    ///
    /// A request that does not decode still yields a response, with a
    /// `BoundaryError` in `payload.error`.
    pub fn execute(&self, request: JsValue) -> Result<JsValue, JsError> {
        let response = match serde_wasm_bindgen::from_value::<ExecuteRequest>(request) {
            Ok(request) => self.inner.execute(&request),
            Err(e) => ExecuteResponse::invalid_request(e.to_string()),
        };
        response
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Execute a request given as a JSON string; returns the response as a
    /// JSON string.
    #[wasm_bindgen(js_name = executeJson)]
    pub fn execute_json(&self, request_json: &str) -> String {
        self.inner.execute_json(request_json)
    }

    /// The active configuration as a JSON string.
    #[wasm_bindgen(js_name = configJson)]
    pub fn config_json(&self) -> String {
        serde_json::to_string(self.inner.config()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Return the engine version string.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    fn default_engine() -> Engine {
        match Engine::new(None) {
            Ok(engine) => engine,
            Err(_) => panic!("default engine construction failed"),
        }
    }

    #[test]
    fn test_execute_json_without_config() {
        let engine = default_engine();
        let body = engine.execute_json(r#"{"program": "x = 2 * 21"}"#);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["success"], serde_json::json!(true));
        assert_eq!(value["payload"]["outputs"]["x"], serde_json::json!(42));
    }

    #[test]
    fn test_default_config_json() {
        let engine = default_engine();
        assert_eq!(
            engine.config_json(),
            r#"{"maxCallDepth":200,"maxConsoleBytes":1048576}"#
        );
    }

    #[test]
    fn test_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }
}
