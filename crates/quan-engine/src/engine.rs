//! The engine handle and the execute pipeline.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::request::{validate, ExecuteRequest, Mode, ValidatedRequest};
use crate::response::{ExecuteResponse, Payload};
use quan_eval::evaluate;
use quan_lexer::Lexer;
use quan_parser::Parser;
use quan_types::SourceFile;
use serde_json::Map as JsonMap;

/// Name given to the program source in diagnostics.
pub const PROGRAM_FILE_NAME: &str = "main.qlang";

/// An engine handle.
///
/// Holds only immutable configuration, so one handle can serve any number
/// of `execute` calls; each call builds a fresh evaluator.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one request through validation, lexing, parsing and evaluation.
    ///
    /// Never fails: every error is reported inside the response, together
    /// with whatever console text and debug artifacts were produced first.
    #[tracing::instrument(level = "debug", skip_all, fields(program_len = request.program.len()))]
    pub fn execute(&self, request: &ExecuteRequest) -> ExecuteResponse {
        let mut payload = Payload {
            program: request.program.clone(),
            inputs: request.inputs(),
            outputs: JsonMap::new(),
            ..Payload::default()
        };

        if let Err(err) = self.run(request, &mut payload) {
            let err = err.into_diagnostic();
            tracing::warn!(code = %err.code, kind = %err.kind, "execution failed: {}", err.message);
            payload.error = Some(err);
        }
        ExecuteResponse::from_payload(payload)
    }

    /// Decode a JSON request, execute it and encode the response.
    pub fn execute_json(&self, request_json: &str) -> String {
        match serde_json::from_str::<ExecuteRequest>(request_json) {
            Ok(request) => self.execute(&request).to_json(),
            Err(e) => {
                tracing::warn!("rejected undecodable request: {e}");
                ExecuteResponse::invalid_request(e.to_string()).to_json()
            }
        }
    }

    fn run(&self, request: &ExecuteRequest, payload: &mut Payload) -> EngineResult<()> {
        let ValidatedRequest {
            mode,
            debug,
            globals,
        } = validate(request)?;
        let verbose = mode == Mode::Debug;
        if verbose {
            tracing::info!(%mode, vars = globals.len(), "executing program");
        }

        let source = SourceFile::new(PROGRAM_FILE_NAME, request.program.as_str());

        let lexed = Lexer::new(&source).lex();
        if let Some(err) = lexed.errors.into_first() {
            return Err(err.into());
        }
        tracing::debug!(tokens = lexed.tokens.len(), "lexed");
        if debug.lexer_tokens {
            payload.tokens = Some(serde_json::to_string(&lexed.tokens).map_err(|source| {
                EngineError::Serialization {
                    what: "tokens",
                    source,
                }
            })?);
        }

        let parsed = Parser::new(lexed.tokens, &source).parse();
        let program = match (parsed.program, parsed.errors.into_first()) {
            (Some(program), None) => program,
            (_, Some(err)) => return Err(err.into()),
            (None, None) => {
                return Err(EngineError::InvalidRequest(
                    "parser produced no program".to_string(),
                ))
            }
        };
        tracing::debug!(statements = program.statements.len(), "parsed");
        if debug.ast_tree {
            payload.ast = Some(serde_json::to_string(&program).map_err(|source| {
                EngineError::Serialization { what: "ast", source }
            })?);
        }

        let evaluation = evaluate(&program, globals, self.config.limits());
        payload.outputs = evaluation.outputs;
        payload.console = evaluation.console;
        if verbose {
            tracing::info!(
                outputs = payload.outputs.len(),
                console_bytes = payload.console.len(),
                "evaluation finished"
            );
        }
        match evaluation.error {
            Some(err) => Err(err.to_diagnostic(&source).into()),
            None => Ok(()),
        }
    }
}
