//! End-to-end pipeline tests.
//!
//! Tests verify the full pipeline: request → validate → lex → parse →
//! evaluate → response, including debug artifacts and every error stage.

use pretty_assertions::assert_eq;
use quan_engine::{Engine, EngineConfig, ExecuteRequest, ExecuteResponse};
use quan_types::{ErrorCode, ErrorKind, QuanError};
use serde_json::{json, Value as JsonValue};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn execute(request: ExecuteRequest) -> ExecuteResponse {
    Engine::default().execute(&request)
}

fn execute_program(program: &str) -> ExecuteResponse {
    execute(ExecuteRequest::new(program))
}

/// Execute and assert success, returning outputs as a JSON object.
fn outputs(program: &str) -> JsonValue {
    let resp = execute_program(program);
    assert!(resp.success, "unexpected failure: {:?}", resp.payload.error);
    JsonValue::Object(resp.payload.outputs)
}

/// Execute and return the reported error.
fn failure(request: ExecuteRequest) -> (ExecuteResponse, QuanError) {
    let resp = execute(request);
    assert!(!resp.success, "expected failure");
    assert_eq!(resp.message, "Fail to run program");
    let err = resp.payload.error.clone().expect("failed response without error");
    (resp, err)
}

// ══════════════════════════════════════════════════════════════════════════════
// Language behavior through the entry point
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_success_message() {
    let resp = execute_program("x = 1");
    assert!(resp.success);
    assert_eq!(resp.message, "Program executed successfully");
    assert!(resp.payload.error.is_none());
}

#[test]
fn test_member_mutation_through_alias() {
    let resp = execute_program("a = {x: {w: 40}}; print(a.x.w); a.x.w = 100; print(a.x.w)");
    assert!(resp.success);
    assert_eq!(resp.payload.console, "40100");
    assert_eq!(JsonValue::Object(resp.payload.outputs), json!({"a": {"x": {"w": 100}}}));
}

#[test]
fn test_template_interpolation() {
    let resp = execute_program("w = 40\nprintln('''w doubled is ${w * 2}''')");
    assert_eq!(resp.payload.console, "w doubled is 80\n");
}

#[test]
fn test_function_with_if_return() {
    let src = "fn f(x,y){ if (x>y) { return true } else { return false } }\na = f(5,9)\nb = f(9,5)";
    assert_eq!(outputs(src), json!({"a": false, "b": true}));
}

#[test]
fn test_string_concatenation() {
    let resp = execute(
        ExecuteRequest::new(r#"s = "hello " + x + " i love you""#)
            .with_vars(json!({"x": " this is a test"})),
    );
    assert!(resp.success);
    assert_eq!(
        resp.payload.outputs["s"],
        json!("hello  this is a test i love you")
    );
}

#[test]
fn test_vars_resolve_and_are_echoed() {
    let vars = json!({"price": 20, "user": {"name": "quan", "vip": true}, "note": null});
    let resp = execute(
        ExecuteRequest::new("total = price * 2\nname = user.name")
            .with_vars(vars.clone()),
    );
    assert!(resp.success);
    assert_eq!(resp.payload.inputs, vars);
    assert_eq!(
        JsonValue::Object(resp.payload.outputs),
        json!({
            "price": 20,
            "user": {"name": "quan", "vip": true},
            "note": null,
            "total": 40,
            "name": "quan"
        })
    );
}

#[test]
fn test_array_vars_are_indexable() {
    let resp = execute(
        ExecuteRequest::new("first = items[0]\nitems[1] = cfg.on ? 2 ^ 3 : 0")
            .with_vars(json!({"items": [5, 6], "cfg": {"on": true}})),
    );
    assert!(resp.success, "{:?}", resp.payload.error);
    assert_eq!(resp.payload.inputs["items"], json!([5, 6]));
    assert_eq!(resp.payload.outputs["items"], json!([5, 8]));
    assert_eq!(resp.payload.outputs["first"], json!(5));
}

#[test]
fn test_index_out_of_bounds() {
    let (_, err) = failure(ExecuteRequest::new("a = [1]\nb = a[3]"));
    assert_eq!(err.kind, ErrorKind::UndefinedPropertyError);
    assert_eq!(err.message, "index 3 out of bounds for 'a' (length 1)");
}

#[test]
fn test_functions_excluded_from_outputs() {
    assert_eq!(outputs("fn f() { return 2 }\ny = f()"), json!({"y": 2}));
}

#[test]
fn test_user_print_shadows_builtin() {
    let resp = execute_program("fn print(x) { return x + 1 }\nr = print(1)");
    assert!(resp.success);
    assert_eq!(resp.payload.console, "");
    assert_eq!(resp.payload.outputs["r"], json!(2));
}

#[test]
fn test_debug_mode_evaluates_identically() {
    let src = "a = 3 * 7\nprintln(a)";
    let release = execute_program(src);
    let debug = execute(ExecuteRequest::new(src).with_mode("DEBUG"));
    assert_eq!(release, debug);
}

// ══════════════════════════════════════════════════════════════════════════════
// Debug artifacts
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_tokens_artifact() {
    let resp = execute(ExecuteRequest::new("x = 1").with_debug("LEXER_TOKENS"));
    assert!(resp.success);
    assert!(resp.payload.ast.is_none());
    let tokens: JsonValue = serde_json::from_str(resp.payload.tokens.as_deref().unwrap()).unwrap();
    assert_eq!(tokens[0]["type"], json!("IDENTIFIER"));
    assert_eq!(tokens[0]["literal"], json!("x"));
    assert_eq!(tokens[0]["line"], json!(1));
    assert_eq!(tokens[0]["column"], json!(1));
    assert_eq!(tokens[1]["type"], json!("ASSIGN"));
    assert_eq!(tokens.as_array().unwrap().last().unwrap()["type"], json!("EOF"));
}

#[test]
fn test_ast_artifact() {
    let resp = execute(ExecuteRequest::new("x = 1").with_debug("AST_TREE"));
    assert!(resp.payload.tokens.is_none());
    let ast: JsonValue = serde_json::from_str(resp.payload.ast.as_deref().unwrap()).unwrap();
    assert_eq!(ast["type"], json!("Program"));
    assert_eq!(ast["statements"][0]["type"], json!("Assignment"));
}

#[test]
fn test_parser_tree_alias() {
    let resp = execute(ExecuteRequest::new("x = 1").with_debug("PARSER_TREE"));
    assert!(resp.payload.ast.is_some());
}

#[test]
fn test_artifacts_only_for_completed_stages() {
    let req = ExecuteRequest::new("x = (1")
        .with_debug("LEXER_TOKENS")
        .with_debug("AST_TREE");
    let (resp, err) = failure(req);
    assert_eq!(err.kind, ErrorKind::ParseError);
    assert!(resp.payload.tokens.is_some());
    assert!(resp.payload.ast.is_none());

    let req = ExecuteRequest::new("x = \"open").with_debug("LEXER_TOKENS");
    let (resp, err) = failure(req);
    assert_eq!(err.kind, ErrorKind::LexError);
    assert!(resp.payload.tokens.is_none());
}

#[test]
fn test_artifacts_kept_on_runtime_failure() {
    let req = ExecuteRequest::new("println(\"hi\")\ny = nope").with_debug("AST_TREE");
    let (resp, err) = failure(req);
    assert_eq!(err.kind, ErrorKind::UndefinedVariableError);
    assert!(resp.payload.ast.is_some());
    assert_eq!(resp.payload.console, "hi\n");
}

// ══════════════════════════════════════════════════════════════════════════════
// Error stages
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_lex_error() {
    let (_, err) = failure(ExecuteRequest::new("x = \"abc"));
    assert_eq!(err.code, ErrorCode::UNTERMINATED_STRING);
    assert_eq!(err.kind, ErrorKind::LexError);
    assert_eq!(err.span.map(|s| (s.start_line, s.start_col)), Some((1, 5)));
}

#[test]
fn test_parse_error() {
    let (_, err) = failure(ExecuteRequest::new("a = 1 < 2 < 3"));
    assert_eq!(err.code, ErrorCode::CHAINED_COMPARISON);
    assert_eq!(err.kind, ErrorKind::ParseError);
}

#[test]
fn test_long_chains_are_parse_errors() {
    let n = 100_000;
    for program in [
        format!("x = {}1", "-".repeat(n)),
        format!("x = a{}", ".b".repeat(n)),
        format!("x = f{}", "()".repeat(n)),
    ] {
        let (_, err) = failure(ExecuteRequest::new(program));
        assert_eq!(err.code, ErrorCode::NESTING_LIMIT_EXCEEDED);
        assert_eq!(err.kind, ErrorKind::ParseError);
    }
}

#[test]
fn test_runtime_error_json_shape() {
    let resp = execute_program("println(\"before\")\nprintln(missing)");
    let value: JsonValue = serde_json::from_str(&resp.to_json()).unwrap();
    assert_eq!(
        value,
        json!({
            "success": false,
            "message": "Fail to run program",
            "payload": {
                "program": "println(\"before\")\nprintln(missing)",
                "inputs": {},
                "outputs": {},
                "console": "before\n",
                "error": {
                    "code": 300,
                    "kind": "UndefinedVariableError",
                    "message": "undefined variable 'missing'",
                    "line": 2,
                    "column": 9,
                    "end_line": 2,
                    "end_column": 15,
                    "source_line": "println(missing)"
                }
            }
        })
    );
}

#[test]
fn test_recursion_limit() {
    let (_, err) = failure(ExecuteRequest::new("fn loop(n) { return loop(n + 1) }\nloop(0)"));
    assert_eq!(err.kind, ErrorKind::RecursionLimitError);
    assert_eq!(err.message, "maximum call depth of 200 exceeded");
    assert!(err.suggestion.is_some());
}

#[test]
fn test_configured_console_limit() {
    let engine = Engine::new(EngineConfig::default().with_max_console_bytes(5));
    let resp = engine.execute(&ExecuteRequest::new("print(\"1234\")\nprint(\"56\")"));
    assert!(!resp.success);
    assert_eq!(resp.payload.console, "1234");
    assert_eq!(resp.payload.error.unwrap().kind, ErrorKind::BuiltinError);
}

// ══════════════════════════════════════════════════════════════════════════════
// Boundary validation
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_unknown_mode() {
    let (resp, err) = failure(ExecuteRequest::new("print(1)").with_mode("TURBO"));
    assert_eq!(err.code, ErrorCode::UNKNOWN_MODE);
    assert_eq!(err.kind, ErrorKind::BoundaryError);
    assert!(err.span.is_none());
    assert_eq!(resp.payload.console, "");
    assert_eq!(resp.payload.program, "print(1)");
}

#[test]
fn test_unknown_debug_level() {
    let (_, err) = failure(ExecuteRequest::new("x = 1").with_debug("BYTECODE"));
    assert_eq!(err.code, ErrorCode::UNKNOWN_DEBUG_LEVEL);
}

#[test]
fn test_list_vars_rejected_before_lexing() {
    // The program would fail to lex; validation must win.
    let req = ExecuteRequest::new("x = \"open").with_vars(json!([1, 2]));
    let (resp, err) = failure(req);
    assert_eq!(err.code, ErrorCode::UNSUPPORTED_VAR);
    assert_eq!(err.kind, ErrorKind::BoundaryError);
    assert_eq!(resp.payload.inputs, json!([1, 2]));
}

#[test]
fn test_non_object_vars_rejected() {
    let (_, err) = failure(ExecuteRequest::new("x = 1").with_vars(json!("nope")));
    assert_eq!(err.code, ErrorCode::UNSUPPORTED_VAR);
}

// ══════════════════════════════════════════════════════════════════════════════
// JSON entry point
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_execute_json_round_trip() {
    let engine = Engine::default();
    let body = engine.execute_json(
        r#"{"program": "z = 1\na = 2\nprintln(z + a)", "vars": {}, "debugLv": []}"#,
    );
    assert!(body.contains(r#""outputs":{"z":1,"a":2}"#), "{body}");
    let resp: ExecuteResponse = serde_json::from_str(&body).unwrap();
    assert!(resp.success);
    assert_eq!(resp.payload.console, "3\n");
}

#[test]
fn test_execute_json_rejects_bad_json() {
    let body = Engine::default().execute_json("{ not json");
    let value: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(value["success"], json!(false));
    assert_eq!(value["payload"]["error"]["code"], json!(400));
    assert_eq!(value["payload"]["error"]["kind"], json!("BoundaryError"));
}

#[test]
fn test_execute_json_rejects_wrongly_typed_fields() {
    let body = Engine::default().execute_json(r#"{"program": 5}"#);
    let resp: ExecuteResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(resp.payload.error.unwrap().code, ErrorCode::INVALID_REQUEST);
}

// ══════════════════════════════════════════════════════════════════════════════
// Determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_determinism_100_iterations() {
    let request = ExecuteRequest::new("a = x * 3 + 1\nb = a / 4\nprintln(a, \" \", b)")
        .with_vars(json!({"x": 11}))
        .with_debug("LEXER_TOKENS")
        .with_debug("AST_TREE");
    let engine = Engine::default();
    let first = engine.execute(&request).to_json();
    for i in 0..100 {
        let again = engine.execute(&request).to_json();
        assert_eq!(first, again, "response diverged at iteration {i}");
    }
}
