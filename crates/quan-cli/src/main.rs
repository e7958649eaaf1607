//! `quan`: run a QuanLang program from the command line.
//!
//! ```text
//! quan -i program.qlang [-mode RELEASE|DEBUG] [-envs '{"x": 1}']
//!      [--json] [--max-depth N] [--debug LEXER_TOKENS|AST_TREE]
//! ```
//!
//! Prints the console text, or the full response with `--json`. Exits with
//! status 1 when the program fails.

use quan_engine::{Engine, EngineConfig, ExecuteRequest, ExecuteResponse};
use quan_types::QuanError;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Parsed command-line options.
#[derive(Debug, Default, PartialEq)]
struct Options {
    input: String,
    mode: Option<String>,
    envs: Option<String>,
    json: bool,
    max_depth: Option<usize>,
    debug: Vec<String>,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };
    init_tracing(options.mode.as_deref() == Some("DEBUG"));

    match run(&options) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!("Usage: quan -i <file> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -i <file>            Program to execute");
    eprintln!("  -mode <MODE>         RELEASE (default) or DEBUG");
    eprintln!("  -envs <json>         Variables as a JSON object (default: {{}})");
    eprintln!("  --json               Print the full JSON response");
    eprintln!("  --max-depth <n>      Maximum call depth (default: 200)");
    eprintln!("  --debug <LEVEL>      Include LEXER_TOKENS or AST_TREE in the response");
}

/// Parse arguments (without the program name). Flags taking a value
/// accept both `-flag value` and `-flag=value`.
fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut input = None;
    let mut i = 0;
    while i < args.len() {
        let (flag, inline) = match args[i].split_once('=') {
            Some((flag, value)) if flag.starts_with('-') => (flag, Some(value.to_string())),
            _ => (args[i].as_str(), None),
        };
        let takes_value = matches!(
            flag,
            "-i" | "-mode" | "--mode" | "-envs" | "--envs" | "--max-depth" | "--debug"
        );
        let value = if !takes_value {
            None
        } else if inline.is_some() {
            inline
        } else {
            i += 1;
            Some(
                args.get(i)
                    .cloned()
                    .ok_or_else(|| format!("missing value for '{flag}'"))?,
            )
        };

        match (flag, value) {
            ("-i", Some(v)) => input = Some(v),
            ("-mode" | "--mode", Some(v)) => options.mode = Some(v),
            ("-envs" | "--envs", Some(v)) => options.envs = Some(v),
            ("--max-depth", Some(v)) => {
                let depth = v
                    .parse()
                    .map_err(|_| format!("invalid --max-depth '{v}'"))?;
                options.max_depth = Some(depth);
            }
            ("--debug", Some(v)) => options.debug.push(v),
            ("--json", None) => options.json = true,
            (other, _) => return Err(format!("unknown option '{other}'")),
        }
        i += 1;
    }
    options.input = input.ok_or("missing required option '-i <file>'")?;
    Ok(options)
}

fn init_tracing(debug_mode: bool) {
    let default = if debug_mode { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Execute the program. Returns whether it succeeded.
fn run(options: &Options) -> Result<bool, String> {
    let program = std::fs::read_to_string(&options.input)
        .map_err(|e| format!("cannot read '{}': {e}", options.input))?;

    let mut request = ExecuteRequest::new(program);
    request.mode = options.mode.clone();
    request.debug_lv = options.debug.clone();
    if let Some(envs) = &options.envs {
        let vars = serde_json::from_str(envs).map_err(|e| format!("invalid -envs JSON: {e}"))?;
        request = request.with_vars(vars);
    }

    let mut config = EngineConfig::default();
    if let Some(depth) = options.max_depth {
        config = config.with_max_call_depth(depth);
    }
    tracing::debug!(file = %options.input, "running");
    let response = Engine::new(config).execute(&request);

    if options.json {
        println!("{}", response.to_json());
    } else {
        print_console(&response);
    }
    Ok(response.success)
}

fn print_console(response: &ExecuteResponse) {
    print!("{}", response.payload.console);
    if let Some(err) = &response.payload.error {
        if !response.payload.console.is_empty() && !response.payload.console.ends_with('\n') {
            println!();
        }
        eprintln!("{}", render_error(err));
    }
}

/// Format an error with its source line and a caret under the span.
fn render_error(err: &QuanError) -> String {
    let mut out = format!("{}[{}]: {}", err.kind, err.code, err.message);
    if let (Some(span), Some(line)) = (err.span, &err.source_line) {
        let gutter = span.start_line.to_string();
        let pad = " ".repeat(gutter.len());
        let width = if span.end_line == span.start_line {
            (span.end_col.saturating_sub(span.start_col) + 1) as usize
        } else {
            1
        };
        out.push_str(&format!("\n{pad}--> {}:{}", span.start_line, span.start_col));
        out.push_str(&format!("\n{pad} |\n{gutter} | {line}"));
        out.push_str(&format!(
            "\n{pad} | {}{}",
            " ".repeat(span.start_col.saturating_sub(1) as usize),
            "^".repeat(width)
        ));
    }
    if let Some(suggestion) = &err.suggestion {
        out.push_str(&format!("\n  = help: {suggestion}"));
    }
    out
}
