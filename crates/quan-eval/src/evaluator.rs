//! Core expression and statement evaluator.

use crate::builtins::{Builtin, Console, DEFAULT_CONSOLE_LIMIT};
use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::stack::ensure_sufficient_stack;
use crate::value::{format_number, Closure, Value};
use indexmap::IndexMap;
use quan_types::ast::*;
use quan_types::Span;
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Default bound on nested user function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Resource limits for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    pub max_call_depth: usize,
    pub max_console_bytes: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_console_bytes: DEFAULT_CONSOLE_LIMIT,
        }
    }
}

/// How a statement finished.
#[derive(Debug)]
pub enum Flow {
    /// Fall through to the next statement.
    Normal,
    /// A `return` is unwinding to the nearest function boundary.
    Return(Value),
}

/// Everything a finished evaluation produced.
#[derive(Debug)]
pub struct Evaluation {
    /// Root bindings in insertion order, functions excluded.
    pub outputs: JsonMap<String, JsonValue>,
    /// Console text, including output written before a failure.
    pub console: String,
    /// The error that halted the program, if any.
    pub error: Option<EvalError>,
}

/// Run `program` against `globals` and collect its results.
///
/// The root environment is cleared afterwards so closures stored in it
/// release the scopes they captured.
pub fn evaluate(program: &Program, globals: Environment, limits: EvalLimits) -> Evaluation {
    let mut evaluator = Evaluator::with_globals(globals, limits);
    let error = evaluator.run(program).err();
    let outputs = evaluator.outputs();
    let globals = evaluator.globals.clone();
    let console = evaluator.console.into_text();
    globals.clear();
    Evaluation {
        outputs,
        console,
        error,
    }
}

/// The tree-walking evaluator.
pub struct Evaluator {
    /// Root scope; external variables and top-level assignments live here.
    globals: Environment,
    console: Console,
    /// Number of user function calls currently active.
    depth: usize,
    limits: EvalLimits,
}

impl Evaluator {
    pub fn new(limits: EvalLimits) -> Self {
        Self::with_globals(Environment::new(), limits)
    }

    pub fn with_globals(globals: Environment, limits: EvalLimits) -> Self {
        Self {
            globals,
            console: Console::new(limits.max_console_bytes),
            depth: 0,
            limits,
        }
    }

    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    /// Bind an external variable in the root scope.
    pub fn define_global(&self, name: impl Into<String>, value: Value) {
        self.globals.define(name, value);
    }

    /// Console text written so far.
    pub fn console(&self) -> &str {
        self.console.text()
    }

    /// Root bindings as JSON, in insertion order, skipping functions.
    pub fn outputs(&self) -> JsonMap<String, JsonValue> {
        self.globals
            .bindings()
            .into_iter()
            .filter(|(_, v)| !v.is_function())
            .map(|(k, v)| (k, v.to_json()))
            .collect()
    }

    /// Execute every top-level statement. A top-level `return` stops the
    /// program without error.
    #[tracing::instrument(level = "debug", skip_all, fields(statements = program.statements.len()))]
    pub fn run(&mut self, program: &Program) -> EvalResult<()> {
        let globals = self.globals.clone();
        for stmt in &program.statements {
            if let Flow::Return(_) = self.exec_stmt(stmt, &globals)? {
                tracing::debug!("top-level return");
                break;
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    /// Execute a block's statements directly in `env`.
    fn exec_block(&mut self, block: &Block, env: &Environment) -> EvalResult<Flow> {
        for stmt in &block.statements {
            let flow = self.exec_stmt(stmt, env)?;
            if let Flow::Return(_) = flow {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &Environment) -> EvalResult<Flow> {
        match stmt {
            Stmt::Assignment(assign) => {
                self.exec_assignment(assign, env)?;
                Ok(Flow::Normal)
            }
            Stmt::FunctionDecl(decl) => {
                if let Some(name) = &decl.name {
                    env.define(name.name.clone(), Value::function(decl.clone(), env.clone()));
                }
                Ok(Flow::Normal)
            }
            Stmt::If(if_stmt) => self.exec_if(if_stmt, env),
            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Block(block) => ensure_sufficient_stack(|| self.exec_block(block, &env.child())),
            Stmt::Expr(expr_stmt) => {
                self.eval_expr(&expr_stmt.expr, env)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn exec_if(&mut self, stmt: &IfStmt, env: &Environment) -> EvalResult<Flow> {
        let condition = match self.eval_expr(&stmt.condition, env)? {
            Value::Bool(b) => b,
            other => {
                return Err(EvalError::type_mismatch(
                    format!("if condition must be bool, got {}", other.type_name()),
                    stmt.condition.span,
                ))
            }
        };
        let branch = if condition {
            Some(&stmt.then_block)
        } else {
            stmt.else_block.as_ref()
        };
        match branch {
            Some(block) => ensure_sufficient_stack(|| self.exec_block(block, &env.child())),
            None => Ok(Flow::Normal),
        }
    }

    /// `name = v` rebinds; `a.b.c = v` and `a.items[0] = v` mutate the map
    /// or array reached through the path. The right-hand side is evaluated
    /// first, then index expressions left to right.
    fn exec_assignment(&mut self, assign: &Assignment, env: &Environment) -> EvalResult<()> {
        let value = self.eval_expr(&assign.value, env)?;
        let target = &assign.target;
        let Some((last, prefix)) = target.path.split_last() else {
            env.assign(&target.root.name, value);
            return Ok(());
        };

        let mut current = self.eval_identifier(&target.root.name, target.root.span, env)?;
        let mut walked = target.root.name.clone();
        for step in prefix {
            current = match step {
                AccessStep::Field { name } => {
                    let next = read_member(&current, name, &walked)?;
                    walked.push('.');
                    walked.push_str(&name.name);
                    next
                }
                AccessStep::Index { index } => {
                    let key = self.eval_expr(index, env)?;
                    let next = read_index(&current, &key, &walked, index.span)?;
                    walked.push_str(&format!("[{}]", key.to_json()));
                    next
                }
            };
        }

        match last {
            AccessStep::Field { name } => match current {
                Value::Map(map) => {
                    map.borrow_mut().insert(name.name.clone(), value);
                    Ok(())
                }
                other => Err(EvalError::undefined_property(
                    format!(
                        "cannot set property '{}' on {} '{}'",
                        name.name,
                        other.type_name(),
                        walked
                    ),
                    name.span,
                )),
            },
            AccessStep::Index { index } => {
                let key = self.eval_expr(index, env)?;
                write_index(&current, &key, value, &walked, index.span)
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a Value.
    pub fn eval_expr(&mut self, expr: &Expr, env: &Environment) -> EvalResult<Value> {
        ensure_sufficient_stack(|| self.eval_expr_inner(expr, env))
    }

    fn eval_expr_inner(&mut self, expr: &Expr, env: &Environment) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Literal { value } => Ok(match value {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
            }),
            ExprKind::TemplateString { parts } => self.eval_template(parts, env),
            ExprKind::ObjectLiteral { fields } => {
                let mut map = IndexMap::with_capacity(fields.len());
                for field in fields {
                    let value = self.eval_expr(&field.value, env)?;
                    map.insert(field.key.name.clone(), value);
                }
                Ok(Value::from_map(map))
            }
            ExprKind::Identifier { name } => self.eval_identifier(name, expr.span, env),
            ExprKind::MemberAccess { object, field } => {
                let base = self.eval_expr(object, env)?;
                read_member(&base, field, &describe(object))
            }
            ExprKind::ArrayLiteral { elements } => {
                let items = self.eval_args(elements, env)?;
                Ok(Value::from_vec(items))
            }
            ExprKind::Index { object, index } => {
                let base = self.eval_expr(object, env)?;
                let key = self.eval_expr(index, env)?;
                read_index(&base, &key, &describe(object), index.span)
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => match self.eval_expr(condition, env)? {
                Value::Bool(true) => self.eval_expr(then_expr, env),
                Value::Bool(false) => self.eval_expr(else_expr, env),
                other => Err(EvalError::type_mismatch(
                    format!("ternary condition must be bool, got {}", other.type_name()),
                    condition.span,
                )),
            },
            ExprKind::Call { callee, args } => self.eval_call(callee, args, expr.span, env),
            ExprKind::Binary { op, left, right } => {
                let lv = self.eval_expr(left, env)?;
                let rv = self.eval_expr(right, env)?;
                eval_binary(*op, lv, rv, expr.span)
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand, env)?;
                match (op, value) {
                    (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnaryOp::Neg, other) => Err(EvalError::type_mismatch(
                        format!("cannot negate {}", other.type_name()),
                        expr.span,
                    )),
                }
            }
            ExprKind::Function { decl } => Ok(Value::function(decl.clone(), env.clone())),
        }
    }

    fn eval_identifier(&self, name: &str, span: Span, env: &Environment) -> EvalResult<Value> {
        env.get(name).ok_or_else(|| EvalError::UndefinedVariable {
            name: name.to_string(),
            span,
        })
    }

    /// Template parts are concatenated in order; embedded expressions are
    /// evaluated every time the template runs.
    fn eval_template(&mut self, parts: &[TemplatePart], env: &Environment) -> EvalResult<Value> {
        let mut result = String::new();
        for part in parts {
            match part {
                TemplatePart::Literal { text } => result.push_str(text),
                TemplatePart::Expr { expr } => {
                    let value = self.eval_expr(expr, env)?;
                    result.push_str(&value.to_string());
                }
            }
        }
        Ok(Value::String(result))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        span: Span,
        env: &Environment,
    ) -> EvalResult<Value> {
        if let ExprKind::Identifier { name } = &callee.kind {
            if env.get(name).is_none() {
                if let Some(builtin) = Builtin::lookup(name) {
                    let args = self.eval_args(args, env)?;
                    return builtin.call(&args, &mut self.console, span);
                }
            }
        }

        let target = self.eval_expr(callee, env)?;
        let args = self.eval_args(args, env)?;
        match target {
            Value::Function(closure) => self.call_function(&closure, args, span),
            other => Err(EvalError::type_mismatch(
                format!("{} '{}' is not callable", other.type_name(), describe(callee)),
                callee.span,
            )),
        }
    }

    fn eval_args(&mut self, args: &[Expr], env: &Environment) -> EvalResult<Vec<Value>> {
        args.iter().map(|arg| self.eval_expr(arg, env)).collect()
    }

    /// Call a function value. Parameters are bound in one fresh scope whose
    /// parent is the environment the function was created in.
    pub fn call_function(
        &mut self,
        closure: &Closure,
        args: Vec<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        let decl = &closure.decl;
        if args.len() != decl.params.len() {
            return Err(EvalError::Arity {
                callee: decl.display_name().to_string(),
                expected: decl.params.len(),
                got: args.len(),
                span,
            });
        }
        if self.depth >= self.limits.max_call_depth {
            return Err(EvalError::RecursionLimit {
                limit: self.limits.max_call_depth,
                span,
            });
        }

        let local = closure.env.child();
        for (param, arg) in decl.params.iter().zip(args) {
            local.define(param.name.clone(), arg);
        }

        self.depth += 1;
        tracing::trace!(function = decl.display_name(), depth = self.depth, "call");
        let result = ensure_sufficient_stack(|| self.exec_block(&decl.body, &local));
        self.depth -= 1;

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Null),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════

/// Read `field` from `base`, where `base_name` describes `base` in messages.
fn read_member(base: &Value, field: &Ident, base_name: &str) -> EvalResult<Value> {
    match base {
        Value::Map(map) => map.borrow().get(&field.name).cloned().ok_or_else(|| {
            EvalError::undefined_property(
                format!("undefined property '{}' on '{}'", field.name, base_name),
                field.span,
            )
        }),
        other => Err(EvalError::undefined_property(
            format!(
                "cannot read property '{}' of {} '{}'",
                field.name,
                other.type_name(),
                base_name
            ),
            field.span,
        )),
    }
}

/// Read `base[key]`: an array element by integer position, or a map entry
/// by string key.
fn read_index(base: &Value, key: &Value, base_name: &str, span: Span) -> EvalResult<Value> {
    match (base, key) {
        (Value::Array(items), _) => {
            let items = items.borrow();
            let position = array_position(key, items.len(), base_name, span)?;
            Ok(items[position].clone())
        }
        (Value::Map(map), Value::String(name)) => {
            map.borrow().get(name).cloned().ok_or_else(|| {
                EvalError::undefined_property(
                    format!("undefined property '{}' on '{}'", name, base_name),
                    span,
                )
            })
        }
        _ => Err(not_indexable(base, key, base_name, span)),
    }
}

/// Store `value` at `base[key]`. Arrays do not grow: the position must
/// already exist.
fn write_index(
    base: &Value,
    key: &Value,
    value: Value,
    base_name: &str,
    span: Span,
) -> EvalResult<()> {
    match (base, key) {
        (Value::Array(items), _) => {
            let len = items.borrow().len();
            let position = array_position(key, len, base_name, span)?;
            items.borrow_mut()[position] = value;
            Ok(())
        }
        (Value::Map(map), Value::String(name)) => {
            map.borrow_mut().insert(name.clone(), value);
            Ok(())
        }
        _ => Err(not_indexable(base, key, base_name, span)),
    }
}

/// Validate `key` as a position in an array of `len` elements.
fn array_position(key: &Value, len: usize, base_name: &str, span: Span) -> EvalResult<usize> {
    let n = match key {
        Value::Number(n) if n.fract() == 0.0 => *n,
        other => {
            return Err(EvalError::type_mismatch(
                format!("array index must be an integer, got {}", describe_index(other)),
                span,
            ))
        }
    };
    if n < 0.0 || n >= len as f64 {
        return Err(EvalError::undefined_property(
            format!(
                "index {} out of bounds for '{}' (length {})",
                format_number(n),
                base_name,
                len
            ),
            span,
        ));
    }
    Ok(n as usize)
}

fn describe_index(key: &Value) -> String {
    match key {
        Value::Number(n) => format_number(*n),
        other => other.type_name().to_string(),
    }
}

fn not_indexable(base: &Value, key: &Value, base_name: &str, span: Span) -> EvalError {
    EvalError::type_mismatch(
        format!(
            "cannot index {} '{}' with {}",
            base.type_name(),
            base_name,
            key.type_name()
        ),
        span,
    )
}

/// Short source-like description of an expression for error messages.
fn describe(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Identifier { name } => name.clone(),
        ExprKind::MemberAccess { object, field } => format!("{}.{}", describe(object), field.name),
        ExprKind::Call { callee, .. } => format!("{}(...)", describe(callee)),
        ExprKind::Index { object, .. } => format!("{}[...]", describe(object)),
        ExprKind::Function { decl } => format!("fn {}", decl.display_name()),
        ExprKind::Literal { .. } => "literal".to_string(),
        ExprKind::TemplateString { .. } => "template string".to_string(),
        ExprKind::ObjectLiteral { .. } => "object literal".to_string(),
        ExprKind::ArrayLiteral { .. } => "array literal".to_string(),
        ExprKind::Binary { .. } | ExprKind::Unary { .. } | ExprKind::Ternary { .. } => {
            "expression".to_string()
        }
    }
}

fn eval_binary(op: BinOp, lv: Value, rv: Value, span: Span) -> EvalResult<Value> {
    let result = match op {
        BinOp::Eq => Value::Bool(lv.equals(&rv)),
        BinOp::NotEq => Value::Bool(!lv.equals(&rv)),
        BinOp::Add => match (&lv, &rv) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            _ => Value::String(format!("{lv}{rv}")),
        },
        BinOp::Sub => {
            let (a, b) = numbers(op, &lv, &rv, span)?;
            Value::Number(a - b)
        }
        BinOp::Mul => {
            let (a, b) = numbers(op, &lv, &rv, span)?;
            Value::Number(a * b)
        }
        BinOp::Pow => {
            let (a, b) = numbers(op, &lv, &rv, span)?;
            Value::Number(a.powf(b))
        }
        BinOp::Div | BinOp::Mod => {
            let (a, b) = numbers(op, &lv, &rv, span)?;
            if b == 0.0 {
                let what = if op == BinOp::Div { "division" } else { "modulo" };
                return Err(EvalError::Arithmetic {
                    message: format!("{what} by zero"),
                    span,
                });
            }
            Value::Number(if op == BinOp::Div { a / b } else { a % b })
        }
        BinOp::Less | BinOp::Greater | BinOp::LessEq | BinOp::GreaterEq => {
            let (a, b) = numbers(op, &lv, &rv, span)?;
            Value::Bool(match op {
                BinOp::Less => a < b,
                BinOp::Greater => a > b,
                BinOp::LessEq => a <= b,
                _ => a >= b,
            })
        }
    };
    Ok(result)
}

/// Both operands of a numeric operator, or a type mismatch.
fn numbers(op: BinOp, lv: &Value, rv: &Value, span: Span) -> EvalResult<(f64, f64)> {
    match (lv, rv) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(EvalError::type_mismatch(
            format!(
                "operator '{}' requires numbers, got {} and {}",
                op.as_str(),
                lv.type_name(),
                rv.type_name()
            ),
            span,
        )),
    }
}
