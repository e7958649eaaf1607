//! AST node types for the QuanLang language.
//!
//! Every node carries a [`Span`] for error reporting.
//! Nodes serialize with a `type` tag so hosts can render the tree directly.
//! Source order is preserved everywhere, including object literal fields.

use crate::Span;
use serde::Serialize;
use std::rc::Rc;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete QuanLang program: a flat sequence of statements.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// `{ statements... }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Stmt {
    /// `target = expr`
    Assignment(Assignment),
    /// `fn name(params) { body }`
    FunctionDecl(Rc<FunctionDecl>),
    /// `if (cond) { ... } [else { ... }]`
    #[serde(rename = "IfStmt")]
    If(IfStmt),
    /// `return [expr]`
    #[serde(rename = "ReturnStmt")]
    Return(ReturnStmt),
    /// `{ ... }`
    Block(Block),
    /// A bare expression evaluated for its effects.
    #[serde(rename = "ExprStmt")]
    Expr(ExprStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assignment(s) => s.span,
            Stmt::FunctionDecl(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Block(s) => s.span,
            Stmt::Expr(s) => s.span,
        }
    }
}

/// `a = expr`, `a.b.c = expr`, `a.items[0] = expr`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub target: AssignTarget,
    pub value: Expr,
    pub span: Span,
}

/// The left-hand side of an assignment: a root binding plus a path of
/// field and index steps.
///
/// An empty `path` assigns the binding itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignTarget {
    pub root: Ident,
    pub path: Vec<AccessStep>,
    pub span: Span,
}

/// One step of an assignment path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum AccessStep {
    /// `.name`
    Field { name: Ident },
    /// `[expr]`
    Index { index: Expr },
}

impl AccessStep {
    pub fn span(&self) -> Span {
        match self {
            AccessStep::Field { name } => name.span,
            AccessStep::Index { index } => index.span,
        }
    }
}

impl AssignTarget {
    /// Source-like form for diagnostics, e.g. `a.z.w` or `a.items[]`.
    /// Index expressions are elided.
    pub fn dotted(&self) -> String {
        let mut out = self.root.name.clone();
        for step in &self.path {
            match step {
                AccessStep::Field { name } => {
                    out.push('.');
                    out.push_str(&name.name);
                }
                AccessStep::Index { .. } => out.push_str("[]"),
            }
        }
        out
    }
}

/// A function declaration or anonymous function expression.
///
/// Shared by `Rc` with every function value created from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    /// `None` for anonymous `fn (a) { ... }` expressions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Ident>,
    pub params: Vec<Ident>,
    pub body: Block,
    pub span: Span,
}

impl FunctionDecl {
    pub fn display_name(&self) -> &str {
        self.name.as_ref().map(|n| n.name.as_str()).unwrap_or("anonymous")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    /// `else if` chains are stored as an else block holding one `if`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub else_block: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnStmt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node. Uses `Box` for recursive variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The kind of expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ExprKind {
    // ── Literals ──
    /// `42`, `3.5`, `'text'`, `true`, `null`
    Literal { value: Literal },
    /// `'''Hello ${name}'''`
    TemplateString { parts: Vec<TemplatePart> },
    /// `{ key: expr, ... }`
    ObjectLiteral { fields: Vec<ObjectField> },
    /// `[expr, ...]`
    ArrayLiteral { elements: Vec<Expr> },

    // ── Names & Access ──
    /// `my_var`
    Identifier { name: String },
    /// `expr.field`
    MemberAccess { object: Box<Expr>, field: Ident },
    /// `expr[index]`
    #[serde(rename = "IndexExpr")]
    Index { object: Box<Expr>, index: Box<Expr> },
    /// `callee(args...)`
    #[serde(rename = "CallExpr")]
    Call { callee: Box<Expr>, args: Vec<Expr> },

    // ── Operators ──
    /// `a + b`, `a < b`, etc.
    #[serde(rename = "BinaryExpr")]
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `-x`
    #[serde(rename = "UnaryExpr")]
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `cond ? a : b`
    #[serde(rename = "TernaryExpr")]
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    // ── Functions ──
    /// `fn (params) { body }`
    #[serde(rename = "FunctionExpr")]
    Function { decl: Rc<FunctionDecl> },
}

/// Literal payloads. Serialized as the bare JSON value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
}

/// A part of a template string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum TemplatePart {
    /// Literal text segment.
    Literal { text: String },
    /// An embedded expression `${expr}`.
    Expr { expr: Expr },
}

/// `key: value` inside an object literal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectField {
    pub key: Ident,
    pub value: Expr,
    pub span: Span,
}

// ── Operators ─────────────────────────────────────────────────────────────────

/// Binary operators (in precedence order, lowest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    // Comparison
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<=")]
    LessEq,
    #[serde(rename = ">=")]
    GreaterEq,
    // Additive
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    // Multiplicative
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    // Power
    #[serde(rename = "^")]
    Pow,
}

impl BinOp {
    /// Returns the operator symbol for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "^",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::NotEq | BinOp::Less | BinOp::Greater | BinOp::LessEq | BinOp::GreaterEq
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    /// `-x`
    #[serde(rename = "-")]
    Neg,
}
