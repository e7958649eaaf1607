//! Token types for the QuanLang lexer.
//!
//! Defines [`TokenKind`] covering every lexeme in QuanLang and
//! [`Token`], which pairs a kind with a source [`Span`].

use quan_types::Span;
use serde::Serialize;
use std::fmt;

/// Words the lexer turns into keyword tokens instead of identifiers.
pub const ALL_KEYWORDS: &[&str] = &["fn", "if", "else", "return", "true", "false", "null"];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the QuanLang lexer.
///
/// Serialized as `{"type": "NUMBER", "literal": 42, "span": {...}}`;
/// tokens without a payload omit `literal`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    #[serde(flatten)]
    pub kind: TokenKind,
    /// Source location.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind in the QuanLang language.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "literal", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────

    /// Numeric literal (integer or decimal): `42`, `3.14`
    Number(f64),
    /// Quoted string with escapes resolved: `'hello'`, `"hi\n"`
    String(String),
    /// Raw body of a `'''...'''` template; the parser splits `${...}` markers.
    TemplateString(String),

    // ── Identifiers ──────────────────────────────────────────

    /// User-defined identifier: `my_var`, `toMap`
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────

    /// `fn`
    Fn,
    /// `if`
    If,
    /// `else`
    Else,
    /// `return`
    Return,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,

    // ── Operators ────────────────────────────────────────────

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `^`
    Caret,
    /// `?`
    Question,
    /// `==`
    EqEq,
    /// `!=`
    BangEq,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEq,
    /// `>=`
    GreaterEq,
    /// `=`
    Assign,

    // ── Punctuation ──────────────────────────────────────────

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `.`
    Dot,

    // ── Special ──────────────────────────────────────────────

    /// End of input
    Eof,
}

impl TokenKind {
    /// Look up a reserved identifier. Returns `Some(kind)` for every
    /// keyword, `None` for user identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "fn" => TokenKind::Fn,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => return None,
        })
    }

    /// Reserved words. Parsers still accept them as member names (`a.if`).
    pub fn is_keyword(&self) -> bool {
        self.lexeme().is_some_and(|text| ALL_KEYWORDS.contains(&text))
    }

    /// `==`, `!=`, `<`, `>`, `<=` or `>=`.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            TokenKind::EqEq
                | TokenKind::BangEq
                | TokenKind::Less
                | TokenKind::Greater
                | TokenKind::LessEq
                | TokenKind::GreaterEq
        )
    }

    /// Source text of tokens that have a fixed spelling.
    pub fn lexeme(&self) -> Option<&'static str> {
        let text = match self {
            TokenKind::Fn => "fn",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Return => "return",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::Question => "?",
            TokenKind::EqEq => "==",
            TokenKind::BangEq => "!=",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEq => "<=",
            TokenKind::GreaterEq => ">=",
            TokenKind::Assign => "=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Dot => ".",
            TokenKind::Number(_)
            | TokenKind::String(_)
            | TokenKind::TemplateString(_)
            | TokenKind::Identifier(_)
            | TokenKind::Eof => return None,
        };
        Some(text)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.lexeme() {
            return f.write_str(text);
        }
        match self {
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::String(s) => write!(f, "'{s}'"),
            TokenKind::TemplateString(_) => f.write_str("template string"),
            TokenKind::Identifier(name) => f.write_str(name),
            _ => f.write_str("end of input"),
        }
    }
}
