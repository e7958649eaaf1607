//! Parser state shared by the statement and expression rules: the token
//! cursor, diagnostics and recovery.

use quan_lexer::token::{Token, TokenKind};
use quan_types::ast::{Ident, Program};
use quan_types::{Diagnostics, ErrorCode, QuanError, SourceFile, Span};

/// Nesting budget for expressions and blocks.
///
/// A nested expression or block costs [`NESTED_SCOPE_COST`]; each link of
/// an operator or postfix chain costs one.
pub const MAX_EXPR_DEPTH: u32 = 256;

/// Budget taken by one nested expression or block.
pub const NESTED_SCOPE_COST: u32 = 4;

/// Recursive-descent parser over a lexed token stream.
///
/// Errors are collected rather than returned; after each one the parser
/// skips to the next statement boundary and keeps going.
pub struct Parser<'src> {
    /// The token stream. Never empty: always ends with `Eof`.
    tokens: Vec<Token>,
    /// Cursor into `tokens`.
    pos: usize,
    /// Used to attach source lines to diagnostics.
    pub(crate) source_file: &'src SourceFile,
    pub(crate) errors: Diagnostics,
    /// Nesting budget in use. See [`MAX_EXPR_DEPTH`].
    pub(crate) depth: u32,
}

/// Result of parsing.
#[derive(Debug)]
pub struct ParseResult {
    pub program: Option<Program>,
    pub errors: Diagnostics,
}

/// Parse a token stream into a [`Program`], or return the first error.
pub fn parse(tokens: Vec<Token>, source_file: &SourceFile) -> Result<Program, QuanError> {
    let result = Parser::new(tokens, source_file).parse();
    match (result.program, result.errors.into_first()) {
        (_, Some(err)) => Err(err),
        (Some(program), None) => Ok(program),
        (None, None) => Err(QuanError::new(
            ErrorCode::UNEXPECTED_TOKEN,
            "parser produced no program",
        )),
    }
}

impl<'src> Parser<'src> {
    /// A missing trailing `Eof` is appended.
    pub fn new(mut tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or(Span::point(1, 1));
            tokens.push(Token::new(TokenKind::Eof, span));
        }
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: Diagnostics::empty(),
            depth: 0,
        }
    }

    // ── Cursor ──────────────────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Consume the current token. The cursor never moves past `Eof`.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos = (self.pos + 1).min(self.tokens.len());
        token
    }

    /// Span of the last consumed token, or `1:1` before the first.
    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[(self.pos - 1).min(self.tokens.len() - 1)].span
        } else {
            Span::point(1, 1)
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// Consume the current token if it is `kind`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Kind of the token `n` places ahead; `Eof` past the end.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    // ── Expectations ────────────────────────────────────────────────────────

    /// Consume `expected` or record an E201 at the current token.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.eat(expected) {
            return Some(self.tokens[self.pos - 1].clone());
        }
        let found = self.peek_kind().to_string();
        self.error_at_current(
            ErrorCode::UNEXPECTED_TOKEN,
            format!("expected '{expected}', got '{found}'"),
        );
        None
    }

    /// Expect a closing delimiter. A missing closer at end of input is
    /// reported as a missing terminator.
    pub(crate) fn expect_closing(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.at_end() {
            self.error_at_current(
                ErrorCode::MISSING_TERMINATOR,
                format!("expected '{}', got end of input", expected),
            );
            return None;
        }
        self.expect(expected)
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        if let TokenKind::Identifier(name) = self.peek_kind() {
            let name = name.clone();
            return Some(Ident::new(name, self.advance().span));
        }
        let found = self.peek_kind().to_string();
        self.error_at_current(
            ErrorCode::UNEXPECTED_TOKEN,
            format!("expected identifier, got '{found}'"),
        );
        None
    }

    /// Expect an identifier or a keyword used as a field name after `.`
    /// or as an object literal key.
    pub(crate) fn expect_member_name(&mut self) -> Option<Ident> {
        let name = match self.peek_kind() {
            TokenKind::Identifier(name) => Some(name.clone()),
            kind if kind.is_keyword() => Some(kind.to_string()),
            _ => None,
        };
        match name {
            Some(name) => Some(Ident::new(name, self.advance().span)),
            None => {
                let found = self.peek_kind().to_string();
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected field name, got '{found}'"),
                );
                None
            }
        }
    }

    // ── Diagnostics ─────────────────────────────────────────────────────────

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.error_at(code, message, self.current_span());
    }

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        self.errors
            .push(QuanError::at(code, message, span, self.source_file));
    }

    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.is_full()
    }

    /// Enter a nested expression or block.
    pub(crate) fn enter_nesting(&mut self) -> bool {
        self.reserve_depth(NESTED_SCOPE_COST)
    }

    pub(crate) fn leave_nesting(&mut self) {
        self.release_depth(NESTED_SCOPE_COST);
    }

    /// Take `cost` from the nesting budget. Reports and returns `false`
    /// when the budget would be exceeded; nothing is taken in that case.
    pub(crate) fn reserve_depth(&mut self, cost: u32) -> bool {
        if self.depth + cost > MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_LIMIT_EXCEEDED,
                format!("maximum nesting depth is {MAX_EXPR_DEPTH}"),
            );
            return false;
        }
        self.depth += cost;
        true
    }

    pub(crate) fn release_depth(&mut self, cost: u32) {
        self.depth -= cost;
    }

    // ── Recovery ────────────────────────────────────────────────────────────

    /// Skip past the statement that failed to parse. Boundaries: just after a `;`, before a statement keyword or `}`, or
    /// at the first token on a new line.
    pub(crate) fn synchronize(&mut self) {
        if matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
            return;
        }
        self.advance();
        while !self.at_end() {
            if self.tokens[self.pos - 1].kind == TokenKind::Semicolon {
                return;
            }
            match self.peek_kind() {
                TokenKind::Fn | TokenKind::If | TokenKind::Return | TokenKind::RBrace => return,
                _ => {}
            }
            if self.current_span().start_line > self.previous_span().end_line {
                return;
            }
            self.advance();
        }
    }

    // ── Entry ───────────────────────────────────────────────────────────────

    /// Run the parser to completion. `program` is `None` when any error was
    /// recorded.
    pub fn parse(mut self) -> ParseResult {
        ParseResult {
            program: self.parse_program(),
            errors: self.errors,
        }
    }

    fn parse_program(&mut self) -> Option<Program> {
        let first = self.current_span();
        let mut statements = Vec::new();
        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            if *self.peek_kind() == TokenKind::RBrace {
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "unexpected '}'");
                self.advance();
                continue;
            }
            match self.parse_statement() {
                Some(stmt) => statements.push(stmt),
                None => self.synchronize(),
            }
        }
        if self.errors.has_errors() {
            return None;
        }
        Some(Program {
            statements,
            span: first.merge(self.previous_span()),
        })
    }
}
