//! Core QuanLang lexer: converts source text to a token stream.
//!
//! Features:
//! - Keywords, identifiers, integer and decimal numbers
//! - Single- and double-quoted strings with escape sequences
//! - Triple-quoted template strings emitted as one raw token
//! - Single-line comments stripped (`//`); newlines are plain whitespace
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use quan_types::{Diagnostics, ErrorCode, QuanError, SourceFile, Span};

use crate::token::{Token, TokenKind};

/// The QuanLang lexer.
///
/// Converts source text into a vector of [`Token`]s, collecting up to
/// [`quan_types::MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    /// The text being scanned (the whole file, or a fragment of it).
    text: &'src str,
    /// Source file for error reporting.
    source_file: &'src SourceFile,
    /// Current byte offset into `text`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, counted in characters).
    col: u32,
    /// Collected errors.
    errors: Diagnostics,
}

/// Result of lexing: tokens + any errors collected.
#[derive(Debug)]
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    /// Errors encountered during lexing.
    pub errors: Diagnostics,
}

/// Lex `source` and return the token stream, or the first error.
pub fn tokenize(source: &str) -> Result<Vec<Token>, QuanError> {
    let source_file = SourceFile::new("main.qlang", source);
    let result = Lexer::new(&source_file).lex();
    match result.errors.into_first() {
        Some(err) => Err(err),
        None => Ok(result.tokens),
    }
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source file.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self::fragment(source_file, &source_file.source, 1, 1)
    }

    /// Create a lexer over `text`, a piece of `source_file` that starts at
    /// `line`:`col`. Token spans and errors use absolute file positions.
    pub fn fragment(source_file: &'src SourceFile, text: &'src str, line: u32, col: u32) -> Self {
        Self {
            text,
            source_file,
            pos: 0,
            line,
            col,
            errors: Diagnostics::empty(),
        }
    }

    /// Lex the entire input into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.is_full() {
                break;
            }

            let token = self.scan_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);

            if is_eof {
                break;
            }
        }

        // Ensure token stream always ends with Eof
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.text[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn starts_with(&self, pat: &str) -> bool {
        self.text[self.pos..].starts_with(pat)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        let end_col = if self.line == start_line {
            self.col.saturating_sub(1).max(start_col)
        } else {
            self.col.saturating_sub(1).max(1)
        };
        Span::new(start_line, start_col, self.line, end_col)
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let err = QuanError::at(code, message, span, self.source_file);
        self.errors.push(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace (including newlines) and `//` comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan one token, skipping over (and reporting) illegal characters.
    fn scan_token(&mut self) -> Token {
        loop {
            self.skip_trivia();

            if self.at_end() || self.errors.is_full() {
                return Token::new(TokenKind::Eof, self.current_span());
            }

            if let Some(token) = self.scan_lexeme() {
                return token;
            }
        }
    }

    /// Scan a single lexeme. Returns `None` after reporting an illegal
    /// character so the caller can resume scanning.
    fn scan_lexeme(&mut self) -> Option<Token> {
        let start_line = self.line;
        let start_col = self.col;
        let start = self.pos;

        if self.starts_with("'''") {
            return Some(self.scan_template(start_line, start_col));
        }

        let ch = self.advance()?;

        let kind = match ch {
            // ── String literal ──
            '"' | '\'' => return Some(self.scan_string(ch, start_line, start_col)),

            // ── Number literal ──
            '0'..='9' => return Some(self.scan_number(start, start_line, start_col)),

            // ── Identifiers & keywords ──
            c if c.is_ascii_alphabetic() || c == '_' => {
                return Some(self.scan_identifier(start, start_line, start_col))
            }

            // ── Operators ──
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '?' => TokenKind::Question,
            '=' => self.with_eq(TokenKind::EqEq, TokenKind::Assign),
            '<' => self.with_eq(TokenKind::LessEq, TokenKind::Less),
            '>' => self.with_eq(TokenKind::GreaterEq, TokenKind::Greater),
            '!' if self.peek() == Some('=') => {
                self.advance();
                TokenKind::BangEq
            }

            // ── Punctuation ──
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,

            '!' => {
                let span = self.span_from(start_line, start_col);
                let err = QuanError::at(
                    ErrorCode::ILLEGAL_CHARACTER,
                    "Unexpected character '!'",
                    span,
                    self.source_file,
                )
                .with_suggestion("Use '!=' for inequality");
                self.errors.push(err);
                return None;
            }
            other => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::ILLEGAL_CHARACTER,
                    format!("Unexpected character '{other}'"),
                    span,
                );
                return None;
            }
        };

        Some(Token::new(kind, self.span_from(start_line, start_col)))
    }

    /// Consume a trailing `=` if present, choosing between the two kinds.
    fn with_eq(&mut self, with: TokenKind, without: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            with
        } else {
            without
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        // We already consumed the first digit
        while let Some('0'..='9') = self.peek() {
            self.advance();
        }

        // A `.` only belongs to the number when a digit follows it
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some('0'..='9')) {
            self.advance();
            while let Some('0'..='9') = self.peek() {
                self.advance();
            }
        }

        let span = self.span_from(start_line, start_col);
        let value: f64 = self.text[start..self.pos].parse().unwrap_or(0.0);
        Token::new(TokenKind::Number(value), span)
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = &self.text[start..self.pos];
        let kind = TokenKind::from_keyword(text)
            .unwrap_or_else(|| TokenKind::Identifier(text.to_string()));

        Token::new(kind, span)
    }

    // ─────────────────────────────────────────────────────────────
    // Strings
    // ─────────────────────────────────────────────────────────────

    /// Scan a quoted string after its opening `quote`. Strings may span lines.
    fn scan_string(&mut self, quote: char, start_line: u32, start_col: u32) -> Token {
        let mut buf = String::new();

        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "Unterminated string literal",
                        span,
                    );
                    return Token::new(TokenKind::String(buf), span);
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    return Token::new(TokenKind::String(buf), self.span_from(start_line, start_col));
                }
                Some('\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }
    }

    /// Scan an escape sequence starting at the `\`.
    /// Returns the unescaped character, or `None` at end of input.
    fn scan_escape_sequence(&mut self) -> Option<char> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance(); // consume the '\'

        match self.advance() {
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('r') => Some('\r'),
            Some('\\') => Some('\\'),
            Some('\'') => Some('\''),
            Some('"') => Some('"'),
            Some('$') => Some('$'),
            Some(ch) => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::INVALID_ESCAPE,
                    format!("Invalid escape sequence '\\{ch}'"),
                    span,
                );
                Some(ch) // error recovery: keep the char as-is
            }
            // The string loop reports the missing closing quote.
            None => None,
        }
    }

    /// Scan a `'''...'''` template. The body is kept verbatim; `${...}`
    /// markers are split by the parser.
    fn scan_template(&mut self, start_line: u32, start_col: u32) -> Token {
        for _ in 0..3 {
            self.advance();
        }
        let body_start = self.pos;

        while !self.at_end() {
            if self.starts_with("'''") {
                let body = self.text[body_start..self.pos].to_string();
                for _ in 0..3 {
                    self.advance();
                }
                return Token::new(
                    TokenKind::TemplateString(body),
                    self.span_from(start_line, start_col),
                );
            }
            self.advance();
        }

        let span = self.span_from(start_line, start_col);
        self.emit_error(
            ErrorCode::UNTERMINATED_TEMPLATE,
            "Unterminated template string",
            span,
        );
        Token::new(
            TokenKind::TemplateString(self.text[body_start..].to_string()),
            span,
        )
    }
}
