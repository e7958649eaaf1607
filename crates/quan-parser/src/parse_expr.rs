//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 6. `? :` (right-associative)
//! 5. `==`, `!=`, `<`, `>`, `<=`, `>=` (no chaining)
//! 4. `+`, `-`
//! 3. `*`, `/`, `%`
//! 2. `^` (left-associative)
//! 1. unary `-`
//! 0. `.` (member access), `()` (call), `[]` (index)
//!
//! Every operator or postfix link takes one unit of the nesting budget
//! until its chain is finished, so the tree depth stays bounded.

use quan_lexer::token::TokenKind;
use quan_lexer::Lexer;
use quan_types::ast::*;
use quan_types::{ErrorCode, Span};

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        if !self.enter_nesting() {
            return None;
        }
        let result = self.parse_ternary();
        self.leave_nesting();
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `Comparison [ "?" Expr ":" Expr ]`
    fn parse_ternary(&mut self) -> Option<Expr> {
        let condition = self.parse_comparison()?;
        if !self.eat(&TokenKind::Question) {
            return Some(condition);
        }
        let then_expr = self.parse_expression()?;
        self.expect(&TokenKind::Colon)?;
        let else_expr = self.parse_expression()?;
        let span = condition.span.merge(else_expr.span);
        Some(Expr::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    /// `AddExpr [ CompOp AddExpr ]`. A second comparison is an error, so
    /// `a < b < c` never parses.
    fn parse_comparison(&mut self) -> Option<Expr> {
        let left = self.parse_add()?;
        let Some(op) = comparison_op(self.peek_kind()) else {
            return Some(left);
        };
        self.advance();
        let right = self.parse_add()?;
        if comparison_op(self.peek_kind()).is_some() {
            self.error_at_current(
                ErrorCode::CHAINED_COMPARISON,
                "comparison operators cannot be chained",
            );
            return None;
        }
        Some(binary(op, left, right))
    }

    /// `MulExpr { ("+" | "-") MulExpr }`
    fn parse_add(&mut self) -> Option<Expr> {
        self.fold_left(Self::parse_mul, |kind| match kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    /// `PowExpr { ("*" | "/" | "%") PowExpr }`
    fn parse_mul(&mut self) -> Option<Expr> {
        self.fold_left(Self::parse_power, |kind| match kind {
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    /// `UnaryExpr { "^" UnaryExpr }`
    fn parse_power(&mut self) -> Option<Expr> {
        self.fold_left(Self::parse_unary, |kind| match kind {
            TokenKind::Caret => Some(BinOp::Pow),
            _ => None,
        })
    }

    /// One left-associative level: operands come from `operand`, operators
    /// are whatever `op_for` maps to a [`BinOp`].
    fn fold_left(
        &mut self,
        operand: fn(&mut Self) -> Option<Expr>,
        op_for: fn(&TokenKind) -> Option<BinOp>,
    ) -> Option<Expr> {
        let mut acc = operand(self)?;
        let mut links = 0;
        let result = loop {
            let Some(op) = op_for(self.peek_kind()) else {
                break Some(acc);
            };
            if !self.reserve_depth(1) {
                break None;
            }
            links += 1;
            self.advance();
            let Some(rhs) = operand(self) else {
                break None;
            };
            acc = binary(op, acc, rhs);
        };
        self.release_depth(links);
        result
    }

    /// `UnaryExpr = { "-" } PostfixExpr`
    fn parse_unary(&mut self) -> Option<Expr> {
        let mut minus_spans = Vec::new();
        while self.check_exact(&TokenKind::Minus) {
            if !self.reserve_depth(1) {
                self.release_depth(minus_spans.len() as u32);
                return None;
            }
            minus_spans.push(self.advance().span);
        }
        let operand = self.parse_postfix();
        self.release_depth(minus_spans.len() as u32);

        let mut expr = operand?;
        while let Some(start) = minus_spans.pop() {
            let span = start.merge(expr.span);
            expr = Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(expr),
                },
                span,
            );
        }
        Some(expr)
    }

    /// `PostfixExpr = PrimaryExpr { "." Name | "(" ArgList ")" | "[" Expr "]" }`
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        let mut links = 0;
        let result = loop {
            if !matches!(
                self.peek_kind(),
                TokenKind::Dot | TokenKind::LParen | TokenKind::LBracket
            ) {
                break Some(expr);
            }
            if !self.reserve_depth(1) {
                break None;
            }
            links += 1;
            let Some(next) = self.parse_postfix_link(expr) else {
                break None;
            };
            expr = next;
        };
        self.release_depth(links);
        result
    }

    /// Apply one `.name`, `(args)` or `[index]` to `expr`.
    fn parse_postfix_link(&mut self, expr: Expr) -> Option<Expr> {
        match self.advance().kind {
            TokenKind::Dot => {
                let field = self.expect_member_name()?;
                let span = expr.span.merge(field.span);
                Some(Expr::new(
                    ExprKind::MemberAccess {
                        object: Box::new(expr),
                        field,
                    },
                    span,
                ))
            }
            TokenKind::LParen => {
                let args = self.parse_arg_list()?;
                self.expect_closing(&TokenKind::RParen)?;
                let span = expr.span.merge(self.previous_span());
                Some(Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                ))
            }
            _ => {
                let index = self.parse_expression()?;
                self.expect_closing(&TokenKind::RBracket)?;
                let span = expr.span.merge(self.previous_span());
                Some(Expr::new(
                    ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                ))
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse a primary expression.
    fn parse_primary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        match self.peek_kind().clone() {
            // ── Literals ────────────────────────────────────────────────
            TokenKind::Number(n) => {
                self.advance();
                Some(literal(Literal::Number(n), start))
            }
            TokenKind::String(s) => {
                self.advance();
                Some(literal(Literal::String(s), start))
            }
            TokenKind::True => {
                self.advance();
                Some(literal(Literal::Bool(true), start))
            }
            TokenKind::False => {
                self.advance();
                Some(literal(Literal::Bool(false), start))
            }
            TokenKind::Null => {
                self.advance();
                Some(literal(Literal::Null, start))
            }
            TokenKind::TemplateString(raw) => {
                self.advance();
                self.parse_template(&raw, start)
            }

            // ── Object and array literals ───────────────────────────────
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::LBracket => self.parse_array_literal(),

            // ── Grouping ────────────────────────────────────────────────
            TokenKind::LParen => {
                self.advance(); // eat `(`
                let inner = self.parse_expression()?;
                self.expect_closing(&TokenKind::RParen)?;
                Some(inner)
            }

            // ── Anonymous function ──────────────────────────────────────
            TokenKind::Fn => {
                let decl = self.parse_function(false)?;
                let span = decl.span;
                Some(Expr::new(ExprKind::Function { decl }, span))
            }

            TokenKind::Identifier(name) => {
                self.advance();
                Some(Expr::new(ExprKind::Identifier { name }, start))
            }

            TokenKind::Eof => {
                self.error_at_current(
                    ErrorCode::MISSING_TERMINATOR,
                    "expected expression, got end of input",
                );
                None
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{}'", self.peek_kind()),
                );
                None
            }
        }
    }

    /// Parse a comma-separated argument list (inside parens).
    fn parse_arg_list(&mut self) -> Option<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check_exact(&TokenKind::RParen) && !self.at_end() {
            args.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(args)
    }

    /// `ArrayLit = "[" [ Expr { "," Expr } [ "," ] ] "]"`
    fn parse_array_literal(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.advance(); // eat `[`

        let mut elements = Vec::new();
        while !self.check_exact(&TokenKind::RBracket) && !self.at_end() {
            elements.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(&TokenKind::RBracket)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::ArrayLiteral { elements }, span))
    }

    /// `ObjectLit = "{" [ Key ":" Expr { "," Key ":" Expr } [ "," ] ] "}"`
    ///
    /// A repeated key keeps its first position and takes the last value.
    fn parse_object_literal(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.advance(); // eat `{`

        let mut fields: Vec<ObjectField> = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            let key = match self.peek_kind().clone() {
                TokenKind::String(s) => {
                    let span = self.advance().span;
                    Ident::new(s, span)
                }
                _ => self.expect_member_name()?,
            };
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expression()?;
            let span = key.span.merge(value.span);

            match fields.iter_mut().find(|f| f.key.name == key.name) {
                Some(existing) => existing.value = value,
                None => fields.push(ObjectField { key, value, span }),
            }

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::ObjectLiteral { fields }, span))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Template Strings
    // ══════════════════════════════════════════════════════════════════════════

    /// Split a raw `'''...'''` body into literal runs and `${...}` expressions.
    ///
    /// Each expression body is lexed and parsed on its own, with positions
    /// mapped back into the enclosing file.
    fn parse_template(&mut self, raw: &str, span: Span) -> Option<Expr> {
        let mut parts = Vec::new();
        let mut text = String::new();
        // The body starts after the opening `'''`.
        let mut line = span.start_line;
        let mut col = span.start_col + 3;
        let mut failed = false;

        let mut chars = raw.char_indices().peekable();
        while let Some((idx, ch)) = chars.next() {
            if ch == '$' && chars.peek().map(|&(_, c)| c) == Some('{') {
                chars.next();
                let marker = Span::point(line, col);
                col += 2;
                let body_start = idx + 2;
                let (body_line, body_col) = (line, col);

                let Some(body_end) = scan_interpolation(raw, body_start) else {
                    self.error_at(
                        ErrorCode::MISSING_TERMINATOR,
                        "unclosed '${' in template string",
                        marker,
                    );
                    return None;
                };
                let body = &raw[body_start..body_end];

                // Skip past the body and its closing `}`.
                while let Some(&(i, c)) = chars.peek() {
                    if i > body_end {
                        break;
                    }
                    chars.next();
                    if c == '\n' {
                        line += 1;
                        col = 1;
                    } else {
                        col += 1;
                    }
                }

                if !text.is_empty() {
                    parts.push(TemplatePart::Literal {
                        text: std::mem::take(&mut text),
                    });
                }
                if body.trim().is_empty() {
                    self.error_at(
                        ErrorCode::EMPTY_INTERPOLATION,
                        "empty '${}' in template string",
                        marker,
                    );
                    failed = true;
                    continue;
                }
                match self.parse_interpolation(body, body_line, body_col) {
                    Some(expr) => parts.push(TemplatePart::Expr { expr }),
                    None => failed = true,
                }
                continue;
            }

            text.push(ch);
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }

        if failed {
            return None;
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Literal { text });
        }
        Some(Expr::new(ExprKind::TemplateString { parts }, span))
    }

    /// Lex and parse one `${...}` body as a complete expression.
    fn parse_interpolation(&mut self, body: &str, line: u32, col: u32) -> Option<Expr> {
        let lexed = Lexer::fragment(self.source_file, body, line, col).lex();
        if lexed.errors.has_errors() {
            self.errors.extend(lexed.errors);
            return None;
        }

        let mut sub = Parser::new(lexed.tokens, self.source_file);
        sub.depth = self.depth;
        let expr = sub.parse_expression();
        if expr.is_some() && !sub.at_end() {
            sub.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("unexpected '{}' in template expression", sub.peek_kind()),
            );
        }
        let failed = sub.errors.has_errors();
        self.errors.extend(sub.errors);
        if failed {
            None
        } else {
            expr
        }
    }
}

fn literal(value: Literal, span: Span) -> Expr {
    Expr::new(ExprKind::Literal { value }, span)
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn comparison_op(kind: &TokenKind) -> Option<BinOp> {
    Some(match kind {
        TokenKind::EqEq => BinOp::Eq,
        TokenKind::BangEq => BinOp::NotEq,
        TokenKind::Less => BinOp::Less,
        TokenKind::Greater => BinOp::Greater,
        TokenKind::LessEq => BinOp::LessEq,
        TokenKind::GreaterEq => BinOp::GreaterEq,
        _ => return None,
    })
}

/// Find the byte offset of the `}` closing an interpolation whose body
/// starts at `start`. Nested braces are balanced and quoted strings are
/// skipped.
fn scan_interpolation(raw: &str, start: usize) -> Option<usize> {
    let mut depth = 1u32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in raw[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}
