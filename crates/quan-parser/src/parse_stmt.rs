//! Statement parsing.

use std::rc::Rc;

use crate::parser::Parser;
use quan_lexer::token::TokenKind;
use quan_types::ast::*;
use quan_types::ErrorCode;

impl<'src> Parser<'src> {
    /// Parse a block of statements: `{ stmts... }`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        if !self.enter_nesting() {
            return None;
        }
        let mut statements = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            match self.parse_statement() {
                Some(stmt) => statements.push(stmt),
                None => self.synchronize(),
            }
        }
        self.leave_nesting();
        self.expect_closing(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Block { statements, span })
    }

    /// Parse a single statement, including an optional trailing `;`.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        let stmt = match self.peek_kind() {
            TokenKind::Fn if matches!(self.look_ahead(1), TokenKind::Identifier(_)) => {
                self.parse_function(true).map(Stmt::FunctionDecl)
            }
            TokenKind::If => self.parse_if_stmt().map(Stmt::If),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::LBrace => self.parse_block().map(Stmt::Block),
            _ => self.parse_assignment_or_expr(),
        }?;
        self.eat(&TokenKind::Semicolon);
        Some(stmt)
    }

    /// `fn name(params) { body }`, or `fn (params) { body }` when `named` is false.
    pub(crate) fn parse_function(&mut self, named: bool) -> Option<Rc<FunctionDecl>> {
        let start = self.current_span();
        self.advance(); // eat `fn`
        let name = if named {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_param_list()?;
        self.expect_closing(&TokenKind::RParen)?;
        let body = self.parse_block()?;
        let span = start.merge(self.previous_span());
        Some(Rc::new(FunctionDecl {
            name,
            params,
            body,
            span,
        }))
    }

    /// Parse comma-separated parameter names (inside parens).
    fn parse_param_list(&mut self) -> Option<Vec<Ident>> {
        let mut params = Vec::new();
        while !self.check_exact(&TokenKind::RParen) && !self.at_end() {
            params.push(self.expect_identifier()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(params)
    }

    /// `if (cond) { ... } [else { ... } | else if ...]`
    ///
    /// `else if` is stored as an else block holding a single `if`.
    fn parse_if_stmt(&mut self) -> Option<IfStmt> {
        let start = self.current_span();
        self.advance(); // eat `if`
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect_closing(&TokenKind::RParen)?;
        let then_block = self.parse_block()?;
        let else_block = if self.eat(&TokenKind::Else) {
            if self.check_exact(&TokenKind::If) {
                // Each `else if` link nests one level deeper.
                if !self.reserve_depth(1) {
                    return None;
                }
                let nested = self.parse_if_stmt();
                self.release_depth(1);
                let nested = nested?;
                let span = nested.span;
                Some(Block {
                    statements: vec![Stmt::If(nested)],
                    span,
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        let span = start.merge(self.previous_span());
        Some(IfStmt {
            condition,
            then_block,
            else_block,
            span,
        })
    }

    /// `return [expr]`
    ///
    /// The value is omitted when `;`, `}`, end of input or a new line follows.
    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `return`
        let value = match self.peek_kind() {
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => None,
            _ if self.current_span().start_line > start.end_line => None,
            _ => Some(self.parse_expression()?),
        };
        let span = value.as_ref().map_or(start, |v| start.merge(v.span));
        Some(Stmt::Return(ReturnStmt { value, span }))
    }

    /// An expression statement, or an assignment when `=` follows the
    /// expression. Only identifiers followed by field and index steps are
    /// assignable.
    fn parse_assignment_or_expr(&mut self) -> Option<Stmt> {
        let expr = self.parse_expression()?;
        if !self.check_exact(&TokenKind::Assign) {
            let span = expr.span;
            return Some(Stmt::Expr(ExprStmt { expr, span }));
        }

        let Some(target) = self.assign_target(expr) else {
            self.error_at_current(
                ErrorCode::INVALID_ASSIGNMENT_TARGET,
                "malformed assignment target",
            );
            return None;
        };
        self.advance(); // eat `=`
        let value = self.parse_expression()?;
        let span = target.span.merge(value.span);
        Some(Stmt::Assignment(Assignment {
            target,
            value,
            span,
        }))
    }

    /// Convert `a`, `a.b.c` or `a.items[0]` into an assignment target.
    fn assign_target(&self, expr: Expr) -> Option<AssignTarget> {
        let span = expr.span;
        let mut path = Vec::new();
        let mut current = expr;
        loop {
            match current.kind {
                ExprKind::Identifier { name } => {
                    path.reverse();
                    return Some(AssignTarget {
                        root: Ident::new(name, current.span),
                        path,
                        span,
                    });
                }
                ExprKind::MemberAccess { object, field } => {
                    path.push(AccessStep::Field { name: field });
                    current = *object;
                }
                ExprKind::Index { object, index } => {
                    path.push(AccessStep::Index { index: *index });
                    current = *object;
                }
                _ => return None,
            }
        }
    }
}
