// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A Pratt parser turning expression tokens into [`crate::expr::ast`] nodes.

use crate::{
    error::{EvalError, Span},
    expr::ast::{AssignTarget, BinaryOp, Expr, Literal, Stmt, UnaryOp},
    token::{Token, TokenKind},
};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses the whole token stream as a sequence of `;`-or-newline
    /// separated statements (spec.md §4.C allows function bodies and
    /// `eval` blocks with more than one statement; a single-expression
    /// step RHS is just the degenerate one-statement case).
    pub fn parse_program(&mut self) -> Result<Vec<Stmt>, EvalError> {
        let mut stmts = Vec::new();
        self.skip_separators();
        while !self.at_eof() {
            stmts.push(self.parse_stmt()?);
            self.skip_separators();
        }
        Ok(stmts)
    }

    /// Parses exactly one expression and requires EOF to follow (the
    /// common case: a `match`/`assert`/`def` RHS).
    pub fn parse_single_expr(&mut self) -> Result<Expr, EvalError> {
        let expr = self.parse_expr()?;
        self.skip_separators();
        if !self.at_eof() {
            return Err(self.error_here("trailing input after expression"));
        }
        Ok(expr)
    }

    fn skip_separators(&mut self) {
        while self.peek_text() == ";" {
            self.pos += 1;
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt, EvalError> {
        if self.peek_text() == "var" || self.peek_text() == "let" {
            self.pos += 1;
            let name = self.expect_ident()?;
            self.expect_op("=")?;
            let value = self.parse_expr()?;
            return Ok(Stmt::Var(name, value));
        }
        if self.peek_text() == "return" {
            self.pos += 1;
            if self.peek_text() == ";" || self.at_eof() {
                return Ok(Stmt::Return(None));
            }
            let value = self.parse_expr()?;
            return Ok(Stmt::Return(Some(value)));
        }
        Ok(Stmt::Expr(self.parse_expr()?))
    }

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, EvalError> {
        let lhs = self.parse_logical_or()?;
        if self.peek_text() == "=" {
            let span = self.peek_span();
            self.pos += 1;
            let value = self.parse_assignment()?;
            let target = expr_to_assign_target(lhs, span)?;
            return Ok(Expr::Assign { target, value: Box::new(value), span });
        }
        Ok(lhs)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_logical_and()?;
        while self.peek_text() == "||" {
            self.pos += 1;
            let rhs = self.parse_logical_and()?;
            let span = lhs.span();
            lhs = Expr::Binary { op: BinaryOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_equality()?;
        while self.peek_text() == "&&" {
            self.pos += 1;
            let rhs = self.parse_equality()?;
            let span = lhs.span();
            lhs = Expr::Binary { op: BinaryOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek_text().as_str() {
                "==" | "===" => BinaryOp::Eq,
                "!=" | "!==" => BinaryOp::NotEq,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_relational()?;
            let span = lhs.span();
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_text().as_str() {
                "<" => BinaryOp::Lt,
                "<=" => BinaryOp::Lte,
                ">" => BinaryOp::Gt,
                ">=" => BinaryOp::Gte,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_additive()?;
            let span = lhs.span();
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_text().as_str() {
                "+" => BinaryOp::Add,
                "-" => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            let span = lhs.span();
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_text().as_str() {
                "*" => BinaryOp::Mul,
                "/" => BinaryOp::Div,
                "%" => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            let span = lhs.span();
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        let span = self.peek_span();
        if self.peek_text() == "!" {
            self.pos += 1;
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnaryOp::Not, expr: Box::new(expr), span });
        }
        if self.peek_text() == "-" {
            self.pos += 1;
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnaryOp::Neg, expr: Box::new(expr), span });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            let span = self.peek_span();
            if self.peek_text() == "." || self.peek_text() == "?." {
                let optional = self.peek_text() == "?.";
                self.pos += 1;
                let name = self.expect_ident()?;
                expr = Expr::Member { target: Box::new(expr), name, optional, span };
                continue;
            }
            if self.peek_text() == "[" {
                self.pos += 1;
                let index = self.parse_expr()?;
                self.expect_punct("]")?;
                expr = Expr::Index { target: Box::new(expr), index: Box::new(index), optional: false, span };
                continue;
            }
            if self.peek_text() == "(" {
                self.pos += 1;
                let mut args = Vec::new();
                if self.peek_text() != ")" {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.peek_text() == "," {
                            self.pos += 1;
                            continue;
                        }
                        break;
                    }
                }
                self.expect_punct(")")?;
                expr = Expr::Call { callee: Box::new(expr), args, span };
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let span = self.peek_span();
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.pos += 1;
                let n: f64 = token.text.parse().map_err(|_| self.error_at(span, "invalid number literal"))?;
                Ok(Expr::Literal(Literal::Num(n), span))
            }
            TokenKind::Str => {
                self.pos += 1;
                Ok(Expr::Literal(Literal::Str(token.text), span))
            }
            TokenKind::Ident => match token.text.as_str() {
                "true" => {
                    self.pos += 1;
                    Ok(Expr::Literal(Literal::Bool(true), span))
                }
                "false" => {
                    self.pos += 1;
                    Ok(Expr::Literal(Literal::Bool(false), span))
                }
                "null" => {
                    self.pos += 1;
                    Ok(Expr::Literal(Literal::Null, span))
                }
                "undefined" => {
                    self.pos += 1;
                    Ok(Expr::Literal(Literal::Undefined, span))
                }
                "function" => self.parse_function_literal(span),
                "Java" | "Host" => self.parse_host_lookup(span),
                _ => {
                    self.pos += 1;
                    Ok(Expr::Ident(token.text, span))
                }
            },
            TokenKind::Punct if token.text == "(" => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            TokenKind::Punct if token.text == "[" => {
                self.pos += 1;
                let mut items = Vec::new();
                if self.peek_text() != "]" {
                    loop {
                        items.push(self.parse_expr()?);
                        if self.peek_text() == "," {
                            self.pos += 1;
                            continue;
                        }
                        break;
                    }
                }
                self.expect_punct("]")?;
                Ok(Expr::Array(items, span))
            }
            TokenKind::Punct if token.text == "{" => self.parse_object_literal(span),
            _ => Err(self.error_at(span, format!("unexpected token '{}'", token.text))),
        }
    }

    fn parse_function_literal(&mut self, span: Span) -> Result<Expr, EvalError> {
        self.pos += 1; // `function`
        self.expect_punct("(")?;
        let mut params = Vec::new();
        if self.peek_text() != ")" {
            loop {
                params.push(self.expect_ident()?);
                if self.peek_text() == "," {
                    self.pos += 1;
                    continue;
                }
                break;
            }
        }
        self.expect_punct(")")?;
        self.expect_punct("{")?;
        let mut body = Vec::new();
        self.skip_separators();
        while self.peek_text() != "}" {
            body.push(self.parse_stmt()?);
            self.skip_separators();
        }
        self.expect_punct("}")?;
        Ok(Expr::FunctionDef { params, body, span })
    }

    fn parse_host_lookup(&mut self, span: Span) -> Result<Expr, EvalError> {
        self.pos += 1; // `Java` / `Host`
        self.expect_op(".")?;
        let method = self.expect_ident()?; // `type` / `lookup`
        if method != "type" && method != "lookup" {
            return Err(self.error_at(span, format!("expected 'type' or 'lookup', found '{method}'")));
        }
        self.expect_punct("(")?;
        let name_token = self.peek().clone();
        if name_token.kind != TokenKind::Str {
            return Err(self.error_at(span, "Java.type()/Host.lookup() requires a string literal argument"));
        }
        self.pos += 1;
        self.expect_punct(")")?;
        Ok(Expr::HostLookup { type_name: name_token.text, span })
    }

    fn parse_object_literal(&mut self, span: Span) -> Result<Expr, EvalError> {
        self.pos += 1; // `{`
        let mut entries = Vec::new();
        self.skip_separators();
        if self.peek_text() != "}" {
            loop {
                let key = match self.peek().kind {
                    TokenKind::Ident | TokenKind::Str => {
                        let t = self.peek().clone();
                        self.pos += 1;
                        t.text
                    }
                    _ => return Err(self.error_here("expected object key")),
                };
                self.expect_op(":")?;
                let value = self.parse_expr()?;
                entries.push((key, value));
                if self.peek_text() == "," {
                    self.pos += 1;
                    continue;
                }
                break;
            }
        }
        self.expect_punct("}")?;
        Ok(Expr::Object(entries, span))
    }

    fn expect_ident(&mut self) -> Result<String, EvalError> {
        let token = self.peek().clone();
        if token.kind != TokenKind::Ident {
            return Err(self.error_here(format!("expected identifier, found '{}'", token.text)));
        }
        self.pos += 1;
        Ok(token.text)
    }

    fn expect_op(&mut self, op: &str) -> Result<(), EvalError> {
        if self.peek_text() != op {
            return Err(self.error_here(format!("expected '{op}', found '{}'", self.peek_text())));
        }
        self.pos += 1;
        Ok(())
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), EvalError> {
        if self.peek_text() != punct {
            return Err(self.error_here(format!("expected '{punct}', found '{}'", self.peek_text())));
        }
        self.pos += 1;
        Ok(())
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_text(&self) -> String {
        self.peek().text.clone()
    }

    fn peek_span(&self) -> Span {
        let t = self.peek();
        Span::new(t.start, t.start + t.text.len())
    }

    fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    fn error_here(&self, message: impl Into<String>) -> EvalError {
        self.error_at(self.peek_span(), message)
    }

    fn error_at(&self, span: Span, message: impl Into<String>) -> EvalError {
        EvalError::new(span, message)
    }
}

fn expr_to_assign_target(expr: Expr, span: Span) -> Result<AssignTarget, EvalError> {
    match expr {
        Expr::Ident(name, _) => Ok(AssignTarget::Ident(name)),
        Expr::Member { target, name, .. } => Ok(AssignTarget::Member { target, name }),
        Expr::Index { target, index, .. } => Ok(AssignTarget::Index { target, index }),
        _ => Err(EvalError::new(span, "invalid assignment target")),
    }
}

/// Parses `text` (already positioned at `line`/`col` within `source`) as a
/// single expression.
pub fn parse_expr_str(
    source: std::sync::Arc<crate::source::Source>,
    text: &str,
    line: usize,
    col: usize,
) -> Result<Expr, EvalError> {
    let tokens = crate::expr::lex::tokenize(source, text, line, col)?;
    Parser::new(tokens).parse_single_expr()
}

/// Parses `text` as a sequence of statements (a function body or an `eval`
/// block with more than one statement).
pub fn parse_program_str(
    source: std::sync::Arc<crate::source::Source>,
    text: &str,
    line: usize,
    col: usize,
) -> Result<Vec<Stmt>, EvalError> {
    let tokens = crate::expr::lex::tokenize(source, text, line, col)?;
    Parser::new(tokens).parse_program()
}
