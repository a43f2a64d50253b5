//! Recursive-descent parser over the token stream.
//!
//! One parser serves both modes. Expression mode accepts exactly one
//! expression; script mode accepts the full statement grammar. Statement
//! parsing recovers at statement boundaries so a script reports every
//! malformed statement in one pass.

use crate::Mode;
use crate::error::{Error, ErrorCode};
use crate::runtime::value::DataType;
use crate::syntax::ast::{
    AssignOp, BinOp, Decl, DeclVar, DoWhileStmt, Expr, ForStmt, IfStmt, IncDecOp, PathStep,
    Program, Span, Stmt, UnOp, WhileStmt,
};
use crate::syntax::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    mode: Mode,
    errors: Vec<Error>,
}

pub fn parse(tokens: Vec<Token>, mode: Mode) -> Result<Program, Vec<Error>> {
    let mut p = Parser { tokens, pos: 0, mode, errors: Vec::new() };
    let program = match mode {
        Mode::Expression => p.parse_expression_program(),
        Mode::Script => Program { stmts: p.parse_stmt_list(false) },
    };
    if p.errors.is_empty() { Ok(program) } else { Err(p.errors) }
}

impl Parser {
    // ─── Entry points ────────────────────────────────────────────────────────

    fn parse_expression_program(&mut self) -> Program {
        let mut stmts = Vec::new();
        match self.parse_expr() {
            Ok(expr) => {
                self.matches(&TokenKind::Semicolon);
                if !self.check(&TokenKind::Eof) {
                    self.errors.push(Error::new(
                        ErrorCode::P001,
                        self.here(),
                        "unexpected input after expression",
                    ));
                }
                stmts.push(Stmt::Expr(expr));
            }
            Err(e) => self.errors.push(e),
        }
        Program { stmts }
    }

    fn parse_stmt_list(&mut self, stop_at_brace: bool) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        loop {
            if self.check(&TokenKind::Eof) {
                break;
            }
            if stop_at_brace && self.check(&TokenKind::RBrace) {
                break;
            }
            let before = self.pos;
            match self.parse_stmt() {
                Ok(s) => stmts.push(s),
                Err(e) => {
                    self.errors.push(e);
                    self.recover();
                    // a statement that failed without consuming anything
                    // would fail on the same token forever
                    if self.pos == before && !self.check(&TokenKind::Eof) {
                        self.advance();
                    }
                }
            }
        }
        stmts
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        match self.peek().kind {
            TokenKind::TInt | TokenKind::TDouble => self.parse_decl(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                let tok = self.advance();
                self.expect(TokenKind::Semicolon, "`;` after `break`")?;
                Ok(Stmt::Break(tok.span))
            }
            TokenKind::Continue => {
                let tok = self.advance();
                self.expect(TokenKind::Semicolon, "`;` after `continue`")?;
                Ok(Stmt::Continue(tok.span))
            }
            TokenKind::Return => {
                let tok = self.advance();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon, "`;` after `return`")?;
                Ok(Stmt::Return(value, tok.span))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon, "`;` after expression")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_decl(&mut self) -> Result<Stmt, Error> {
        let ty_tok = self.advance();
        let ty = match ty_tok.kind {
            TokenKind::TInt => DataType::Int,
            _ => DataType::Double,
        };

        let mut vars = Vec::new();
        loop {
            let (name, span) = self.expect_ident("variable name")?;
            let init = if self.matches(&TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            vars.push(DeclVar { name, init, span });
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon, "`;` after declaration")?;
        Ok(Stmt::Decl(Decl { ty, vars, span: ty_tok.span }))
    }

    fn parse_block(&mut self) -> Result<Stmt, Error> {
        let open = self.advance();
        let stmts = self.parse_stmt_list(true);
        self.expect(TokenKind::RBrace, "`}` to close block")?;
        Ok(Stmt::Block(stmts, open.span))
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let kw = self.advance();
        self.expect(TokenKind::LParen, "`(` after `if`")?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen, "`)` after condition")?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.matches(&TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If(IfStmt { condition, then_branch, else_branch, span: kw.span }))
    }

    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let kw = self.advance();
        self.expect(TokenKind::LParen, "`(` after `while`")?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen, "`)` after condition")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While(WhileStmt { condition, body, span: kw.span }))
    }

    fn parse_do_while(&mut self) -> Result<Stmt, Error> {
        let kw = self.advance();
        let body = Box::new(self.parse_stmt()?);
        self.expect(TokenKind::While, "`while` after `do` body")?;
        self.expect(TokenKind::LParen, "`(` after `while`")?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen, "`)` after condition")?;
        self.expect(TokenKind::Semicolon, "`;` after `do..while`")?;
        Ok(Stmt::DoWhile(DoWhileStmt { body, condition, span: kw.span }))
    }

    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let kw = self.advance();
        self.expect(TokenKind::LParen, "`(` after `for`")?;

        // init is a full statement and consumes its own `;`
        let init = if self.peek().kind.is_type_keyword() {
            Box::new(self.parse_decl()?)
        } else {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semicolon, "`;` after loop initializer")?;
            Box::new(Stmt::Expr(expr))
        };

        let condition = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "`;` after loop condition")?;
        let step = self.parse_expr()?;
        self.expect(TokenKind::RParen, "`)` after loop step")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::For(ForStmt { init, condition, step, body, span: kw.span }))
    }

    /// Skip to the next statement boundary after a parse error. Always makes
    /// progress.
    fn recover(&mut self) {
        loop {
            match self.peek().kind {
                TokenKind::Eof | TokenKind::RBrace => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                ref k if k.is_keyword() || k.is_type_keyword() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_assign()
    }

    /// Right-associative; the target must be a plain identifier.
    fn parse_assign(&mut self) -> Result<Expr, Error> {
        let expr = self.parse_or()?;
        if self.peek().kind.is_assign_op() {
            let op_tok = self.advance();
            let value = self.parse_assign()?;
            let Expr::Ident(name, name_span) = expr else {
                return Err(Error::new(
                    ErrorCode::P001,
                    op_tok.span,
                    "assignment target must be a variable",
                ));
            };
            let op = match op_tok.kind {
                TokenKind::PlusEq => AssignOp::Add,
                TokenKind::MinusEq => AssignOp::Sub,
                TokenKind::StarEq => AssignOp::Mul,
                TokenKind::SlashEq => AssignOp::Div,
                _ => AssignOp::Set,
            };
            let span = join(&name_span, value.span());
            return Ok(Expr::Assign { name, op, value: Box::new(value), name_span, span });
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.matches(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = binop(left, BinOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_equality()?;
        while self.matches(&TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = binop(left, BinOp::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binop(left, op, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binop(left, op, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binop(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binop(left, op, right);
        }
        Ok(left)
    }

    /// Prefix operators. Power binds tighter, so `-2^2` negates `2^2`.
    fn parse_unary(&mut self) -> Result<Expr, Error> {
        match self.peek().kind {
            TokenKind::Minus => {
                let tok = self.advance();
                let operand = self.parse_unary()?;
                let span = join(&tok.span, operand.span());
                Ok(Expr::UnOp { op: UnOp::Neg, operand: Box::new(operand), span })
            }
            TokenKind::Bang => {
                let tok = self.advance();
                let operand = self.parse_unary()?;
                let span = join(&tok.span, operand.span());
                Ok(Expr::UnOp { op: UnOp::Not, operand: Box::new(operand), span })
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let tok = self.advance();
                let op = if tok.kind == TokenKind::PlusPlus { IncDecOp::Inc } else { IncDecOp::Dec };
                let (name, name_span) = self.expect_ident("variable after increment operator")?;
                let span = join(&tok.span, &name_span);
                Ok(Expr::IncDec { name, op, prefix: true, span })
            }
            _ => self.parse_power(),
        }
    }

    /// `^` folds left: `2^3^2` is `(2^3)^2`.
    fn parse_power(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_postfix()?;
        while self.matches(&TokenKind::Caret) {
            let right = self.parse_power_operand()?;
            left = binop(left, BinOp::Pow, right);
        }
        Ok(left)
    }

    /// Right side of `^` may carry its own sign: `2^-3`.
    fn parse_power_operand(&mut self) -> Result<Expr, Error> {
        if self.check(&TokenKind::Minus) {
            let tok = self.advance();
            let operand = self.parse_power_operand()?;
            let span = join(&tok.span, operand.span());
            return Ok(Expr::UnOp { op: UnOp::Neg, operand: Box::new(operand), span });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    let dot = self.advance();
                    if self.mode == Mode::Expression {
                        return Err(Error::new(
                            ErrorCode::P001,
                            dot.span,
                            "accessor paths are not allowed in expressions",
                        ));
                    }
                    let (step, step_span) = self.expect_ident("accessor name after `.`")?;
                    expr = match expr {
                        Expr::Ident(base, base_span) => {
                            let span = join(&base_span, &step_span);
                            Expr::Path {
                                base,
                                steps: vec![PathStep { name: step, span: step_span }],
                                span,
                            }
                        }
                        Expr::Path { base, mut steps, span } => {
                            let span = join(&span, &step_span);
                            steps.push(PathStep { name: step, span: step_span });
                            Expr::Path { base, steps, span }
                        }
                        _ => {
                            return Err(Error::new(
                                ErrorCode::P001,
                                dot.span,
                                "accessor must follow a variable",
                            ));
                        }
                    };
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let tok = self.advance();
                    let op = if tok.kind == TokenKind::PlusPlus {
                        IncDecOp::Inc
                    } else {
                        IncDecOp::Dec
                    };
                    let Expr::Ident(name, name_span) = expr else {
                        return Err(Error::new(
                            ErrorCode::P001,
                            tok.span,
                            "increment target must be a variable",
                        ));
                    };
                    let span = join(&name_span, &tok.span);
                    expr = Expr::IncDec { name, op, prefix: false, span };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        match self.peek().kind.clone() {
            TokenKind::Int(v) => {
                let tok = self.advance();
                Ok(Expr::Int(v, tok.span))
            }
            TokenKind::Num(v) => {
                let tok = self.advance();
                Ok(Expr::Num(v, tok.span))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, "`)` to close group")?;
                Ok(expr)
            }
            TokenKind::Ident(name) => {
                let tok = self.advance();
                if self.matches(&TokenKind::LParen) {
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.matches(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    let close = self.expect(TokenKind::RParen, "`)` to close argument list")?;
                    let span = join(&tok.span, &close.span);
                    Ok(Expr::Call { callee: name, args, span })
                } else {
                    Ok(Expr::Ident(name, tok.span))
                }
            }
            _ => Err(Error::new(ErrorCode::P001, self.here(), "expected expression")),
        }
    }

    // ─── Cursor helpers ──────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Error> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(Error::new(ErrorCode::P002, self.here(), format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span), Error> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                let tok = self.advance();
                Ok((name, tok.span))
            }
            _ => Err(Error::new(ErrorCode::P002, self.here(), format!("expected {what}"))),
        }
    }

    fn here(&self) -> Span {
        self.peek().span.clone()
    }
}

fn binop(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = join(left.span(), right.span());
    Expr::BinOp { left: Box::new(left), op, right: Box::new(right), span }
}

/// Span covering both endpoints, anchored at the first.
fn join(a: &Span, b: &Span) -> Span {
    let end = b.offset + b.len;
    Span::new(a.offset, end.saturating_sub(a.offset), a.line, a.column)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
