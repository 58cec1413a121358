//! Recursive-descent parser producing the syntax tree in `ast`.
//!
//! The accepted grammar is a little wider than what the compiler can
//! lower: chained comparisons, call expressions and non-name assignment
//! targets all parse here and are rejected later by name. Only input that
//! is malformed at the token/grammar level is a syntax error.

use crate::ast::{BinOpKind, CmpOpKind, Expr, Literal, Module, Stmt, StmtKind};
use crate::error::CompileError;
use crate::lexer::{Token, TokenKind, lex};

/// Parse a full source text into a module.
pub fn parse(source: &str) -> Result<Module, CompileError> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens,
        position: 0,
    };
    let body = parser.parse_stmts_until(&TokenKind::Eof)?;
    Ok(Module { body })
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token stream always ends with Eof, so clamp to the last one.
        let index = self.position.min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, CompileError> {
        if &self.peek().kind == kind {
            Ok(self.bump())
        } else {
            let token = self.peek();
            Err(CompileError::syntax(
                token.line,
                format!("expected {what}, found {}", token.kind),
            ))
        }
    }

    fn parse_stmts_until(&mut self, end: &TokenKind) -> Result<Vec<Stmt>, CompileError> {
        let mut stmts = Vec::new();
        while &self.peek().kind != end {
            stmts.push(self.parse_stmt()?);
        }
        self.bump();
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        match self.peek().kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Ident(_) | TokenKind::Int(_) | TokenKind::Float(_) => self.parse_assign(),
            _ => {
                let token = self.peek();
                Err(CompileError::syntax(
                    token.line,
                    format!("expected a statement, found {}", token.kind),
                ))
            }
        }
    }

    /// `target (= target)* = expr`, targets and value separated by `=`.
    /// A bare expression line is not a statement in this language.
    fn parse_assign(&mut self) -> Result<Stmt, CompileError> {
        let line = self.peek().line;
        let mut exprs = vec![self.parse_expr()?];
        while self.peek().kind == TokenKind::Equal {
            self.bump();
            exprs.push(self.parse_expr()?);
        }
        self.expect(&TokenKind::Newline, "end of line")?;
        if exprs.len() < 2 {
            return Err(CompileError::syntax(
                line,
                "expected '=' after expression; expression statements are not supported",
            ));
        }
        let value = exprs.pop().unwrap_or(Expr::Constant(Literal::Int(0)));
        Ok(Stmt {
            kind: StmtKind::Assign {
                targets: exprs,
                value,
            },
            line,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        let line = self.peek().line;
        self.bump();
        let test = self.parse_expr()?;
        let body = self.parse_suite()?;
        Ok(Stmt {
            kind: StmtKind::If { test, body },
            line,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, CompileError> {
        let line = self.peek().line;
        self.bump();
        let test = self.parse_expr()?;
        let body = self.parse_suite()?;
        Ok(Stmt {
            kind: StmtKind::While { test, body },
            line,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, CompileError> {
        let line = self.peek().line;
        self.bump();
        let target = match self.bump() {
            Token {
                kind: TokenKind::Ident(name),
                ..
            } => name,
            token => {
                return Err(CompileError::syntax(
                    token.line,
                    format!("expected a loop variable name, found {}", token.kind),
                ));
            }
        };
        self.expect(&TokenKind::In, "'in'")?;
        let iter = self.parse_expr()?;
        let body = self.parse_suite()?;
        Ok(Stmt {
            kind: StmtKind::For { target, iter, body },
            line,
        })
    }

    /// `: NEWLINE INDENT stmt+ DEDENT`, or `: stmt` on the same line.
    fn parse_suite(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.expect(&TokenKind::Colon, "':'")?;
        if self.peek().kind == TokenKind::Newline {
            self.bump();
            self.expect(&TokenKind::Indent, "an indented block")?;
            self.parse_stmts_until(&TokenKind::Dedent)
        } else if matches!(
            self.peek().kind,
            TokenKind::If | TokenKind::While | TokenKind::For
        ) {
            Err(CompileError::syntax(
                self.peek().line,
                "compound statements are not allowed on one line",
            ))
        } else {
            Ok(vec![self.parse_assign()?])
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        let left = self.parse_arith()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = cmp_op(&self.peek().kind) {
            self.bump();
            ops.push(op);
            comparators.push(self.parse_arith()?);
        }
        if ops.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                ops,
                comparators,
            })
        }
    }

    fn parse_arith(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_operand()?;
        while let Some(op) = bin_op(&self.peek().kind) {
            self.bump();
            let right = self.parse_operand()?;
            expr = Expr::BinOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_operand(&mut self) -> Result<Expr, CompileError> {
        match self.bump() {
            Token {
                kind: TokenKind::Ident(name),
                ..
            } => {
                if self.peek().kind == TokenKind::LParen {
                    self.parse_call_args(name)
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Token {
                kind: TokenKind::Int(value),
                ..
            } => Ok(Expr::Constant(Literal::Int(value))),
            Token {
                kind: TokenKind::Float(value),
                ..
            } => Ok(Expr::Constant(Literal::Float(value))),
            token => Err(CompileError::syntax(
                token.line,
                format!("expected a name or literal, found {}", token.kind),
            )),
        }
    }

    fn parse_call_args(&mut self, func: String) -> Result<Expr, CompileError> {
        self.bump();
        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            loop {
                args.push(self.parse_expr()?);
                if self.peek().kind == TokenKind::Comma {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(Expr::Call { func, args })
    }
}

fn bin_op(kind: &TokenKind) -> Option<BinOpKind> {
    match kind {
        TokenKind::Plus => Some(BinOpKind::Add),
        TokenKind::Minus => Some(BinOpKind::Sub),
        TokenKind::Star => Some(BinOpKind::Mul),
        TokenKind::Slash => Some(BinOpKind::Div),
        _ => None,
    }
}

fn cmp_op(kind: &TokenKind) -> Option<CmpOpKind> {
    match kind {
        TokenKind::Gt => Some(CmpOpKind::Gt),
        TokenKind::Ge => Some(CmpOpKind::Ge),
        TokenKind::Lt => Some(CmpOpKind::Lt),
        TokenKind::Le => Some(CmpOpKind::Le),
        _ => None,
    }
}
