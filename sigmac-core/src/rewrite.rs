//! Pre-lowering tree rewrites.
//!
//! A `for` loop is surface syntax for an initial assignment plus a `while`
//! with an increment appended to its body. The expansion happens here, as a
//! pure `Module -> Module` pass, so the lowering engine only ever sees the
//! core statement kinds. Synthesized statements inherit the `for`
//! statement's own line number, which keeps the derived jump labels stable.

use crate::ast::{BinOpKind, CmpOpKind, Expr, Literal, Module, Stmt, StmtKind};
use crate::error::CompileError;

/// Rewrite every `for` statement in the module into `assign` + `while`.
pub fn desugar(module: Module) -> Result<Module, CompileError> {
    let body = desugar_stmts(module.body)?;
    Ok(Module { body })
}

fn desugar_stmts(stmts: Vec<Stmt>) -> Result<Vec<Stmt>, CompileError> {
    let mut out = Vec::new();
    for stmt in stmts {
        let line = stmt.line;
        match stmt.kind {
            StmtKind::For { target, iter, body } => {
                let body = desugar_stmts(body)?;
                let (init, while_loop) = expand_for(line, target, &iter, body)?;
                out.push(init);
                out.push(while_loop);
            }
            StmtKind::If { test, body } => out.push(Stmt {
                kind: StmtKind::If {
                    test,
                    body: desugar_stmts(body)?,
                },
                line,
            }),
            StmtKind::While { test, body } => out.push(Stmt {
                kind: StmtKind::While {
                    test,
                    body: desugar_stmts(body)?,
                },
                line,
            }),
            kind @ StmtKind::Assign { .. } => out.push(Stmt { kind, line }),
        }
    }
    Ok(out)
}

/// `for <t> in range(s, e): body` becomes
/// `<t> = s` and `while <t> < e: body; <t> = <t> + 1`.
fn expand_for(
    line: u32,
    target: String,
    iter: &Expr,
    mut body: Vec<Stmt>,
) -> Result<(Stmt, Stmt), CompileError> {
    let (start, end) = range_bounds(line, iter)?;

    let init = Stmt {
        kind: StmtKind::Assign {
            targets: vec![Expr::Name(target.clone())],
            value: Expr::Constant(Literal::Int(start)),
        },
        line,
    };

    let increment = Stmt {
        kind: StmtKind::Assign {
            targets: vec![Expr::Name(target.clone())],
            value: Expr::BinOp {
                left: Box::new(Expr::Name(target.clone())),
                op: BinOpKind::Add,
                right: Box::new(Expr::Constant(Literal::Int(1))),
            },
        },
        line,
    };
    body.push(increment);

    let while_loop = Stmt {
        kind: StmtKind::While {
            test: Expr::Compare {
                left: Box::new(Expr::Name(target)),
                ops: vec![CmpOpKind::Lt],
                comparators: vec![Expr::Constant(Literal::Int(end))],
            },
            body,
        },
        line,
    };

    Ok((init, while_loop))
}

fn range_bounds(line: u32, iter: &Expr) -> Result<(i32, i32), CompileError> {
    let args = match iter {
        Expr::Call { func, args } if func == "range" => args,
        other => {
            return Err(CompileError::unsupported(
                line,
                format!(
                    "'for' may only iterate over range(start, end), found {}",
                    other.kind_name()
                ),
            ));
        }
    };
    if args.len() != 2 {
        return Err(CompileError::unsupported(
            line,
            format!("range takes exactly 2 arguments, found {}", args.len()),
        ));
    }
    match (&args[0], &args[1]) {
        (Expr::Constant(Literal::Int(start)), Expr::Constant(Literal::Int(end))) => {
            Ok((*start, *end))
        }
        _ => Err(CompileError::unsupported(
            line,
            "range bounds must be integer literals",
        )),
    }
}
