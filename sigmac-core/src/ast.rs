//! Syntax tree for the source language.
//!
//! The tree deliberately mirrors the restricted grammar: statements are
//! assignment and the three control constructs, expressions bottom out in
//! names and literals. Shapes that the compiler does not handle (chained
//! comparisons, calls other than the `for`-range iterator) are still
//! representable here; the lowering engine rejects them, not the parser.

use core::fmt;

/// Arithmetic operator of a binary expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOpKind {
    /// Instruction mnemonic for this operator.
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOpKind::Add => "add",
            BinOpKind::Sub => "sub",
            BinOpKind::Mul => "mul",
            BinOpKind::Div => "div",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
        }
    }
}

/// Relational operator of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOpKind {
    Gt,
    Ge,
    Lt,
    Le,
}

impl CmpOpKind {
    /// Conditional branch mnemonic taken when the comparison holds.
    pub fn jump_mnemonic(self) -> &'static str {
        match self {
            CmpOpKind::Gt => "jumpgt",
            CmpOpKind::Ge => "jumpge",
            CmpOpKind::Lt => "jumplt",
            CmpOpKind::Le => "jumple",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOpKind::Gt => ">",
            CmpOpKind::Ge => ">=",
            CmpOpKind::Lt => "<",
            CmpOpKind::Le => "<=",
        }
    }
}

/// A literal constant.
///
/// Only integers can be compiled; the float form exists so that a
/// non-integer assignment is a lowering error rather than a parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Float(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Variable reference.
    Name(String),
    /// Literal constant.
    Constant(Literal),
    /// Two-operand arithmetic.
    BinOp {
        left: Box<Expr>,
        op: BinOpKind,
        right: Box<Expr>,
    },
    /// Relational comparison. `ops` and `comparators` are parallel vectors
    /// so that a chained comparison like `a < b < c` survives parsing and
    /// can be rejected by name during lowering.
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOpKind>,
        comparators: Vec<Expr>,
    },
    /// Call shape; only legal as a `for` iterator (`range(a, b)`).
    Call { func: String, args: Vec<Expr> },
}

impl Expr {
    /// Short lowercase tag used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Name(_) => "name",
            Expr::Constant(_) => "constant",
            Expr::BinOp { .. } => "binary operation",
            Expr::Compare { .. } => "comparison",
            Expr::Call { .. } => "call",
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name(id) => write!(f, "{id}"),
            Expr::Constant(lit) => write!(f, "{lit}"),
            Expr::BinOp { left, op, right } => {
                write!(f, "{left} {} {right}", op.symbol())
            }
            Expr::Compare {
                left,
                ops,
                comparators,
            } => {
                write!(f, "{left}")?;
                for (op, comparator) in ops.iter().zip(comparators) {
                    write!(f, " {} {comparator}", op.symbol())?;
                }
                Ok(())
            }
            Expr::Call { func, args } => {
                write!(f, "{func}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A statement with its 1-based source line.
///
/// The line number is semantic, not just diagnostic: `if`/`while` derive
/// their jump labels from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `a = b = value`; every target must be a name, checked at lowering.
    Assign { targets: Vec<Expr>, value: Expr },
    If {
        test: Expr,
        body: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    /// `for <target> in <iter>:`; rewritten to assign + while before
    /// lowering, so only the `range(start, end)` iterator shape survives.
    For {
        target: String,
        iter: Expr,
        body: Vec<Stmt>,
    },
}

impl Stmt {
    /// Render an assignment the way it appeared in the source, for use as
    /// an instruction annotation. Control statements are never annotated.
    pub fn render_assign(targets: &[Expr], value: &Expr) -> String {
        let mut out = String::new();
        for target in targets {
            out.push_str(&target.to_string());
            out.push_str(" = ");
        }
        out.push_str(&value.to_string());
        out
    }
}

/// A whole compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_binop_like_source() {
        let expr = Expr::BinOp {
            left: Box::new(Expr::Name("a".to_string())),
            op: BinOpKind::Add,
            right: Box::new(Expr::Constant(Literal::Int(6))),
        };
        assert_eq!(expr.to_string(), "a + 6");
    }

    #[test]
    fn renders_chained_comparison() {
        let expr = Expr::Compare {
            left: Box::new(Expr::Name("a".to_string())),
            ops: vec![CmpOpKind::Lt, CmpOpKind::Lt],
            comparators: vec![Expr::Name("b".to_string()), Expr::Name("c".to_string())],
        };
        assert_eq!(expr.to_string(), "a < b < c");
    }

    #[test]
    fn renders_chained_assignment() {
        let rendered = Stmt::render_assign(
            &[Expr::Name("a".to_string()), Expr::Name("b".to_string())],
            &Expr::Constant(Literal::Int(5)),
        );
        assert_eq!(rendered, "a = b = 5");
    }
}
