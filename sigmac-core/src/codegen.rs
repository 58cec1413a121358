//! Lowering engine: syntax tree -> emission units + variable table.
//!
//! Each statement is lowered into an append-only stream of `Unit`s that
//! mirrors source evaluation order plus the control edges inserted here.
//! Register and label state travels in a `RegCtx` with a strict
//! fork-vs-carry-forward discipline:
//!
//! - handlers receive their enclosing scope's context by shared reference
//!   and take an explicit value copy at scope entry (`if`/`while` body,
//!   statement boundary), so locks taken inside never leak to siblings;
//! - within one expression the copy is threaded mutably across the
//!   operand lowerings, so siblings of the same expression can never
//!   collide on a register.
//!
//! Variable declarations go to a single program-wide table regardless of
//! the scope they occur in; the first declaration of a name fixes its
//! initial value for good.

use crate::ast::{BinOpKind, Expr, Literal, Module, Stmt, StmtKind};
use crate::error::CompileError;

/// Highest allocatable register index. R0 is a hardwired zero and is
/// never handed out.
pub const REGISTER_POOL_MAX: u8 = 14;

/// Register used for the runtime update of an already-declared variable.
const SCRATCH_REGISTER: u8 = 1;

/// One element of the emission stream: either a finished instruction or a
/// label waiting to be attached to the next instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    Instr {
        text: String,
        /// Traceability annotation reproducing the source statement or
        /// expression; rendered into the comment column, never semantic.
        note: Option<String>,
    },
    Label(String),
}

/// Register allocation and label context for one lowering scope.
#[derive(Debug, Clone, Default)]
pub struct RegCtx {
    locked: Vec<u8>,
    target: Option<u8>,
    true_label: Option<String>,
    done_label: Option<String>,
    loop_label: Option<String>,
}

impl RegCtx {
    pub fn new() -> Self {
        RegCtx::default()
    }

    /// Claim the lowest free register in R1..R14, locking it for the rest
    /// of this context's lifetime. Locks are never released; a context
    /// that outlives too many allocations runs the pool dry.
    pub fn alloc(&mut self) -> Result<u8, CompileError> {
        for reg in 1..=REGISTER_POOL_MAX {
            if self.locked.contains(&reg) || self.target == Some(reg) {
                continue;
            }
            self.locked.push(reg);
            return Ok(reg);
        }
        Err(CompileError::RegisterExhaustion)
    }

    /// Pin the register that expression results must land in.
    pub fn pin_target(&mut self, reg: u8) {
        self.target = Some(reg);
    }

    /// Value copy taken at a scope or statement boundary: locks and labels
    /// carry over, the pinned target does not.
    pub fn fork(&self) -> RegCtx {
        RegCtx {
            target: None,
            ..self.clone()
        }
    }
}

/// Lowers a module into emission units and the ordered variable table.
pub struct Lowerer {
    units: Vec<Unit>,
    vars: Vec<(String, i32)>,
}

impl Lowerer {
    pub fn lower(module: &Module) -> Result<(Vec<Unit>, Vec<(String, i32)>), CompileError> {
        let mut lowerer = Lowerer {
            units: Vec::new(),
            vars: Vec::new(),
        };
        let root = RegCtx::new();
        for stmt in &module.body {
            lowerer.lower_stmt(stmt, &root)?;
        }
        Ok((lowerer.units, lowerer.vars))
    }

    fn lower_stmt(&mut self, stmt: &Stmt, ctx: &RegCtx) -> Result<(), CompileError> {
        match &stmt.kind {
            StmtKind::Assign { targets, value } => {
                self.lower_assign(stmt.line, targets, value, ctx)
            }
            StmtKind::If { test, body } => self.lower_if(stmt.line, test, body, ctx),
            StmtKind::While { test, body } => self.lower_while(stmt.line, test, body, ctx),
            StmtKind::For { .. } => Err(CompileError::unsupported(
                stmt.line,
                "'for' must be rewritten to assign + while before lowering",
            )),
        }
    }

    fn lower_assign(
        &mut self,
        line: u32,
        targets: &[Expr],
        value: &Expr,
        ctx: &RegCtx,
    ) -> Result<(), CompileError> {
        let mut names = Vec::with_capacity(targets.len());
        for target in targets {
            match target {
                Expr::Name(id) => names.push(id.as_str()),
                other => {
                    return Err(CompileError::unsupported(
                        line,
                        format!("cannot assign to a {}", other.kind_name()),
                    ));
                }
            }
        }

        let note = Stmt::render_assign(targets, value);
        match value {
            Expr::Constant(Literal::Int(constant)) => {
                // First assignment of a constant declares the variable in
                // the data section; later ones become a runtime update.
                for name in names {
                    if self.is_declared(name) {
                        self.push_instr(
                            format!("lea R{SCRATCH_REGISTER},{constant}"),
                            Some(note.clone()),
                        );
                        self.push_instr(
                            format!("store R{SCRATCH_REGISTER},{name}"),
                            Some(note.clone()),
                        );
                    } else {
                        self.vars.push((name.to_string(), *constant));
                    }
                }
                Ok(())
            }
            Expr::Constant(lit) => Err(CompileError::NonIntegerConstant {
                line,
                value: lit.to_string(),
            }),
            Expr::BinOp { left, op, right } => {
                let mut expr_ctx = ctx.fork();
                let result =
                    self.lower_binop(line, left, *op, right, &value.to_string(), &mut expr_ctx)?;
                for name in names {
                    self.push_instr(format!("store R{result},{name}"), Some(note.clone()));
                    if !self.is_declared(name) {
                        // Declared without a meaningful initial value.
                        self.vars.push((name.to_string(), 0));
                    }
                }
                Ok(())
            }
            other => Err(CompileError::unsupported(
                line,
                format!("cannot assign a {} value", other.kind_name()),
            )),
        }
    }

    /// Lower a two-operand arithmetic expression and return the register
    /// holding its result.
    fn lower_binop(
        &mut self,
        line: u32,
        left: &Expr,
        op: BinOpKind,
        right: &Expr,
        note: &str,
        ctx: &mut RegCtx,
    ) -> Result<u8, CompileError> {
        let target = match ctx.target {
            Some(reg) => reg,
            None => ctx.alloc()?,
        };
        let left_reg = ctx.alloc()?;
        let right_reg = ctx.alloc()?;
        self.load_operand(line, left, left_reg, Some(note))?;
        self.load_operand(line, right, right_reg, Some(note))?;
        self.push_instr(
            format!("{} R{target},R{left_reg},R{right_reg}", op.mnemonic()),
            Some(note.to_string()),
        );
        Ok(target)
    }

    /// Lower a branch test: compare the operands, jump to the true label
    /// on success, fall through to an unconditional jump to the done
    /// label otherwise. There is no explicit false label.
    fn lower_compare(&mut self, line: u32, test: &Expr, ctx: &RegCtx) -> Result<(), CompileError> {
        let (left, ops, comparators) = match test {
            Expr::Compare {
                left,
                ops,
                comparators,
            } => (left, ops, comparators),
            other => {
                return Err(CompileError::unsupported(
                    line,
                    format!("branch condition must be a comparison, found {}", other.kind_name()),
                ));
            }
        };
        if ops.len() != 1 || comparators.len() != 1 {
            return Err(CompileError::unsupported(
                line,
                "chained comparisons are not supported",
            ));
        }

        let mut ctx = ctx.clone();
        let left_reg = ctx.alloc()?;
        let right_reg = ctx.alloc()?;
        self.load_operand(line, left, left_reg, None)?;
        self.load_operand(line, &comparators[0], right_reg, None)?;
        self.push_instr(format!("cmp R{left_reg},R{right_reg}"), None);

        let true_label = ctx.true_label.as_deref().ok_or_else(|| {
            CompileError::unsupported(line, "comparison outside of a branch context")
        })?;
        self.push_instr(format!("{} {true_label}", ops[0].jump_mnemonic()), None);
        let done_label = ctx.done_label.as_deref().ok_or_else(|| {
            CompileError::unsupported(line, "comparison outside of a branch context")
        })?;
        self.push_instr(format!("jump {done_label}"), None);
        Ok(())
    }

    fn lower_if(
        &mut self,
        line: u32,
        test: &Expr,
        body: &[Stmt],
        ctx: &RegCtx,
    ) -> Result<(), CompileError> {
        let mut scope = ctx.fork();
        let true_label = format!("true{line}");
        let done_label = format!("done{line}");
        scope.true_label = Some(true_label.clone());
        scope.done_label = Some(done_label.clone());

        self.lower_compare(line, test, &scope)?;
        self.units.push(Unit::Label(true_label));
        for stmt in body {
            self.lower_stmt(stmt, &scope)?;
        }
        self.units.push(Unit::Label(done_label));
        Ok(())
    }

    fn lower_while(
        &mut self,
        line: u32,
        test: &Expr,
        body: &[Stmt],
        ctx: &RegCtx,
    ) -> Result<(), CompileError> {
        let mut scope = ctx.fork();
        let loop_label = format!("loop{line}");
        let true_label = format!("true{line}");
        let done_label = format!("done{line}");
        scope.loop_label = Some(loop_label.clone());
        scope.true_label = Some(true_label.clone());
        scope.done_label = Some(done_label.clone());

        // Pre-test loop: the test runs once per iteration, nothing is
        // hoisted out of the loop.
        self.units.push(Unit::Label(loop_label.clone()));
        self.lower_compare(line, test, &scope)?;
        self.units.push(Unit::Label(true_label));
        for stmt in body {
            self.lower_stmt(stmt, &scope)?;
        }
        let back_edge = scope.loop_label.as_deref().unwrap_or(&loop_label);
        self.push_instr(format!("jump {back_edge}"), None);
        self.units.push(Unit::Label(done_label));
        Ok(())
    }

    fn load_operand(
        &mut self,
        line: u32,
        operand: &Expr,
        reg: u8,
        note: Option<&str>,
    ) -> Result<(), CompileError> {
        let text = match operand {
            Expr::Name(id) => format!("load R{reg},{id}"),
            Expr::Constant(lit) => format!("lea R{reg},{lit}"),
            other => {
                return Err(CompileError::unsupported(
                    line,
                    format!("operands must be names or constants, found a nested {}", other.kind_name()),
                ));
            }
        };
        self.push_instr(text, note.map(str::to_string));
        Ok(())
    }

    fn is_declared(&self, name: &str) -> bool {
        self.vars.iter().any(|(declared, _)| declared == name)
    }

    fn push_instr(&mut self, text: String, note: Option<String>) {
        self.units.push(Unit::Instr { text, note });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::rewrite::desugar;

    fn lowered(source: &str) -> (Vec<Unit>, Vec<(String, i32)>) {
        let module = desugar(parse(source).expect("parse")).expect("desugar");
        Lowerer::lower(&module).expect("lower")
    }

    fn instr_texts(units: &[Unit]) -> Vec<&str> {
        units
            .iter()
            .filter_map(|unit| match unit {
                Unit::Instr { text, .. } => Some(text.as_str()),
                Unit::Label(_) => None,
            })
            .collect()
    }

    #[test]
    fn allocates_lowest_free_registers_in_order() {
        let mut ctx = RegCtx::new();
        assert_eq!(ctx.alloc().expect("register"), 1);
        assert_eq!(ctx.alloc().expect("register"), 2);
        assert_eq!(ctx.alloc().expect("register"), 3);
    }

    #[test]
    fn allocator_skips_pinned_target() {
        let mut ctx = RegCtx::new();
        ctx.pin_target(1);
        assert_eq!(ctx.alloc().expect("register"), 2);
    }

    #[test]
    fn allocator_reports_exhaustion() {
        let mut ctx = RegCtx::new();
        for expected in 1..=REGISTER_POOL_MAX {
            assert_eq!(ctx.alloc().expect("register"), expected);
        }
        let err = ctx.alloc().unwrap_err();
        assert!(matches!(err, CompileError::RegisterExhaustion));
    }

    #[test]
    fn fork_keeps_locks_but_clears_target() {
        let mut ctx = RegCtx::new();
        ctx.pin_target(5);
        ctx.alloc().expect("register");
        let mut forked = ctx.fork();
        // R1 stays locked in the fork, the pinned target does not.
        assert_eq!(forked.alloc().expect("register"), 2);
        assert_eq!(forked.alloc().expect("register"), 3);
        assert_eq!(forked.alloc().expect("register"), 4);
        assert_eq!(forked.alloc().expect("register"), 5);
    }

    #[test]
    fn first_constant_assignment_emits_no_instructions() {
        let (units, vars) = lowered("a = 15");
        assert!(units.is_empty());
        assert_eq!(vars, vec![("a".to_string(), 15)]);
    }

    #[test]
    fn constant_reassignment_updates_through_register_one() {
        let (units, vars) = lowered("a = 15\na = 19");
        assert_eq!(instr_texts(&units), vec!["lea R1,19", "store R1,a"]);
        // The data section keeps the first value.
        assert_eq!(vars, vec![("a".to_string(), 15)]);
    }

    #[test]
    fn binop_stages_left_then_right_into_fresh_registers() {
        let (units, vars) = lowered("a = 15\nb = 21\nc = a + b");
        assert_eq!(
            instr_texts(&units),
            vec!["load R2,a", "load R3,b", "add R1,R2,R3", "store R1,c"]
        );
        assert_eq!(
            vars,
            vec![
                ("a".to_string(), 15),
                ("b".to_string(), 21),
                ("c".to_string(), 0),
            ]
        );
    }

    #[test]
    fn sibling_statements_reuse_the_same_registers() {
        let (units, _) = lowered("c = a + b\nd = a + c");
        assert_eq!(
            instr_texts(&units),
            vec![
                "load R2,a",
                "load R3,b",
                "add R1,R2,R3",
                "store R1,c",
                "load R2,a",
                "load R3,c",
                "add R1,R2,R3",
                "store R1,d",
            ]
        );
    }

    #[test]
    fn annotates_instructions_with_source_text() {
        let (units, _) = lowered("e = a + 6");
        let notes: Vec<Option<&str>> = units
            .iter()
            .filter_map(|unit| match unit {
                Unit::Instr { note, .. } => Some(note.as_deref()),
                Unit::Label(_) => None,
            })
            .collect();
        assert_eq!(
            notes,
            vec![
                Some("a + 6"),
                Some("a + 6"),
                Some("a + 6"),
                Some("e = a + 6"),
            ]
        );
    }

    #[test]
    fn compare_lines_carry_no_annotation() {
        let (units, _) = lowered("a = 4\nif a > 2:\n    a = 7");
        let cmp_note = units.iter().find_map(|unit| match unit {
            Unit::Instr { text, note } if text.starts_with("cmp") => Some(note.clone()),
            _ => None,
        });
        assert_eq!(cmp_note, Some(None));
    }

    #[test]
    fn if_emits_labels_around_body() {
        let (units, _) = lowered("a = 4\nif a > 2:\n    a = 7");
        assert_eq!(
            units,
            vec![
                Unit::Instr {
                    text: "load R1,a".to_string(),
                    note: None,
                },
                Unit::Instr {
                    text: "lea R2,2".to_string(),
                    note: None,
                },
                Unit::Instr {
                    text: "cmp R1,R2".to_string(),
                    note: None,
                },
                Unit::Instr {
                    text: "jumpgt true2".to_string(),
                    note: None,
                },
                Unit::Instr {
                    text: "jump done2".to_string(),
                    note: None,
                },
                Unit::Label("true2".to_string()),
                Unit::Instr {
                    text: "lea R1,7".to_string(),
                    note: Some("a = 7".to_string()),
                },
                Unit::Instr {
                    text: "store R1,a".to_string(),
                    note: Some("a = 7".to_string()),
                },
                Unit::Label("done2".to_string()),
            ]
        );
    }

    #[test]
    fn while_emits_loop_label_test_body_and_back_edge() {
        let (units, _) = lowered("i = 3\nwhile i < 8:\n    i = i + 1");
        let labels: Vec<&str> = units
            .iter()
            .filter_map(|unit| match unit {
                Unit::Label(name) => Some(name.as_str()),
                Unit::Instr { .. } => None,
            })
            .collect();
        assert_eq!(labels, vec!["loop2", "true2", "done2"]);
        assert_eq!(
            instr_texts(&units).last(),
            Some(&"jump loop2"),
            "body must end with the back edge"
        );
    }

    #[test]
    fn rejects_chained_comparison() {
        let module = parse("if a < b < c:\n    x = 1").expect("parse");
        let err = Lowerer::lower(&module).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedConstruct { line: 1, .. }));
    }

    #[test]
    fn rejects_nested_expression_operand() {
        let module = parse("x = a + b + c").expect("parse");
        let err = Lowerer::lower(&module).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn rejects_non_name_assignment_target() {
        let module = parse("5 = x").expect("parse");
        let err = Lowerer::lower(&module).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn rejects_name_as_assignment_value() {
        let module = parse("x = y").expect("parse");
        let err = Lowerer::lower(&module).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn rejects_non_integer_constant() {
        let module = parse("x = 1.5").expect("parse");
        let err = Lowerer::lower(&module).unwrap_err();
        assert!(matches!(
            err,
            CompileError::NonIntegerConstant { line: 1, .. }
        ));
    }

    #[test]
    fn rejects_non_comparison_branch_test() {
        let module = parse("if a + 1:\n    x = 1").expect("parse");
        let err = Lowerer::lower(&module).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn rejects_unrewritten_for_statement() {
        let module = parse("for i in range(0, 3):\n    x = 1").expect("parse");
        let err = Lowerer::lower(&module).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedConstruct { .. }));
    }
}
