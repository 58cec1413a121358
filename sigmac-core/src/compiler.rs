//! Compiler orchestration.
//!
//! `compile` wires the pipeline together: parse, rewrite `for` loops,
//! lower to emission units, then linearize labels and emit the final
//! assembly text. Compilation is fail-fast: the first unsupported
//! construct aborts the whole compile with no partial output.

use crate::codegen::Lowerer;
use crate::emit::assemble;
use crate::error::CompileError;
use crate::parser::parse;
use crate::rewrite::desugar;

/// Compile source text into assembly text for the target machine.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let module = parse(source)?;
    let module = desugar(module)?;
    let (units, vars) = Lowerer::lower(&module)?;
    Ok(assemble(units, &vars))
}
