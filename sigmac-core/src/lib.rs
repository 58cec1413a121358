//! Core compiler pipeline for sigmac.
//!
//! sigmac lowers a small imperative teaching language (integer
//! assignment, four-operator arithmetic, single-operator comparisons,
//! `if`, `while`, and `for` over `range(start, end)`) into textual
//! assembly for a simple register machine with an initialized-data
//! section. The pipeline is:
//!
//!   source text
//!     -> lexer     (tokens, with indentation as Indent/Dedent)
//!     -> parser    (syntax tree)
//!     -> rewrite   (for -> assign + while)
//!     -> codegen   (emission units + variable table)
//!     -> emit      (label linearization, halt, data section)
//!
//! Higher-level tools (the CLI and anything else) should depend on this
//! crate and call [`compile`] rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------

pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Rewrites and lowering
// ---------------------------------------------------------------------

pub mod rewrite;
pub mod codegen;

// ---------------------------------------------------------------------
// Back-end: assembly emission and compiler orchestration
// ---------------------------------------------------------------------

pub mod emit;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::compile;
pub use error::CompileError;
