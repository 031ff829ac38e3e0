//! Core library for the Jlang scripting language: a lexer and parser that
//! build an arena syntax tree, a tree-walking interpreter with per-node
//! resolution caches, and a tree dump used for debugging the front end.

use std::io::Write;

pub mod ast;
pub mod diagnostics;
pub mod dump;
pub mod environment;
pub mod function;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod stack;
pub mod value;

pub use ast::Ast;
pub use diagnostics::{
    Diagnostic, DiagnosticKind, JlangError, Result, SemanticError, SemanticErrorKind, SourceSpan,
};
pub use parser::parse_program;
pub use runtime::{ExecutionContext, Interpreter};
pub use value::{Value, Variant};

/// Parses `source` and runs it with default settings, writing to `out`.
/// Returns the sink once the program finishes.
pub fn run_source<W: Write>(source: &str, out: W) -> Result<W> {
    run_source_with(source, out, ExecutionContext::default())
}

pub fn run_source_with<W: Write>(source: &str, out: W, context: ExecutionContext) -> Result<W> {
    let ast = parse_program(source)?;
    let mut interpreter = Interpreter::with_context(&ast, out, context);
    interpreter.run()?;
    Ok(interpreter.into_output())
}
