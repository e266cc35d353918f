//! `jsaot-hirgen` — lowers the TypeScript/JavaScript surface AST into
//! `jsaot-hir`'s typed SSA-ish IR: the first of the pipeline's two lowering
//! passes (HIR → MIR → LLVM IR; this crate only produces the HIR tier).
//!
//! The module split mirrors `original_source/src/hir/`'s own file-per-concern
//! layout (`HIRGen_Functions.cpp`, `HIRGen_Classes.cpp`,
//! `HIRGen_Statements.cpp`, ...), one Rust module per original translation
//! unit:
//! - [`scope`] — symbol table / scope-stack machinery (§4.4).
//! - [`function`] — function/arrow lowering and closure-capture (§4.6).
//! - [`generator`] — `function*` lowering as an explicit state machine (§4.8).
//! - [`class`] — struct synthesis, constructors, virtual methods (§4.7).
//! - [`expr`] — expression lowering (§4.3).
//! - [`stmt`] — statement and control-flow lowering (§4.5).
//!
//! [`lower::HirGenerator`] is the single stateful pass that owns all of the
//! above and drives a [`ast::Program`] into a finished [`jsaot_hir::Module`].

#![warn(clippy::all)]

pub mod ast;
mod class;
pub mod error;
mod expr;
mod function;
mod generator;
pub mod lower;
mod runtime_abi;
mod scope;
mod stmt;

pub use error::{Diagnostic, LowerError, LowerResult, SourceLocation};
pub use lower::HirGenerator;

/// Lowers a complete program in one call — the entry point most callers
/// want instead of constructing [`HirGenerator`] directly.
pub fn lower_program(
    module_name: impl Into<String>,
    program: &ast::Program,
) -> LowerResult<(jsaot_hir::Module, Vec<Diagnostic>)> {
    HirGenerator::new(module_name).lower_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Literal, Program, Stmt};

    #[test]
    fn lowers_an_empty_program_to_a_main_function() {
        let program = Program { body: vec![] };
        let (module, diagnostics) = lower_program("empty", &program).unwrap();
        assert!(diagnostics.is_empty());
        assert!(module.get_function("main").is_some());
    }

    #[test]
    fn lowers_a_single_expression_statement() {
        let program = Program {
            body: vec![Stmt::Expression(Expr::Literal(Literal::Number(1.0)))],
        };
        let (module, diagnostics) = lower_program("one_stmt", &program).unwrap();
        assert!(diagnostics.is_empty());
        let main = module.get_function("main").unwrap();
        assert!(main.blocks.as_ref().unwrap().iter().any(|b| !b.instructions.is_empty()));
    }
}
