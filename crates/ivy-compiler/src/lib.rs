//! Ivy Compiler
//!
//! Compiles Ivy locking contracts into templates of VM bytecode.
//!
//! ## Architecture
//!
//! - **Front end**: parse, check references, check types
//! - **Middle**: desugar composite parameters and clause dispatch, lower to
//!   symbolic operations
//! - **Back end**: allocate stack positions, emit opcodes, optimize, assemble
//!
//! ## Modules
//!
//! - [`passes`]: the compilation passes, in pipeline order
//! - [`ir`]: operations passed between back-end passes
//! - [`bytecode`]: opcode table, tokens, assembler and disassembler
//! - [`template`]: compiled templates and instantiation
//! - [`options`]: compile configuration

pub mod bytecode;
pub mod ir;
pub mod options;
pub mod passes;
pub mod template;

pub use bytecode::{Assembler, OpCode, Token, assemble, disassemble};
pub use options::CompileOptions;
pub use template::{Argument, ClauseInfo, ParameterInfo, Template, ValueInfo, instantiate};

// Re-export the error types from core for convenience
pub use ivy_core::{IvyError, InstantiateError};

use bumpalo::Bump;
use ivy_parser::{Parser, RawContract};
use tracing::debug;

/// Parse and semantically check `source`, stopping before desugaring.
fn check(source: &str) -> Result<RawContract, IvyError> {
    let arena = Bump::new();
    let contract = Parser::parse(source, &arena)?;
    let contract = passes::check_references(contract)?;
    passes::check_types(contract)
}

/// Compile `source` into a template.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile(source: &str, options: &CompileOptions) -> Result<Template, IvyError> {
    let contract = check(source)?;

    let desugared = passes::desugar(&contract)?;
    let operations = passes::compile_to_intermediate(&desugared)?;
    let final_operations = passes::allocate_stack(&operations)?;

    let mut tokens = passes::emit(&final_operations);
    if options.optimize {
        tokens = passes::optimize(tokens);
    }

    let validated = Assembler::new().with_placeholders(true).assemble(&tokens)?;

    debug!(
        target: "ivy::compile",
        contract = %contract.name,
        clauses = contract.clauses.len(),
        tokens = tokens.len(),
        bytes = validated.len(),
        "template compiled"
    );
    Ok(Template::new(source, &contract, tokens)?)
}

/// The contract parameters of `source` with their inferred types.
pub fn contract_parameters(source: &str) -> Result<Vec<ParameterInfo>, IvyError> {
    Ok(template::parameter_infos(&check(source)?))
}

/// The clause descriptions of `source`.
pub fn template_clauses(source: &str) -> Result<Vec<ClauseInfo>, IvyError> {
    Ok(template::clause_infos(&check(source)?)?)
}
