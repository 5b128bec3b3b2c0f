//! Ivy: a compiler for locking contracts.
//!
//! Ivy contracts describe the conditions under which locked value may be
//! spent on a ledger. This crate compiles them into templates of VM
//! bytecode and instantiates templates with concrete arguments.
//!
//! # Example
//!
//! ```
//! use ivy::{Argument, compile_template, instantiate};
//!
//! let source = "contract LockWithPublicKey(publicKey: PublicKey, locked: Value) {
//!     clause spend(sig: Signature) {
//!         verify checkTxSig(publicKey, sig)
//!         return locked
//!     }
//! }";
//!
//! let template = compile_template(source).unwrap();
//! assert_eq!(template.instructions_text(), "publicKey TXSIGHASH SWAP CHECKSIG");
//!
//! let program = instantiate(&template, &[Argument::Bytes(vec![0x11; 32])]).unwrap();
//! assert_eq!(program[0], 32);
//! ```
//!
//! # Errors
//!
//! Mistakes in the contract source arrive as [`IvyError::Compiler`], with
//! a message of the form `"<Kind> at line L, column C: <detail>"`.
//! [`IvyError::Bug`] and [`IvyError::Assembler`] indicate a defect in the
//! compiler itself.

mod cache;

pub use cache::TemplateCache;
pub use ivy_compiler::{
    Argument, ClauseInfo, CompileOptions, ParameterInfo, Template, ValueInfo, disassemble,
};
pub use ivy_core::{
    AssemblerError, BugError, CompilationError, CompilerError, InstantiateError, IvyError,
    ParseError, Primitive, Span, Type,
};

/// Compile `source` with default options.
pub fn compile_template(source: &str) -> Result<Template, IvyError> {
    compile_template_with(source, &CompileOptions::default())
}

/// Compile `source` with `options`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile_template_with(source: &str, options: &CompileOptions) -> Result<Template, IvyError> {
    ivy_compiler::compile(source, options).map_err(|e| e.downgrade(source))
}

/// Fill a template's parameters and assemble the program.
pub fn instantiate(template: &Template, args: &[Argument]) -> Result<Vec<u8>, InstantiateError> {
    ivy_compiler::instantiate(template, args)
}

/// The contract parameters of `source` with their inferred types.
pub fn compile_contract_parameters(source: &str) -> Result<Vec<ParameterInfo>, IvyError> {
    ivy_compiler::contract_parameters(source).map_err(|e| e.downgrade(source))
}

/// The clause descriptions of `source`.
pub fn compile_template_clauses(source: &str) -> Result<Vec<ClauseInfo>, IvyError> {
    ivy_compiler::template_clauses(source).map_err(|e| e.downgrade(source))
}
