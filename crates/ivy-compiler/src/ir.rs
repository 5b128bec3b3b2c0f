//! Intermediate representations passed between the back-end passes.
//!
//! - [`Operation`]: symbolic, name-addressed operations from the
//!   intermediate compiler
//! - [`FinalOperation`]: position-addressed operations from the stack
//!   allocator

use std::fmt;

use ivy_core::Builtin;
use ivy_parser::ast::{Literal, ReferenceCounts};

/// A VM operation that consumes stack arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Builtin(Builtin),
    Verify,
    CheckOutput,
    /// Asset of the value locked by the running contract.
    Asset,
    /// Amount of the value locked by the running contract.
    Amount,
}

impl Instruction {
    /// Number of results left on the stack.
    pub fn results(self) -> usize {
        match self {
            Instruction::Verify => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Builtin(builtin) => write!(f, "{builtin}"),
            Instruction::Verify => f.write_str("verify"),
            Instruction::CheckOutput => f.write_str("checkOutput"),
            Instruction::Asset => f.write_str("asset"),
            Instruction::Amount => f.write_str("amount"),
        }
    }
}

/// A symbolic operation. Variables are addressed by slot key.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    BeginContract {
        /// Stack parameters in declaration order.
        parameters: Vec<String>,
        clause_selector: Option<String>,
        references: ReferenceCounts,
    },
    Get(String),
    Push(Literal),
    Instruction {
        instruction: Instruction,
        /// Number of stack arguments consumed.
        args: usize,
    },
    BeginIf {
        else_tag: String,
    },
    Else {
        else_tag: String,
        end_tag: String,
    },
    EndIf {
        end_tag: String,
    },
    BeginClause {
        name: String,
        /// Witness arguments, first argument deepest.
        parameters: Vec<String>,
        references: ReferenceCounts,
    },
    EndClause,
}

/// A position-addressed operation. No names survive except parameter
/// placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalOperation {
    PushParameter(String),
    Pick(usize),
    Roll(usize),
    Push(Literal),
    Instruction(Instruction),
    BeginIf { else_tag: String },
    Else { else_tag: String, end_tag: String },
    EndIf { end_tag: String },
    Drop,
}
