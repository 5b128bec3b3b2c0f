//! Abstract Syntax Tree (AST) for Ivy contracts.
//!
//! The tree is owned: later passes rewrite it by replacing whole subtrees,
//! so nodes are plain enums and structs rather than arena references.

mod decl;
mod expr;
mod parser;

pub use decl::*;
pub use expr::*;
pub use ivy_core::{ParseError, ParseErrorKind};
pub use parser::Parser;
