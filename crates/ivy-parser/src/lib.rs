//! Ivy parser crate.
//!
//! This crate provides the lexer and parser for Ivy contract source:
//! - Lexical analysis (tokenization)
//! - Abstract Syntax Tree (AST) definitions
//! - A recursive-descent parser producing a [`RawContract`]
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use ivy_parser::Parser;
//!
//! let arena = Bump::new();
//! let source = "contract TrivialLock(locked: Value) { clause unlock() { return locked } }";
//!
//! let contract = Parser::parse(source, &arena).unwrap();
//! assert_eq!(contract.clauses.len(), 1);
//! ```

pub mod ast;
pub mod lexer;

pub use ast::{Parser, RawContract};
pub use ivy_core::Span;
pub use lexer::{Lexer, Token, TokenKind};
