//! Core types shared by the Ivy parser and compiler.
//!
//! - [`Span`]: source locations
//! - [`error`]: the error taxonomy used by every pass
//! - [`types`]: the Ivy type model and type classes
//! - [`builtin`]: builtin operators and functions

pub mod builtin;
pub mod error;
pub mod span;
pub mod types;

pub use builtin::Builtin;
pub use error::{
    AssemblerError, BugError, CompilationError, CompilerError, InstantiateError, IvyError,
    ParseError, ParseErrorKind,
};
pub use span::Span;
pub use types::{HashFunction, OtherType, Primitive, Type, TypeClass};
