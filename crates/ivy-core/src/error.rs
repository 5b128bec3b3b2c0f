//! Error types for the Ivy compiler.
//!
//! Every phase of the pipeline reports through one of these types:
//!
//! ```text
//! IvyError (top-level wrapper)
//! ├── ParseError        - lexing/parsing errors (with ParseErrorKind)
//! ├── CompilationError  - NameError / IvyTypeError / ValueError, shown to users
//! ├── BugError          - an invariant broken by an earlier pass (compiler defect)
//! ├── AssemblerError    - label, hex and mnemonic failures while assembling
//! └── CompilerError     - a user error downgraded to a message plus the source
//!
//! InstantiateError      - argument-count and assembly failures of `instantiate`
//! ```
//!
//! `ParseError` and `CompilationError` are recoverable: `compile_template`
//! folds them into a [`CompilerError`]. `BugError` and `AssemblerError` are
//! fatal to the call that raised them.

use thiserror::Error;

use crate::Span;

fn location(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!(" at {}", span.describe()),
        None => String::new(),
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

/// Categories of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// A specific token was expected but not found.
    ExpectedToken,
    /// An unexpected token was encountered.
    UnexpectedToken,
    /// Unexpected end of input.
    UnexpectedEof,
    /// An expression was expected.
    ExpectedExpression,
    /// An identifier was expected.
    ExpectedIdentifier,
    /// A type was expected.
    ExpectedType,
    /// A type name that the language does not define.
    UnknownType,
    /// A function name that is not a builtin.
    UnknownFunction,
    /// A literal could not be decoded.
    InvalidLiteral,
    /// A character that starts no token.
    UnexpectedChar,
    /// A clause with more than one `return`.
    DuplicateReturn,
}

impl ParseErrorKind {
    /// Get a human-readable description of this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::ExpectedType => "expected type",
            ParseErrorKind::UnknownType => "unknown type",
            ParseErrorKind::UnknownFunction => "unknown function",
            ParseErrorKind::InvalidLiteral => "invalid literal",
            ParseErrorKind::UnexpectedChar => "unexpected character",
            ParseErrorKind::DuplicateReturn => "duplicate return",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parse error with location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("ParseError at {}: {message}", .span.describe())]
pub struct ParseError {
    /// The category of this error.
    pub kind: ParseErrorKind,
    /// The source location where the error occurred.
    pub span: Span,
    /// A detailed error message.
    pub message: String,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Create an "expected token" error.
    pub fn expected_token(span: Span, expected: &str, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            span,
            format!("expected {expected}, found {found}"),
        )
    }

    /// Create an "unexpected EOF" error.
    pub fn unexpected_eof(span: Span) -> Self {
        Self::new(ParseErrorKind::UnexpectedEof, span, "unexpected end of file")
    }

    /// Create an "expected identifier" error.
    pub fn expected_identifier(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedIdentifier,
            span,
            format!("expected identifier, found {found}"),
        )
    }

    /// Create an "expected expression" error.
    pub fn expected_expression(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedExpression,
            span,
            format!("expected expression, found {found}"),
        )
    }
}

// ============================================================================
// Compilation Errors
// ============================================================================

/// User-facing errors raised by the semantic passes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// An undefined, duplicated or unused identifier.
    #[error("NameError{}: {message}", location(.span))]
    Name {
        /// Description of the problem.
        message: String,
        /// Where the identifier appears, if known.
        span: Option<Span>,
    },

    /// A type mismatch, arity mismatch, illegal parameter type or a
    /// violated value-disposal rule.
    #[error("IvyTypeError{}: {message}", location(.span))]
    Type {
        /// Description of the problem.
        message: String,
        /// Where the problem was detected, if known.
        span: Option<Span>,
    },

    /// A value-level violation.
    #[error("ValueError{}: {message}", location(.span))]
    Value {
        /// Description of the problem.
        message: String,
        /// Where the problem was detected, if known.
        span: Option<Span>,
    },
}

impl CompilationError {
    /// Create a NameError.
    pub fn name_error(message: impl Into<String>, span: impl Into<Option<Span>>) -> Self {
        CompilationError::Name {
            message: message.into(),
            span: span.into(),
        }
    }

    /// Create an IvyTypeError.
    pub fn type_error(message: impl Into<String>, span: impl Into<Option<Span>>) -> Self {
        CompilationError::Type {
            message: message.into(),
            span: span.into(),
        }
    }

    /// Create a ValueError.
    pub fn value_error(message: impl Into<String>, span: impl Into<Option<Span>>) -> Self {
        CompilationError::Value {
            message: message.into(),
            span: span.into(),
        }
    }

    /// The error kind as it appears in messages.
    pub fn kind(&self) -> &'static str {
        match self {
            CompilationError::Name { .. } => "NameError",
            CompilationError::Type { .. } => "IvyTypeError",
            CompilationError::Value { .. } => "ValueError",
        }
    }

    /// The detail message without kind or location.
    pub fn message(&self) -> &str {
        match self {
            CompilationError::Name { message, .. }
            | CompilationError::Type { message, .. }
            | CompilationError::Value { message, .. } => message,
        }
    }

    /// Get the span where this error occurred, if known.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompilationError::Name { span, .. }
            | CompilationError::Type { span, .. }
            | CompilationError::Value { span, .. } => *span,
        }
    }
}

// ============================================================================
// Bug Errors
// ============================================================================

/// An invariant that an earlier pass should have guaranteed does not hold.
///
/// Never caused by user input on a correct compiler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("BugError: {message}")]
pub struct BugError {
    /// Description of the broken invariant.
    pub message: String,
}

impl BugError {
    /// Create a new bug error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Assembler Errors
// ============================================================================

/// Errors that occur while turning a token stream into bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    /// A jump refers to a label that is never defined.
    #[error("AssemblerError: undefined label '{0}'")]
    UndefinedLabel(String),

    /// A label is defined twice.
    #[error("AssemblerError: label '{0}' is defined more than once")]
    DuplicateLabel(String),

    /// A `0x` literal with an odd number of digits.
    #[error("AssemblerError: hex literal '{0}' has an odd number of digits")]
    OddHexLength(String),

    /// A `0x` literal containing a non-hex character.
    #[error("AssemblerError: invalid hex digit '{ch}' in '{literal}'")]
    InvalidHexDigit {
        /// The offending literal.
        literal: String,
        /// The offending character.
        ch: char,
    },

    /// A word that is not a known mnemonic.
    #[error("AssemblerError: unknown mnemonic '{0}'")]
    UnknownMnemonic(String),

    /// A parameter placeholder reached the assembler unfilled.
    #[error("AssemblerError: parameter '{0}' has no value")]
    UnfilledParameter(String),

    /// A payload or jump offset that does not fit in 32 bits.
    #[error("AssemblerError: {0} bytes exceed the 32-bit limit")]
    TooLarge(usize),

    /// Bytecode ends inside an instruction's operand.
    #[error("AssemblerError: bytecode truncated at offset {0}")]
    Truncated(usize),
}

// ============================================================================
// Downgraded Compiler Errors
// ============================================================================

/// A recoverable compile failure, returned to callers together with the
/// source text that produced it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct CompilerError {
    /// The contract source that failed to compile.
    pub source_text: String,
    /// `"<Kind> at line L, column C: <detail>"`, or `"<Kind>: <detail>"`
    /// when no location is known.
    pub message: String,
}

impl CompilerError {
    /// Create a compiler error from a source and any displayable error.
    pub fn new(source_text: impl Into<String>, error: &impl std::fmt::Display) -> Self {
        Self {
            source_text: source_text.into(),
            message: error.to_string(),
        }
    }
}

// ============================================================================
// Instantiation Errors
// ============================================================================

/// Errors raised while instantiating a template with concrete arguments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstantiateError {
    /// The number of arguments does not match the template.
    #[error("template '{template}' expects {expected} argument(s), got {got}")]
    ArgumentCount {
        /// Template name.
        template: String,
        /// Number of arguments the template needs.
        expected: usize,
        /// Number of arguments supplied.
        got: usize,
    },

    /// Assembling the filled-in program failed.
    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    /// The template itself is malformed.
    #[error(transparent)]
    Bug(#[from] BugError),
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// The unified error type for the compilation pipeline.
///
/// Passes raise `Parse`, `Compilation`, `Bug` and `Assembler`;
/// `compile_template` converts `Parse` and `Compilation` into `Compiler`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IvyError {
    /// A parse error.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A NameError, IvyTypeError or ValueError.
    #[error(transparent)]
    Compilation(#[from] CompilationError),

    /// A compiler defect.
    #[error(transparent)]
    Bug(#[from] BugError),

    /// An assembler failure.
    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    /// A user error downgraded for the caller.
    #[error(transparent)]
    Compiler(#[from] CompilerError),
}

impl IvyError {
    /// Whether this error is caused by the contract source rather than the
    /// compiler.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            IvyError::Parse(_) | IvyError::Compilation(_) | IvyError::Compiler(_)
        )
    }

    /// Whether this error indicates a compiler defect.
    pub fn is_bug(&self) -> bool {
        matches!(self, IvyError::Bug(_))
    }

    /// Fold recoverable errors into a [`CompilerError`] carrying `source`.
    /// Fatal errors pass through unchanged.
    pub fn downgrade(self, source: &str) -> IvyError {
        match self {
            IvyError::Parse(e) => IvyError::Compiler(CompilerError::new(source, &e)),
            IvyError::Compilation(e) => IvyError::Compiler(CompilerError::new(source, &e)),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compilation_error_with_location() {
        let err = CompilationError::name_error("unused parameter 'a'", Span::new(1, 12, 1));
        assert_eq!(
            err.to_string(),
            "NameError at line 1, column 12: unused parameter 'a'"
        );
        assert_eq!(err.kind(), "NameError");
    }

    #[test]
    fn compilation_error_without_location() {
        let err = CompilationError::type_error("contract has no Value parameter", None);
        assert_eq!(
            err.to_string(),
            "IvyTypeError: contract has no Value parameter"
        );
        assert_eq!(err.span(), None);
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::expected_token(Span::new(2, 4, 1), "'{'", "'('");
        assert_eq!(
            err.to_string(),
            "ParseError at line 2, column 4: expected '{', found '('"
        );
    }

    #[test]
    fn downgrade_keeps_source_and_message() {
        let err: IvyError = CompilationError::type_error("bad", Span::point(1, 1)).into();
        let downgraded = err.downgrade("contract X() {}");
        match downgraded {
            IvyError::Compiler(e) => {
                assert_eq!(e.source_text, "contract X() {}");
                assert_eq!(e.message, "IvyTypeError at line 1, column 1: bad");
            }
            other => panic!("expected compiler error, got {other:?}"),
        }
    }

    #[test]
    fn downgrade_passes_bugs_through() {
        let err: IvyError = BugError::new("stack underflow").into();
        assert!(err.clone().downgrade("src").is_bug());
        assert!(!err.is_user_error());
    }

    #[test]
    fn assembler_error_display() {
        let err = AssemblerError::UndefinedLabel("a".into());
        assert_eq!(err.to_string(), "AssemblerError: undefined label 'a'");
    }
}
