//! Token types and definitions for the Ivy lexer.

use ivy_core::Span;
use std::fmt;

/// A token from the source code.
///
/// The `'ast` lifetime refers to the arena where the lexeme string is allocated.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'ast> {
    /// The type of token.
    pub kind: TokenKind,
    /// The source text of this token (allocated in arena).
    pub lexeme: &'ast str,
    /// Location in source.
    pub span: Span,
}

impl<'ast> Token<'ast> {
    /// Create a new token.
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'ast str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

/// All possible token types in Ivy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Literals
    // =========================================
    /// Decimal integer literal: `42`
    IntLiteral,
    /// Hex byte string: `0xdeadbeef`
    HexLiteral,

    /// User-defined identifier
    Identifier,

    // =========================================
    // Keywords
    // =========================================
    Contract,
    Clause,
    Verify,
    Output,
    Return,
    True,
    False,

    // =========================================
    // Punctuation
    // =========================================
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Dot,

    // =========================================
    // Operators
    // =========================================
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqualEqual,
    BangEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    /// End of input
    Eof,
    /// A character that starts no token; the error has been recorded.
    Error,
}

impl TokenKind {
    /// Human-readable description used in parse errors.
    pub fn description(&self) -> &'static str {
        use TokenKind::*;
        match self {
            IntLiteral => "integer literal",
            HexLiteral => "hex literal",
            Identifier => "identifier",
            Contract => "'contract'",
            Clause => "'clause'",
            Verify => "'verify'",
            Output => "'output'",
            Return => "'return'",
            True => "'true'",
            False => "'false'",
            LeftParen => "'('",
            RightParen => "')'",
            LeftBrace => "'{'",
            RightBrace => "'}'",
            LeftBracket => "'['",
            RightBracket => "']'",
            Comma => "','",
            Colon => "':'",
            Dot => "'.'",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            Percent => "'%'",
            Bang => "'!'",
            EqualEqual => "'=='",
            BangEqual => "'!='",
            Less => "'<'",
            Greater => "'>'",
            LessEqual => "'<='",
            GreaterEqual => "'>='",
            Eof => "end of file",
            Error => "invalid token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Map a keyword string to its [`TokenKind`], or `None` if not a keyword.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match ident {
        "contract" => Contract,
        "clause" => Clause,
        "verify" => Verify,
        "output" => Output,
        "return" => Return,
        "true" => True,
        "false" => False,
        _ => return None,
    })
}
