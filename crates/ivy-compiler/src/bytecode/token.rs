//! Assembler input tokens.

use std::fmt;

/// One word of assembler input.
///
/// Mnemonics also carry labels (`$a`) and jumps (`JUMPIF:a`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Mnemonic(String),
    /// A data push.
    Bytes(Vec<u8>),
    /// A number push, encoded as a minimal little-endian data push.
    Integer(i64),
    /// A contract parameter, filled in at instantiation.
    Parameter(String),
}

impl Token {
    pub fn mnemonic(text: impl Into<String>) -> Self {
        Token::Mnemonic(text.into())
    }

    /// Read one word of assembler text: numerals become integers, anything
    /// else a mnemonic.
    pub fn parse(word: &str) -> Self {
        match word.parse::<i64>() {
            Ok(n) => Token::Integer(n),
            Err(_) => Token::Mnemonic(word.to_string()),
        }
    }

    /// Parse whitespace-separated assembler text.
    pub fn parse_all(text: &str) -> Vec<Token> {
        text.split_whitespace().map(Token::parse).collect()
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, Token::Parameter(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Mnemonic(text) => f.write_str(text),
            Token::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Token::Integer(n) => write!(f, "{n}"),
            Token::Parameter(name) => f.write_str(name),
        }
    }
}

/// Space-separated rendering of a token stream.
pub fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
