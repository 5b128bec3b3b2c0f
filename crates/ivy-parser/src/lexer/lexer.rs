//! Main lexer implementation for Ivy.
//!
//! The [`Lexer`] converts source text into a stream of [`Token`]s, dispatching
//! on the first character of each token. Lexemes are copied into the arena.

use bumpalo::Bump;
use ivy_core::{ParseError, ParseErrorKind, Span};

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, lookup_keyword};

/// Lexer for Ivy source code.
///
/// The `'src` lifetime is the source string being lexed (temporary).
/// The `'ast` lifetime is the arena where token lexemes are allocated (persists).
pub struct Lexer<'src, 'ast> {
    /// Low-level character cursor.
    cursor: Cursor<'src>,
    /// Arena for allocating token lexemes.
    arena: &'ast Bump,
    /// Accumulated errors.
    errors: Vec<ParseError>,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
            errors: Vec::new(),
        }
    }

    /// Take accumulated errors, leaving an empty vec.
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    /// Check if any errors occurred.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Token<'ast> {
        self.skip_trivia();

        let start_line = self.cursor.line();
        let start_col = self.cursor.column();
        let start_offset = self.cursor.offset();

        let Some(first) = self.cursor.peek() else {
            return Token::new(TokenKind::Eof, "", Span::point(start_line, start_col));
        };

        match first {
            '0' if matches!(self.cursor.peek_nth(1), Some('x' | 'X')) => {
                self.scan_hex(start_line, start_col, start_offset)
            }
            c if c.is_ascii_digit() => {
                self.cursor.eat_while(|c| c.is_ascii_digit());
                self.make_token(TokenKind::IntLiteral, start_line, start_col, start_offset)
            }
            c if is_ident_start(c) => self.scan_identifier(start_line, start_col, start_offset),
            _ => self.scan_operator(start_line, start_col, start_offset),
        }
    }

    // =========================================
    // Internal: Token scanning
    // =========================================

    /// Skip whitespace and `//` line comments.
    fn skip_trivia(&mut self) {
        loop {
            self.cursor.eat_while(|c| c.is_ascii_whitespace());
            if self.cursor.peek() == Some('/') && self.cursor.peek_nth(1) == Some('/') {
                self.cursor.eat_while(|c| c != '\n');
            } else {
                break;
            }
        }
    }

    /// Create a token from start position to current position.
    /// Copies the lexeme into the arena.
    fn make_token(
        &self,
        kind: TokenKind,
        start_line: u32,
        start_col: u32,
        start_offset: u32,
    ) -> Token<'ast> {
        let len = self.cursor.offset() - start_offset;
        let span = Span::new(start_line, start_col, len);
        let lexeme = self.arena.alloc_str(self.cursor.slice_from(start_offset));
        Token::new(kind, lexeme, span)
    }

    /// Create an error token and record the error.
    fn make_error(&mut self, error: ParseError) -> Token<'ast> {
        let span = error.span;
        self.errors.push(error);
        Token::new(TokenKind::Error, "", span)
    }

    /// Scan a `0x` byte-string literal.
    fn scan_hex(&mut self, start_line: u32, start_col: u32, start_offset: u32) -> Token<'ast> {
        self.cursor.advance(); // '0'
        self.cursor.advance(); // 'x'
        let digits = self.cursor.eat_while(is_ident_continue);

        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            let len = self.cursor.offset() - start_offset;
            return self.make_error(ParseError::new(
                ParseErrorKind::InvalidLiteral,
                Span::new(start_line, start_col, len),
                format!("invalid hex digit '{bad}'"),
            ));
        }

        self.make_token(TokenKind::HexLiteral, start_line, start_col, start_offset)
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(
        &mut self,
        start_line: u32,
        start_col: u32,
        start_offset: u32,
    ) -> Token<'ast> {
        self.cursor.eat_while(is_ident_continue);
        let lexeme = self.cursor.slice_from(start_offset);
        let kind = lookup_keyword(lexeme).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, start_line, start_col, start_offset)
    }

    /// Scan an operator or punctuation token.
    fn scan_operator(&mut self, start_line: u32, start_col: u32, start_offset: u32) -> Token<'ast> {
        let Some(c) = self.cursor.advance() else {
            return Token::new(TokenKind::Eof, "", Span::point(start_line, start_col));
        };
        let next = self.cursor.peek();

        let kind = match (c, next) {
            ('(', _) => TokenKind::LeftParen,
            (')', _) => TokenKind::RightParen,
            ('{', _) => TokenKind::LeftBrace,
            ('}', _) => TokenKind::RightBrace,
            ('[', _) => TokenKind::LeftBracket,
            (']', _) => TokenKind::RightBracket,
            (',', _) => TokenKind::Comma,
            (':', _) => TokenKind::Colon,
            ('.', _) => TokenKind::Dot,
            ('+', _) => TokenKind::Plus,
            ('-', _) => TokenKind::Minus,
            ('*', _) => TokenKind::Star,
            ('/', _) => TokenKind::Slash,
            ('%', _) => TokenKind::Percent,

            ('=', Some('=')) => {
                self.cursor.advance();
                TokenKind::EqualEqual
            }
            ('!', Some('=')) => {
                self.cursor.advance();
                TokenKind::BangEqual
            }
            ('!', _) => TokenKind::Bang,
            ('<', Some('=')) => {
                self.cursor.advance();
                TokenKind::LessEqual
            }
            ('<', _) => TokenKind::Less,
            ('>', Some('=')) => {
                self.cursor.advance();
                TokenKind::GreaterEqual
            }
            ('>', _) => TokenKind::Greater,

            _ => {
                let len = self.cursor.offset() - start_offset;
                return self.make_error(ParseError::new(
                    ParseErrorKind::UnexpectedChar,
                    Span::new(start_line, start_col, len),
                    format!("unexpected character '{c}'"),
                ));
            }
        };

        self.make_token(kind, start_line, start_col, start_offset)
    }
}

/// Implement Iterator for convenient token streaming.
impl<'src, 'ast> Iterator for Lexer<'src, 'ast> {
    type Item = Token<'ast>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}
