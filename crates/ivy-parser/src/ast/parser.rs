//! Recursive-descent parser for Ivy contracts.
//!
//! Declarations are parsed top-down; expressions use Pratt parsing with the
//! binding powers in [`binary_op`].

use bumpalo::Bump;
use ivy_core::{Builtin, HashFunction, ParseError, ParseErrorKind, Type};

use super::decl::{Assertion, Clause, Output, Parameter, RawContract, Return};
use super::expr::{ASSET_AMOUNT_SUFFIX, Call, Expression, Literal, Variable};
use crate::lexer::{Lexer, Token, TokenKind};

/// Binding power of prefix `!` and `-`.
const PREFIX_BP: u8 = 9;

/// Parser state over a fully lexed token buffer.
pub struct Parser<'ast> {
    tokens: Vec<Token<'ast>>,
    pos: usize,
}

impl<'ast> Parser<'ast> {
    /// Parse a complete contract.
    ///
    /// Token lexemes are allocated in `arena`; the returned AST owns its data.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse(source: &str, arena: &'ast Bump) -> Result<RawContract, ParseError> {
        let mut lexer = Lexer::new(source, arena);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if eof {
                break;
            }
        }
        if let Some(error) = lexer.take_errors().into_iter().next() {
            return Err(error);
        }

        let mut parser = Parser { tokens, pos: 0 };
        let contract = parser.parse_contract()?;
        parser.expect(TokenKind::Eof)?;
        Ok(contract)
    }

    // =========================================
    // Token helpers
    // =========================================

    fn peek(&self) -> Token<'ast> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Token<'ast> {
        let last = self.tokens.len() - 1;
        self.tokens[(self.pos + n).min(last)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token<'ast> {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'ast>, ParseError> {
        let token = self.peek();
        if token.kind == kind {
            return Ok(self.advance());
        }
        if token.kind == TokenKind::Eof {
            return Err(ParseError::unexpected_eof(token.span));
        }
        Err(ParseError::expected_token(
            token.span,
            kind.description(),
            &describe(&token),
        ))
    }

    fn expect_identifier(&mut self) -> Result<Token<'ast>, ParseError> {
        let token = self.peek();
        if token.kind == TokenKind::Identifier {
            return Ok(self.advance());
        }
        Err(ParseError::expected_identifier(token.span, &describe(&token)))
    }

    // =========================================
    // Declarations
    // =========================================

    fn parse_contract(&mut self) -> Result<RawContract, ParseError> {
        let start = self.expect(TokenKind::Contract)?.span;
        let name = self.expect_identifier()?;
        let parameters = self.parse_parameter_list()?;
        self.expect(TokenKind::LeftBrace)?;

        let mut clauses = vec![self.parse_clause()?];
        while self.check(TokenKind::Clause) {
            clauses.push(self.parse_clause()?);
        }
        self.expect(TokenKind::RightBrace)?;

        Ok(RawContract {
            name: name.lexeme.to_string(),
            parameters,
            clauses,
            references: None,
            span: start.merge(name.span),
        })
    }

    /// `"(" (group ("," group)*)? ")"` where a group is `a, b: Type`.
    fn parse_parameter_list(&mut self) -> Result<Vec<Parameter>, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let mut parameters = Vec::new();
        if self.eat(TokenKind::RightParen) {
            return Ok(parameters);
        }

        loop {
            let mut names = vec![self.expect_identifier()?];
            while self.eat(TokenKind::Comma) {
                names.push(self.expect_identifier()?);
            }
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            parameters.extend(
                names
                    .into_iter()
                    .map(|name| Parameter::new(name.lexeme, ty.clone(), name.span)),
            );

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::RightParen)?;
        Ok(parameters)
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let token = self.peek();
        if token.kind != TokenKind::Identifier {
            return Err(ParseError::new(
                ParseErrorKind::ExpectedType,
                token.span,
                format!("expected type, found {}", describe(&token)),
            ));
        }
        self.advance();

        if let Some(function) = HashFunction::from_name(token.lexeme)
            && self.eat(TokenKind::LeftParen)
        {
            let input = self.parse_type()?;
            self.expect(TokenKind::RightParen)?;
            return Ok(Type::hash(function, input));
        }

        Type::from_name(token.lexeme).ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::UnknownType,
                token.span,
                format!("unknown type '{}'", token.lexeme),
            )
        })
    }

    fn parse_clause(&mut self) -> Result<Clause, ParseError> {
        let start = self.expect(TokenKind::Clause)?.span;
        let name = self.expect_identifier()?;
        let parameters = self.parse_parameter_list()?;
        self.expect(TokenKind::LeftBrace)?;

        let mut clause = Clause {
            name: name.lexeme.to_string(),
            parameters,
            assertions: Vec::new(),
            outputs: Vec::new(),
            returned: None,
            references: None,
            span: start.merge(name.span),
        };

        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Verify => {
                    self.advance();
                    let expression = self.parse_expr(0)?;
                    clause.assertions.push(Assertion {
                        span: token.span.merge(expression.span()),
                        expression,
                    });
                }
                TokenKind::Output => {
                    self.advance();
                    let program = self.parse_variable_name()?;
                    self.expect(TokenKind::LeftParen)?;
                    let value = self.parse_variable_name()?;
                    let end = self.expect(TokenKind::RightParen)?;
                    clause.outputs.push(Output {
                        program,
                        value,
                        asset_amount: None,
                        index: None,
                        span: token.span.merge(end.span),
                    });
                }
                TokenKind::Return => {
                    self.advance();
                    let value = self.parse_variable_name()?;
                    if clause.returned.is_some() {
                        return Err(ParseError::new(
                            ParseErrorKind::DuplicateReturn,
                            token.span,
                            format!("clause '{}' has more than one return", clause.name),
                        ));
                    }
                    clause.returned = Some(Return {
                        span: token.span.merge(value.span),
                        value,
                    });
                }
                TokenKind::RightBrace => {
                    self.advance();
                    return Ok(clause);
                }
                TokenKind::Eof => return Err(ParseError::unexpected_eof(token.span)),
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken,
                        token.span,
                        format!(
                            "expected 'verify', 'output', 'return' or '}}', found {}",
                            describe(&token)
                        ),
                    ));
                }
            }
        }
    }

    fn parse_variable_name(&mut self) -> Result<Variable, ParseError> {
        let token = self.expect_identifier()?;
        Ok(Variable::new(token.lexeme, token.span))
    }

    // =========================================
    // Expressions
    // =========================================

    /// Parse an expression with a minimum binding power.
    pub(crate) fn parse_expr(&mut self, min_bp: u8) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_prefix()?;

        while let Some((builtin, l_bp, r_bp)) = binary_op(self.peek().kind) {
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(r_bp)?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expression::Call(Call {
                builtin,
                args: vec![lhs, rhs],
                span,
            });
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expression, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::IntLiteral => Ok(Expression::integer(
                parse_integer(token.lexeme, &token)?,
                token.span,
            )),

            // A minus directly before a numeral is part of the literal.
            TokenKind::Minus if self.check(TokenKind::IntLiteral) => {
                let digits = self.advance();
                let span = token.span.merge(digits.span);
                let text = format!("-{}", digits.lexeme);
                Ok(Expression::integer(parse_integer(&text, &digits)?, span))
            }

            TokenKind::Minus | TokenKind::Bang => {
                let operand = self.parse_expr(PREFIX_BP)?;
                let builtin = if token.kind == TokenKind::Bang {
                    Builtin::Not
                } else {
                    Builtin::Negate
                };
                Ok(Expression::Call(Call {
                    builtin,
                    span: token.span.merge(operand.span()),
                    args: vec![operand],
                }))
            }

            TokenKind::True => Ok(Expression::boolean(true, token.span)),
            TokenKind::False => Ok(Expression::boolean(false, token.span)),

            TokenKind::HexLiteral => {
                let bytes = hex::decode(&token.lexeme[2..]).map_err(|e| {
                    ParseError::new(
                        ParseErrorKind::InvalidLiteral,
                        token.span,
                        format!("invalid hex literal '{}': {e}", token.lexeme),
                    )
                })?;
                Ok(Expression::Literal {
                    value: Literal::Bytes(bytes),
                    span: token.span,
                })
            }

            TokenKind::LeftBracket => {
                let mut items = Vec::new();
                if !self.check(TokenKind::RightBracket) {
                    items.push(self.parse_expr(0)?);
                    while self.eat(TokenKind::Comma) {
                        items.push(self.parse_expr(0)?);
                    }
                }
                let end = self.expect(TokenKind::RightBracket)?;
                Ok(Expression::List {
                    items,
                    span: token.span.merge(end.span),
                })
            }

            TokenKind::LeftParen => {
                let inner = self.parse_expr(0)?;
                self.expect(TokenKind::RightParen)?;
                Ok(inner)
            }

            TokenKind::Identifier if self.check(TokenKind::LeftParen) => self.parse_call(token),

            TokenKind::Identifier => {
                if self.eat(TokenKind::Dot) {
                    let field = self.expect_identifier()?;
                    if field.lexeme != &ASSET_AMOUNT_SUFFIX[1..] {
                        return Err(ParseError::expected_token(
                            field.span,
                            "'assetAmount'",
                            &describe(&field),
                        ));
                    }
                    return Ok(Expression::Variable(Variable::new(
                        format!("{}{ASSET_AMOUNT_SUFFIX}", token.lexeme),
                        token.span.merge(field.span),
                    )));
                }
                Ok(Expression::Variable(Variable::new(token.lexeme, token.span)))
            }

            TokenKind::Eof => Err(ParseError::unexpected_eof(token.span)),
            _ => Err(ParseError::expected_expression(token.span, &describe(&token))),
        }
    }

    fn parse_call(&mut self, name: Token<'ast>) -> Result<Expression, ParseError> {
        let builtin = Builtin::from_function_name(name.lexeme).ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::UnknownFunction,
                name.span,
                format!("unknown function '{}'", name.lexeme),
            )
        })?;

        self.expect(TokenKind::LeftParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            args.push(self.parse_expr(0)?);
            while self.eat(TokenKind::Comma) {
                args.push(self.parse_expr(0)?);
            }
        }
        let end = self.expect(TokenKind::RightParen)?;

        Ok(Expression::Call(Call {
            builtin,
            args,
            span: name.span.merge(end.span),
        }))
    }
}

/// Builtin and left/right binding power of an infix operator token.
fn binary_op(kind: TokenKind) -> Option<(Builtin, u8, u8)> {
    Some(match kind {
        TokenKind::EqualEqual => (Builtin::Eq, 1, 2),
        TokenKind::BangEqual => (Builtin::Ne, 1, 2),
        TokenKind::Less => (Builtin::Lt, 3, 4),
        TokenKind::Greater => (Builtin::Gt, 3, 4),
        TokenKind::LessEqual => (Builtin::Le, 3, 4),
        TokenKind::GreaterEqual => (Builtin::Ge, 3, 4),
        TokenKind::Plus => (Builtin::Add, 5, 6),
        TokenKind::Minus => (Builtin::Sub, 5, 6),
        TokenKind::Star => (Builtin::Mul, 7, 8),
        TokenKind::Slash => (Builtin::Div, 7, 8),
        TokenKind::Percent => (Builtin::Mod, 7, 8),
        _ => return None,
    })
}

fn parse_integer(text: &str, token: &Token<'_>) -> Result<i64, ParseError> {
    text.parse::<i64>().map_err(|_| {
        ParseError::new(
            ParseErrorKind::InvalidLiteral,
            token.span,
            format!("integer literal '{text}' does not fit in 64 bits"),
        )
    })
}

fn describe(token: &Token<'_>) -> String {
    match token.kind {
        TokenKind::Identifier | TokenKind::IntLiteral | TokenKind::HexLiteral => {
            format!("'{}'", token.lexeme)
        }
        kind => kind.description().to_string(),
    }
}
