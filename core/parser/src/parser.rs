//! FILENAME: core/parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a stream of Tokens into an AST.
//! CONTEXT: Second stage of the pipeline. Absolute markers ($) are kept on the
//! reference nodes because row insertion and row copying treat them differently.
//!
//! GRAMMAR:
//!   expression     --> comparison
//!   comparison     --> concatenation ( ("=" | "<>" | "<" | ">" | "<=" | ">=") concatenation )*
//!   concatenation  --> additive ( "&" additive )*
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> "-" unary | "+" unary | power
//!   power          --> primary ( "^" unary )?
//!   primary        --> NUMBER | STRING | BOOLEAN | reference | function_call | "(" expression ")"
//!   reference      --> [sheet_prefix] ref_part (":" ref_part)?
//!   sheet_prefix   --> (IDENTIFIER | QUOTED_IDENTIFIER) "!"
//!   ref_part       --> ["$"] COLUMN ["$" ROW] | ["$"] COLUMN ROW | ["$"] ROW
//!   function_call  --> IDENTIFIER "(" arguments? ")"
//!   arguments      --> expression ("," expression)*

use crate::ast::{BinaryOperator, Expression, UnaryOperator, Value};
use crate::lexer::Lexer;
use crate::token::Token;

const COMPARISON: u8 = 1;
const MULTIPLICATIVE: u8 = 4;

/// Parser errors with descriptive messages.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// One side of a reference as written in the formula.
#[derive(Debug, Default)]
struct RefPart {
    col: Option<String>,
    col_absolute: bool,
    row: Option<u32>,
    row_absolute: bool,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser from an input string.
    /// Automatically advances to the first token.
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    /// Parses the entire input and returns the AST.
    /// The optional leading '=' is skipped.
    pub fn parse(&mut self) -> ParseResult<Expression> {
        if self.current_token == Token::Equals {
            self.advance();
        }

        if self.current_token == Token::EOF {
            return Err(ParseError::new("Empty expression"));
        }

        let expr = self.parse_expression()?;

        if self.current_token != Token::EOF {
            return Err(ParseError::new(format!(
                "Unexpected token after expression: {:?}",
                self.current_token
            )));
        }

        Ok(expr)
    }

    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(format!(
                "Expected {:?}, found {:?}",
                expected, self.current_token
            )))
        }
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary(COMPARISON)
    }

    /// Left-associative binary levels, loosest first: comparison,
    /// concatenation, additive, multiplicative. Power binds tighter than
    /// unary minus and is handled below it.
    fn parse_binary(&mut self, level: u8) -> ParseResult<Expression> {
        if level > MULTIPLICATIVE {
            return self.parse_unary();
        }
        let mut left = self.parse_binary(level + 1)?;

        while let Some(op) = self
            .current_token
            .binary_operator()
            .filter(|op| op.precedence() == level)
        {
            self.advance();
            let right = self.parse_binary(level + 1)?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    /// Negation nests; a unary plus is accepted and dropped.
    fn parse_unary(&mut self) -> ParseResult<Expression> {
        match self.current_token {
            Token::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression::UnaryOp {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                })
            }
            Token::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> ParseResult<Expression> {
        let left = self.parse_primary()?;

        if self.current_token == Token::Caret {
            self.advance();
            let right = self.parse_unary()?;
            return Ok(binary(left, BinaryOperator::Power, right));
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match self.current_token.clone() {
            // A number is a literal unless it opens a row span like 1:5
            Token::Number(n) => {
                self.advance();
                if self.current_token == Token::Colon {
                    let part = RefPart {
                        row: Some(row_number(n)?),
                        ..RefPart::default()
                    };
                    return self.parse_reference(None, part);
                }
                Ok(Expression::Literal(Value::Number(n)))
            }

            Token::String(s) => {
                self.advance();
                Ok(Expression::Literal(Value::String(s)))
            }

            Token::Boolean(b) => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(b)))
            }

            Token::ErrorLiteral(literal) => {
                self.advance();
                Ok(Expression::Literal(Value::Error(literal)))
            }

            // Quoted identifier is always a sheet prefix
            Token::QuotedIdentifier(sheet_name) => {
                self.advance();
                self.expect(Token::Exclamation)?;
                self.parse_sheet_reference(sheet_name)
            }

            Token::Dollar => {
                let part = self.parse_ref_part()?;
                self.parse_reference(None, part)
            }

            Token::Identifier(name) => {
                self.advance();

                if self.current_token == Token::Exclamation {
                    self.advance();
                    return self.parse_sheet_reference(name);
                }

                if self.current_token == Token::LParen {
                    return self.parse_function_call(name.to_uppercase());
                }

                let part = self.finish_ref_part(name, false)?;
                self.parse_reference(None, part)
            }

            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }

            Token::EOF => Err(ParseError::new("Unexpected end of expression")),

            Token::Illegal(ch) => Err(ParseError::new(format!("Illegal character: {}", ch))),

            token => Err(ParseError::new(format!("Unexpected token: {:?}", token))),
        }
    }

    /// Parses the reference that follows `SheetName!`.
    fn parse_sheet_reference(&mut self, sheet_name: String) -> ParseResult<Expression> {
        let part = self.parse_ref_part()?;
        self.parse_reference(Some(sheet_name), part)
    }

    /// Reads one reference part starting at the current token.
    fn parse_ref_part(&mut self) -> ParseResult<RefPart> {
        let leading_dollar = self.current_token == Token::Dollar;
        if leading_dollar {
            self.advance();
        }

        match self.current_token.clone() {
            Token::Identifier(name) => {
                self.advance();
                self.finish_ref_part(name, leading_dollar)
            }
            Token::Number(n) => {
                self.advance();
                Ok(RefPart {
                    row: Some(row_number(n)?),
                    row_absolute: leading_dollar,
                    ..RefPart::default()
                })
            }
            other => Err(ParseError::new(format!(
                "Expected cell reference, found {:?}",
                other
            ))),
        }
    }

    /// Completes a reference part whose identifier has already been consumed.
    /// Handles A1, A (column only) and A$1 (identifier, '$', row).
    fn finish_ref_part(&mut self, identifier: String, col_absolute: bool) -> ParseResult<RefPart> {
        let (col, row) = split_cell_reference(&identifier)?;
        let mut part = RefPart {
            col: Some(col),
            col_absolute,
            row,
            row_absolute: false,
        };

        if part.row.is_none() && self.current_token == Token::Dollar {
            self.advance();
            match self.current_token.clone() {
                Token::Number(n) => {
                    self.advance();
                    part.row = Some(row_number(n)?);
                    part.row_absolute = true;
                }
                other => {
                    return Err(ParseError::new(format!(
                        "Expected row number after '$' in {}, found {:?}",
                        identifier, other
                    )));
                }
            }
        }

        Ok(part)
    }

    /// Combines one or two reference parts into a cell, range, column or row node.
    fn parse_reference(&mut self, sheet: Option<String>, first: RefPart) -> ParseResult<Expression> {
        if self.current_token != Token::Colon {
            return match (first.col, first.row) {
                (Some(col), Some(row)) => Ok(Expression::CellRef {
                    sheet,
                    col,
                    row,
                    col_absolute: first.col_absolute,
                    row_absolute: first.row_absolute,
                }),
                (Some(col), None) => Err(ParseError::new(format!("Unknown name: {}", col))),
                _ => Err(ParseError::new("Row reference requires ':'")),
            };
        }

        self.advance();
        let second = self.parse_ref_part()?;

        match (first.col, first.row, second.col, second.row) {
            (Some(start_col), Some(start_row), Some(end_col), Some(end_row)) => Ok(Expression::Range {
                sheet,
                start: Box::new(Expression::CellRef {
                    sheet: None,
                    col: start_col,
                    row: start_row,
                    col_absolute: first.col_absolute,
                    row_absolute: first.row_absolute,
                }),
                end: Box::new(Expression::CellRef {
                    sheet: None,
                    col: end_col,
                    row: end_row,
                    col_absolute: second.col_absolute,
                    row_absolute: second.row_absolute,
                }),
            }),
            (Some(start_col), None, Some(end_col), None) => Ok(Expression::ColumnRef {
                sheet,
                start_col,
                end_col,
                start_absolute: first.col_absolute,
                end_absolute: second.col_absolute,
            }),
            (None, Some(start_row), None, Some(end_row)) => Ok(Expression::RowRef {
                sheet,
                start_row,
                end_row,
                start_absolute: first.row_absolute,
                end_absolute: second.row_absolute,
            }),
            _ => Err(ParseError::new("Mismatched reference parts around ':'")),
        }
    }

    fn parse_function_call(&mut self, name: String) -> ParseResult<Expression> {
        // Consume the '('
        self.advance();

        let mut args = Vec::new();

        if self.current_token == Token::RParen {
            self.advance();
            return Ok(Expression::FunctionCall { name, args });
        }

        args.push(self.parse_expression()?);

        while self.current_token == Token::Comma {
            self.advance();
            args.push(self.parse_expression()?);
        }

        self.expect(Token::RParen)?;

        Ok(Expression::FunctionCall { name, args })
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn row_number(n: f64) -> ParseResult<u32> {
    if n < 1.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
        return Err(ParseError::new(format!("Invalid row number: {}", n)));
    }
    Ok(n as u32)
}

/// Splits "AA100" into ("AA", Some(100)) and "AA" into ("AA", None).
fn split_cell_reference(identifier: &str) -> ParseResult<(String, Option<u32>)> {
    let letters: String = identifier
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let digits = &identifier[letters.len()..];

    if letters.is_empty() || letters.len() > 3 {
        return Err(ParseError::new(format!("Unknown name: {}", identifier)));
    }
    if digits.is_empty() {
        return Ok((letters.to_uppercase(), None));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::new(format!("Unknown name: {}", identifier)));
    }

    let row: u32 = digits.parse().map_err(|_| {
        ParseError::new(format!("Invalid row number in cell reference: {}", identifier))
    })?;
    if row == 0 {
        return Err(ParseError::new(format!("Row number must be >= 1: {}", identifier)));
    }

    Ok((letters.to_uppercase(), Some(row)))
}

/// Convenience function to parse a formula string directly.
pub fn parse(input: &str) -> ParseResult<Expression> {
    let mut parser = Parser::new(input);
    parser.parse()
}
