//! FILENAME: core/parser/src/token.rs
//! PURPOSE: Token definitions for the formula lexer.
//! CONTEXT: Tokens are the atomic units produced by the lexer and consumed by the parser.

use crate::ast::BinaryOperator;

/// Tokens recognized by the formula lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    /// Error literal such as #N/A or #REF!, upper case.
    ErrorLiteral(String),
    /// Bare identifier as written (function name, cell address, sheet name).
    /// Case is preserved so sheet names survive a parse/render cycle.
    Identifier(String),
    /// Quoted sheet name: 'Sheet Name' or '【不】①不動産収入'
    QuotedIdentifier(String),

    // Operators
    Plus,
    Minus,
    Asterisk,
    Slash,
    Caret,
    Ampersand,
    Equals,
    NotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,

    // Delimiters
    LParen,
    RParen,
    Comma,
    Colon,
    /// Sheet reference separator: !
    Exclamation,
    /// Absolute reference marker: $
    Dollar,

    // Special
    EOF,
    Illegal(char),
}

impl Token {
    /// The binary operator this token stands for, if any. `=` is both the
    /// formula prefix and the equality operator; the parser skips the prefix
    /// before asking.
    pub fn binary_operator(&self) -> Option<BinaryOperator> {
        Some(match self {
            Token::Equals => BinaryOperator::Equal,
            Token::NotEqual => BinaryOperator::NotEqual,
            Token::LessThan => BinaryOperator::LessThan,
            Token::GreaterThan => BinaryOperator::GreaterThan,
            Token::LessEqual => BinaryOperator::LessEqual,
            Token::GreaterEqual => BinaryOperator::GreaterEqual,
            Token::Ampersand => BinaryOperator::Concat,
            Token::Plus => BinaryOperator::Add,
            Token::Minus => BinaryOperator::Subtract,
            Token::Asterisk => BinaryOperator::Multiply,
            Token::Slash => BinaryOperator::Divide,
            Token::Caret => BinaryOperator::Power,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(op) = self.binary_operator() {
            return f.write_str(op.symbol());
        }
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Token::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Token::ErrorLiteral(s) => f.write_str(s),
            Token::Identifier(s) => f.write_str(s),
            Token::QuotedIdentifier(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Colon => f.write_str(":"),
            Token::Exclamation => f.write_str("!"),
            Token::Dollar => f.write_str("$"),
            Token::EOF => f.write_str("EOF"),
            Token::Illegal(c) => write!(f, "ILLEGAL({})", c),
            _ => Ok(()),
        }
    }
}
