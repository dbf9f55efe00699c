//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Scans a raw formula string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, number parsing, string literals with doubled-quote
//! escapes, quoted sheet names, and multi-character operators like <= and <>.
//!
//! SUPPORTED OPERATORS:
//! - Single char: + - * / ^ & ( ) , : = < > ! $
//! - Multi char: <= >= <>
//! - Quoted identifiers: 'Sheet Name', 'It''s'

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('^') => Token::Caret,
            Some('&') => Token::Ampersand,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some(',') => Token::Comma,
            Some(':') => Token::Colon,
            Some('!') => Token::Exclamation,
            Some('$') => Token::Dollar,
            Some('=') => Token::Equals,

            // Handle < and potentially <= or <>
            Some('<') => self.read_less_than_operator(),

            // Handle > and potentially >=
            Some('>') => self.read_greater_than_operator(),

            Some('"') => self.read_string(),

            Some('\'') => self.read_quoted_identifier(),

            Some('#') => self.read_error_literal(),

            // Numbers start with a digit or a dot
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),

            Some(ch) if is_letter(ch) => self.read_identifier(ch),

            None => Token::EOF,

            Some(ch) => Token::Illegal(ch),
        }
    }

    /// Drains the lexer into a vector, including the trailing EOF.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token == Token::EOF;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    /// Handles operators starting with '<': <, <=, <>
    fn read_less_than_operator(&mut self) -> Token {
        match self.input.peek() {
            Some('=') => {
                self.input.next();
                Token::LessEqual
            }
            Some('>') => {
                self.input.next();
                Token::NotEqual
            }
            _ => Token::LessThan,
        }
    }

    /// Handles operators starting with '>': >, >=
    fn read_greater_than_operator(&mut self) -> Token {
        match self.input.peek() {
            Some('=') => {
                self.input.next();
                Token::GreaterEqual
            }
            _ => Token::GreaterThan,
        }
    }

    /// Reads a string literal. A doubled quote ("") inside the literal is an
    /// escaped quote character.
    fn read_string(&mut self) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.input.next() {
            if ch == '"' {
                if self.input.peek() == Some(&'"') {
                    result.push('"');
                    self.input.next();
                    continue;
                }
                return Token::String(result);
            }
            result.push(ch);
        }
        // Unterminated literal: return what we have.
        Token::String(result)
    }

    /// Reads a quoted identifier (sheet name): 'Sheet Name'
    fn read_quoted_identifier(&mut self) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.input.next() {
            if ch == '\'' {
                if self.input.peek() == Some(&'\'') {
                    result.push('\'');
                    self.input.next();
                    continue;
                }
                return Token::QuotedIdentifier(result);
            }
            result.push(ch);
        }
        Token::QuotedIdentifier(result)
    }

    /// Reads #DIV/0!, #N/A, #NAME? and the other error literals.
    fn read_error_literal(&mut self) -> Token {
        let mut literal = String::from('#');
        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_alphanumeric() || ch == '/' || ch == '_' {
                literal.push(ch.to_ascii_uppercase());
                self.input.next();
            } else {
                break;
            }
        }
        if let Some(&end) = self.input.peek().filter(|c| matches!(c, '!' | '?')) {
            literal.push(end);
            self.input.next();
        }
        if ERROR_LITERALS.contains(&literal.as_str()) {
            Token::ErrorLiteral(literal)
        } else {
            Token::Illegal('#')
        }
    }

    fn read_number(&mut self, first_char: char) -> Token {
        let mut number_str = String::from(first_char);
        let mut has_dot = first_char == '.';

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.input.next();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number_str.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        match number_str.parse::<f64>() {
            Ok(n) => Token::Number(n),
            // A lone "."
            Err(_) => Token::Illegal(first_char),
        }
    }

    fn read_identifier(&mut self, first_char: char) -> Token {
        let mut ident = String::from(first_char);

        while let Some(&ch) = self.input.peek() {
            // '.' supports names like "_xlfn.XLOOKUP".
            if is_letter(ch) || ch.is_ascii_digit() || ch == '.' {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        match ident.to_uppercase().as_str() {
            "TRUE" => Token::Boolean(true),
            "FALSE" => Token::Boolean(false),
            _ => Token::Identifier(ident),
        }
    }
}

const ERROR_LITERALS: &[&str] = &[
    "#NULL!", "#DIV/0!", "#VALUE!", "#REF!", "#NAME?", "#NUM!", "#N/A", "#SPILL!", "#CALC!",
];

/// Returns true if `ch` can start an identifier.
/// Unicode letters are accepted so unquoted sheet names such as 経費!A1 lex.
fn is_letter(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '\\'
}
