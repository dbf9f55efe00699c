//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the formula parser.
//! CONTEXT: Exposes the lexer, parser, AST, renderer and reference visitor
//! used to rewrite worksheet formulas structurally after row insertion.
//!
//! PIPELINE: Formula String --> Lexer --> Tokens --> Parser --> AST --> (rewrite) --> Renderer
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /, ^ (power)
//! - Comparison: =, <>, <, >, <=, >=
//! - String concatenation: &
//! - Cell references: A1, $A$1, 'Sheet Name'!B7
//! - Ranges, whole columns and whole rows
//! - Function calls: SUM(A1:A10), IF(A1>0, "yes", "no")

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod refs;
pub mod render;
pub mod token;


pub use ast::{BinaryOperator, Expression, UnaryOperator, Value};
pub use lexer::Lexer;
pub use parser::{parse, ParseError, ParseResult, Parser};
pub use refs::{
    function_names, referenced_sheets, row_refs, visit_col_refs_mut, visit_row_refs_mut, RefPosition, RowRefSite,
};
pub use render::to_formula;
pub use token::Token;
