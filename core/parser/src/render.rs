//! FILENAME: core/parser/src/render.rs
//! PURPOSE: Turns an Expression back into formula text.
//! CONTEXT: Rewritten formulas are always built from the tree, never by
//! patching the original string. Parentheses are emitted only where the
//! grammar's precedence would otherwise change the tree on re-parse.

use crate::ast::{BinaryOperator, Expression, UnaryOperator, Value};
use std::fmt::{self, Write};

const UNARY_PRECEDENCE: u8 = 5;
const PRIMARY_PRECEDENCE: u8 = 7;

/// Renders an expression with the leading '=' stored in cells.
pub fn to_formula(expr: &Expression) -> String {
    format!("={}", expr)
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expression(f, self)
    }
}

fn precedence(expr: &Expression) -> u8 {
    match expr {
        Expression::BinaryOp { op, .. } => op.precedence(),
        Expression::UnaryOp { .. } => UNARY_PRECEDENCE,
        // A negative literal prints with a leading '-' and re-parses as negation.
        Expression::Literal(Value::Number(n)) if *n < 0.0 => UNARY_PRECEDENCE,
        _ => PRIMARY_PRECEDENCE,
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expression, wrap: bool) -> fmt::Result {
    if wrap {
        f.write_char('(')?;
        write_expression(f, expr)?;
        f.write_char(')')
    } else {
        write_expression(f, expr)
    }
}

fn write_expression(f: &mut fmt::Formatter<'_>, expr: &Expression) -> fmt::Result {
    match expr {
        Expression::Literal(value) => write_value(f, value),

        Expression::CellRef {
            sheet,
            col,
            row,
            col_absolute,
            row_absolute,
        } => {
            write_sheet_prefix(f, sheet.as_deref())?;
            write_cell(f, col, *row, *col_absolute, *row_absolute)
        }

        Expression::Range { sheet, start, end } => {
            write_sheet_prefix(f, sheet.as_deref())?;
            write_expression(f, start)?;
            f.write_char(':')?;
            write_expression(f, end)
        }

        Expression::ColumnRef {
            sheet,
            start_col,
            end_col,
            start_absolute,
            end_absolute,
        } => {
            write_sheet_prefix(f, sheet.as_deref())?;
            write!(
                f,
                "{}{}:{}{}",
                dollar(*start_absolute),
                start_col,
                dollar(*end_absolute),
                end_col
            )
        }

        Expression::RowRef {
            sheet,
            start_row,
            end_row,
            start_absolute,
            end_absolute,
        } => {
            write_sheet_prefix(f, sheet.as_deref())?;
            write!(
                f,
                "{}{}:{}{}",
                dollar(*start_absolute),
                start_row,
                dollar(*end_absolute),
                end_row
            )
        }

        Expression::BinaryOp { left, op, right } => {
            let own = op.precedence();
            if *op == BinaryOperator::Power {
                // power --> primary "^" unary
                write_operand(f, left, precedence(left) < PRIMARY_PRECEDENCE)?;
                f.write_str(op.symbol())?;
                write_operand(f, right, precedence(right) < UNARY_PRECEDENCE)
            } else {
                // Left-associative: the right operand must bind tighter.
                write_operand(f, left, precedence(left) < own)?;
                f.write_str(op.symbol())?;
                write_operand(f, right, precedence(right) <= own)
            }
        }

        Expression::UnaryOp { op, operand } => {
            match op {
                UnaryOperator::Negate => f.write_char('-')?,
            }
            write_operand(f, operand, precedence(operand) < UNARY_PRECEDENCE)
        }

        Expression::FunctionCall { name, args } => {
            f.write_str(name)?;
            f.write_char('(')?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                write_expression(f, arg)?;
            }
            f.write_char(')')
        }
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Number(n) => f.write_str(&format_number(*n)),
        Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
        Value::Boolean(true) => f.write_str("TRUE"),
        Value::Boolean(false) => f.write_str("FALSE"),
        Value::Error(literal) => f.write_str(literal),
    }
}

fn write_cell(
    f: &mut fmt::Formatter<'_>,
    col: &str,
    row: u32,
    col_absolute: bool,
    row_absolute: bool,
) -> fmt::Result {
    write!(
        f,
        "{}{}{}{}",
        dollar(col_absolute),
        col,
        dollar(row_absolute),
        row
    )
}

fn write_sheet_prefix(f: &mut fmt::Formatter<'_>, sheet: Option<&str>) -> fmt::Result {
    match sheet {
        Some(name) if needs_quotes(name) => write!(f, "'{}'!", name.replace('\'', "''")),
        Some(name) => write!(f, "{}!", name),
        None => Ok(()),
    }
}

fn dollar(absolute: bool) -> &'static str {
    if absolute { "$" } else { "" }
}

/// Integral values print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Sheet names need quoting unless they are a plain ASCII identifier that
/// cannot be mistaken for a cell address or a boolean.
pub fn needs_quotes(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if !starts_ok || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return true;
    }

    let upper = name.to_ascii_uppercase();
    if upper == "TRUE" || upper == "FALSE" {
        return true;
    }

    let letters = name.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    let rest = &name[letters..];
    letters <= 3 && !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}
