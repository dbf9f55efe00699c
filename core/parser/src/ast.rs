//! FILENAME: core/parser/src/ast.rs
//! PURPOSE: Abstract Syntax Tree for worksheet formulas.
//! CONTEXT: The Parser turns tokens into this tree. Structural row edits and
//! the layout reconciler rewrite the row numbers held in the reference nodes,
//! then `render` turns the tree back into formula text.
//!
//! SUPPORTED EXPRESSIONS:
//! - Literals: numbers, strings, booleans
//! - Cell references: A1, $A$1, A$1, Sheet1!A1, 'Sheet Name'!A1
//! - Ranges: A1:B10, 'Sheet'!$A$1:$B$10
//! - Column references: A:B, $A:$B
//! - Row references: 1:5, $1:$5
//! - Binary operations: + - * / ^ & = <> < > <= >=
//! - Unary negation
//! - Function calls: SUM(A1:A10), IF(A1>0, "yes", "no")

/// A parsed formula expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Literal(Value),

    /// A single cell reference. Column letters are upper-case, the row is
    /// 1-based exactly as written. `sheet` is only set for cross-sheet
    /// references; inside a `Range` the sheet lives on the range.
    CellRef {
        sheet: Option<String>,
        col: String,
        row: u32,
        col_absolute: bool,
        row_absolute: bool,
    },

    /// A1:B10. Both ends are `CellRef` nodes without their own sheet.
    Range {
        sheet: Option<String>,
        start: Box<Expression>,
        end: Box<Expression>,
    },

    /// Entire columns (A:B). Never affected by row insertion.
    ColumnRef {
        sheet: Option<String>,
        start_col: String,
        end_col: String,
        start_absolute: bool,
        end_absolute: bool,
    },

    /// Entire rows (1:5).
    RowRef {
        sheet: Option<String>,
        start_row: u32,
        end_row: u32,
        start_absolute: bool,
        end_absolute: bool,
    },

    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Function name is stored upper-case.
    FunctionCall { name: String, args: Vec<Expression> },
}

impl Expression {
    /// Relative, same-sheet cell reference.
    pub fn cell(col: &str, row: u32) -> Self {
        Expression::CellRef {
            sheet: None,
            col: col.to_uppercase(),
            row,
            col_absolute: false,
            row_absolute: false,
        }
    }

    /// Sheet-qualified cell reference.
    pub fn sheet_cell(sheet: &str, col: &str, row: u32) -> Self {
        Expression::CellRef {
            sheet: Some(sheet.to_string()),
            col: col.to_uppercase(),
            row,
            col_absolute: false,
            row_absolute: false,
        }
    }

    /// Relative, same-sheet range between two cells.
    pub fn range(start_col: &str, start_row: u32, end_col: &str, end_row: u32) -> Self {
        Expression::Range {
            sheet: None,
            start: Box::new(Expression::cell(start_col, start_row)),
            end: Box::new(Expression::cell(end_col, end_row)),
        }
    }

    pub fn call(name: &str, args: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            name: name.to_uppercase(),
            args,
        }
    }

    pub fn number(n: f64) -> Self {
        Expression::Literal(Value::Number(n))
    }

    /// True for any node that addresses cells (cell, range, column or row span).
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Expression::CellRef { .. }
                | Expression::Range { .. }
                | Expression::ColumnRef { .. }
                | Expression::RowRef { .. }
        )
    }
}

/// Literal values that can appear in formulas.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    /// Error literal as written in Excel, e.g. "#N/A".
    Error(String),
}

/// Binary operators, grouped from lowest to highest precedence.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,

    Concat,

    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Concat => "&",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
        }
    }

    /// Binding strength used by the parser grammar and by the renderer.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::GreaterThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterEqual => 1,
            BinaryOperator::Concat => 2,
            BinaryOperator::Add | BinaryOperator::Subtract => 3,
            BinaryOperator::Multiply | BinaryOperator::Divide => 4,
            BinaryOperator::Power => 6,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Negate,
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
        }
    }
}
