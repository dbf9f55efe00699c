//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the data structures for a single worksheet cell.
//! CONTEXT: A cell keeps the formula text (with its leading '=') apart from
//! the last known value. Formulas are never evaluated here; the cached value
//! is whatever the template carried, and rewritten formulas start out Empty.

use serde::{Deserialize, Serialize};

/// Error values a cell can display (e.g., #DIV/0!).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellError {
    Div0,
    Ref,
    Name,
    Value,
    NA,
}

impl CellError {
    /// Maps the Excel error literal to a variant. Unknown literals become `Value`.
    pub fn from_literal(text: &str) -> Self {
        match text.trim().to_uppercase().as_str() {
            "#DIV/0!" => CellError::Div0,
            "#REF!" => CellError::Ref,
            "#NAME?" => CellError::Name,
            "#N/A" => CellError::NA,
            _ => CellError::Value,
        }
    }

    pub fn literal(&self) -> &'static str {
        match self {
            CellError::Div0 => "#DIV/0!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Value => "#VALUE!",
            CellError::NA => "#N/A",
        }
    }
}

/// The literal or cached value held by a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// The atomic unit of the worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub formula: Option<String>,
    pub value: CellValue,
    pub style_index: usize,
}

impl Cell {
    pub fn new() -> Self {
        Cell {
            formula: None,
            value: CellValue::Empty,
            style_index: 0,
        }
    }

    pub fn new_number(num: f64) -> Self {
        Cell {
            value: CellValue::Number(num),
            ..Cell::new()
        }
    }

    pub fn new_text(text: impl Into<String>) -> Self {
        Cell {
            value: CellValue::Text(text.into()),
            ..Cell::new()
        }
    }

    /// Stores the formula with exactly one leading '='.
    pub fn new_formula(formula: impl Into<String>) -> Self {
        Cell {
            formula: Some(normalize_formula(formula.into())),
            ..Cell::new()
        }
    }

    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// True when the cell carries neither a formula nor a visible value.
    pub fn is_blank(&self) -> bool {
        self.formula.is_none() && self.value.is_empty()
    }

    /// Text shown for the cell's value, used when matching names.
    pub fn display_value(&self) -> String {
        match &self.value {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Error(e) => e.literal().to_string(),
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_formula(formula: String) -> String {
    if formula.starts_with('=') {
        formula
    } else {
        format!("={}", formula)
    }
}
