//! FILENAME: core/parser/src/refs.rs
//! PURPOSE: Walks the row-bearing references of a formula tree.
//! CONTEXT: Row insertion, row copying and the layout reconciler all need to
//! inspect or rewrite the row of every reference without caring about the
//! surrounding arithmetic. Column-only references carry no row and are skipped.
//! Block copies across columns use the column walk in the same way.

use crate::ast::Expression;

/// Where in the tree a row number sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefPosition {
    Cell,
    RangeStart,
    RangeEnd,
    RowSpanStart,
    RowSpanEnd,
}

impl RefPosition {
    pub fn is_range_bound(self) -> bool {
        !matches!(self, RefPosition::Cell)
    }
}

/// Describes one row reference. `sheet` is `None` for same-sheet references.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRefSite {
    pub sheet: Option<String>,
    pub col: Option<String>,
    pub absolute: bool,
    pub position: RefPosition,
}

impl RowRefSite {
    /// True when the reference addresses `sheet_name`, given the sheet that
    /// holds the formula.
    pub fn targets(&self, home_sheet: &str, sheet_name: &str) -> bool {
        let target = self.sheet.as_deref().unwrap_or(home_sheet);
        target.eq_ignore_ascii_case(sheet_name)
    }
}

/// Calls `f` for every row number in the tree, allowing it to be rewritten.
pub fn visit_row_refs_mut<F>(expr: &mut Expression, f: &mut F)
where
    F: FnMut(&RowRefSite, &mut u32),
{
    match expr {
        Expression::CellRef {
            sheet,
            col,
            row,
            row_absolute,
            ..
        } => {
            let site = RowRefSite {
                sheet: sheet.clone(),
                col: Some(col.clone()),
                absolute: *row_absolute,
                position: RefPosition::Cell,
            };
            f(&site, row);
        }

        Expression::Range { sheet, start, end } => {
            visit_range_end(sheet.as_deref(), start, RefPosition::RangeStart, f);
            visit_range_end(sheet.as_deref(), end, RefPosition::RangeEnd, f);
        }

        Expression::RowRef {
            sheet,
            start_row,
            end_row,
            start_absolute,
            end_absolute,
        } => {
            let start_site = RowRefSite {
                sheet: sheet.clone(),
                col: None,
                absolute: *start_absolute,
                position: RefPosition::RowSpanStart,
            };
            f(&start_site, start_row);
            let end_site = RowRefSite {
                absolute: *end_absolute,
                position: RefPosition::RowSpanEnd,
                ..start_site
            };
            f(&end_site, end_row);
        }

        Expression::ColumnRef { .. } | Expression::Literal(_) => {}

        Expression::BinaryOp { left, right, .. } => {
            visit_row_refs_mut(left, f);
            visit_row_refs_mut(right, f);
        }

        Expression::UnaryOp { operand, .. } => visit_row_refs_mut(operand, f),

        Expression::FunctionCall { args, .. } => {
            for arg in args {
                visit_row_refs_mut(arg, f);
            }
        }
    }
}

fn visit_range_end<F>(sheet: Option<&str>, end: &mut Expression, position: RefPosition, f: &mut F)
where
    F: FnMut(&RowRefSite, &mut u32),
{
    if let Expression::CellRef {
        col,
        row,
        row_absolute,
        ..
    } = end
    {
        let site = RowRefSite {
            sheet: sheet.map(str::to_string),
            col: Some(col.clone()),
            absolute: *row_absolute,
            position,
        };
        f(&site, row);
    }
}

/// Calls `f` with the `$` flag and letters of every column a reference
/// holds, allowing the letters to be rewritten. Row spans carry no column.
pub fn visit_col_refs_mut<F>(expr: &mut Expression, f: &mut F)
where
    F: FnMut(bool, &mut String),
{
    match expr {
        Expression::CellRef { col, col_absolute, .. } => f(*col_absolute, col),

        Expression::Range { start, end, .. } => {
            visit_col_refs_mut(start, f);
            visit_col_refs_mut(end, f);
        }

        Expression::ColumnRef {
            start_col,
            end_col,
            start_absolute,
            end_absolute,
            ..
        } => {
            f(*start_absolute, start_col);
            f(*end_absolute, end_col);
        }

        Expression::RowRef { .. } | Expression::Literal(_) => {}

        Expression::BinaryOp { left, right, .. } => {
            visit_col_refs_mut(left, f);
            visit_col_refs_mut(right, f);
        }

        Expression::UnaryOp { operand, .. } => visit_col_refs_mut(operand, f),

        Expression::FunctionCall { args, .. } => {
            for arg in args {
                visit_col_refs_mut(arg, f);
            }
        }
    }
}

/// Collects every row reference with its current row number, in tree order.
pub fn row_refs(expr: &Expression) -> Vec<(RowRefSite, u32)> {
    let mut copy = expr.clone();
    let mut found = Vec::new();
    visit_row_refs_mut(&mut copy, &mut |site, row| found.push((site.clone(), *row)));
    found
}

/// Upper-case names of every function called anywhere in the tree.
pub fn function_names(expr: &Expression) -> Vec<String> {
    let mut names = Vec::new();
    collect_function_names(expr, &mut names);
    names
}

fn collect_function_names(expr: &Expression, names: &mut Vec<String>) {
    match expr {
        Expression::FunctionCall { name, args } => {
            names.push(name.clone());
            for arg in args {
                collect_function_names(arg, names);
            }
        }
        Expression::BinaryOp { left, right, .. } => {
            collect_function_names(left, names);
            collect_function_names(right, names);
        }
        Expression::UnaryOp { operand, .. } => collect_function_names(operand, names),
        Expression::Range { start, end, .. } => {
            collect_function_names(start, names);
            collect_function_names(end, names);
        }
        _ => {}
    }
}

/// Sheet names referenced explicitly anywhere in the tree.
pub fn referenced_sheets(expr: &Expression) -> Vec<String> {
    let mut sheets: Vec<String> = Vec::new();
    let mut push = |sheet: &Option<String>| {
        if let Some(name) = sheet {
            if !sheets.contains(name) {
                sheets.push(name.clone());
            }
        }
    };
    let mut stack = vec![expr];
    while let Some(node) = stack.pop() {
        match node {
            Expression::CellRef { sheet, .. }
            | Expression::Range { sheet, .. }
            | Expression::ColumnRef { sheet, .. }
            | Expression::RowRef { sheet, .. } => push(sheet),
            Expression::BinaryOp { left, right, .. } => {
                stack.push(left);
                stack.push(right);
            }
            Expression::UnaryOp { operand, .. } => stack.push(operand),
            Expression::FunctionCall { args, .. } => stack.extend(args.iter()),
            Expression::Literal(_) => {}
        }
    }
    sheets
}
