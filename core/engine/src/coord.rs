//! FILENAME: core/engine/src/coord.rs
//! PURPOSE: Conversions between A1 notation and 0-based (row, col) indices.
//! CONTEXT: Workbook templates and formulas speak A1 ("H55"), the grid
//! speaks 0-based coordinates. Column "A" = 0, row 1 = row 0.

/// A cell coordinate as (row, col) with 0-based indices.
pub type CellCoord = (u32, u32);

/// Largest column index Excel accepts (XFD).
pub const MAX_COL: u32 = 16_383;

/// Converts column letters ("A", "aa") to a 0-based index.
/// Returns `None` for empty input, non-letters, or columns beyond XFD.
pub fn col_to_index(col_str: &str) -> Option<u32> {
    if col_str.is_empty() || col_str.len() > 3 {
        return None;
    }
    let mut result: u32 = 0;
    for c in col_str.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        result = result * 26 + digit;
    }
    let index = result - 1;
    (index <= MAX_COL).then_some(index)
}

/// Converts a 0-based column index to letters. 0 -> "A", 26 -> "AA".
pub fn index_to_col(mut col_index: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col_index % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }
    result
}

/// Parses "H55" or "$H$55" into (54, 7).
pub fn parse_a1(reference: &str) -> Option<CellCoord> {
    let cleaned: String = reference.chars().filter(|c| *c != '$').collect();
    let split = cleaned.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cleaned.split_at(split);
    let col = col_to_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col))
}

/// Formats a 0-based coordinate as A1 text. (54, 7) -> "H55"
pub fn coord_to_a1(coord: CellCoord) -> String {
    let (row, col) = coord;
    format!("{}{}", index_to_col(col), row + 1)
}

/// Inclusive run of column indices between two letter columns.
pub fn column_span(first: &str, last: &str) -> Option<Vec<u32>> {
    let start = col_to_index(first)?;
    let end = col_to_index(last)?;
    (start <= end).then(|| (start..=end).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_convert_both_ways() {
        assert_eq!(col_to_index("A"), Some(0));
        assert_eq!(col_to_index("z"), Some(25));
        assert_eq!(col_to_index("AA"), Some(26));
        assert_eq!(col_to_index("XFD"), Some(MAX_COL));
        for i in [0, 7, 20, 23, 701, 702] {
            assert_eq!(col_to_index(&index_to_col(i)), Some(i));
        }
    }

    #[test]
    fn invalid_columns_are_rejected() {
        assert_eq!(col_to_index(""), None);
        assert_eq!(col_to_index("A1"), None);
        assert_eq!(col_to_index("XFE"), None);
        assert_eq!(col_to_index("ABCD"), None);
    }

    #[test]
    fn a1_parsing() {
        assert_eq!(parse_a1("H55"), Some((54, 7)));
        assert_eq!(parse_a1("$B$146"), Some((145, 1)));
        assert_eq!(parse_a1("A0"), None);
        assert_eq!(parse_a1("55"), None);
        assert_eq!(coord_to_a1((54, 7)), "H55");
    }

    #[test]
    fn month_columns_span() {
        let months = column_span("I", "T").unwrap();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], 8);
        assert_eq!(column_span("T", "I"), None);
    }
}
