//! A1 notation for sheet ranges
//!
//! Only the shapes the ledger uses are modelled: whole columns (`A:A`),
//! open-ended row spans (`A2:G`) and closed blocks (`A5:G15`), optionally
//! prefixed with a quoted sheet name (`'August 2025'!A5:G15`).

use crate::types::COLUMN_COUNT;
use std::fmt;

/// A rectangular range with optional row bounds (one-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct A1Range {
    start_column: u32,
    start_row: Option<u32>,
    end_column: u32,
    end_row: Option<u32>,
}

impl A1Range {
    /// A whole column, e.g. `A:A`
    pub fn column(column: u32) -> Self {
        Self {
            start_column: column,
            start_row: None,
            end_column: column,
            end_row: None,
        }
    }

    /// Rows `start..=end` across all ledger columns. `None` leaves the end open.
    pub fn ledger_rows(start_row: u32, end_row: Option<u32>) -> Self {
        Self {
            start_column: 0,
            start_row: Some(start_row.max(1)),
            end_column: COLUMN_COUNT - 1,
            end_row,
        }
    }

    /// Parse A1 notation, with or without a sheet prefix.
    pub fn parse(input: &str) -> Option<Self> {
        let cells = match input.rsplit_once('!') {
            Some((_, cells)) => cells,
            None => input,
        };
        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (start, end),
            None => (cells, cells),
        };
        let (start_column, start_row) = parse_cell(start)?;
        let (end_column, end_row) = parse_cell(end)?;
        Some(Self {
            start_column,
            start_row,
            end_column,
            end_row,
        })
    }

    /// Zero-based first column
    pub fn start_column(&self) -> u32 {
        self.start_column
    }

    /// Zero-based last column (inclusive)
    pub fn end_column(&self) -> u32 {
        self.end_column
    }

    /// One-based first row, if bounded
    pub fn start_row(&self) -> Option<u32> {
        self.start_row
    }

    /// One-based last row (inclusive), if bounded
    pub fn end_row(&self) -> Option<u32> {
        self.end_row
    }

    /// Range prefixed with the quoted sheet name
    pub fn qualified(&self, sheet: &str) -> String {
        format!("{}!{}", quote_sheet_name(sheet), self)
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", column_letters(self.start_column))?;
        if let Some(row) = self.start_row {
            write!(f, "{}", row)?;
        }
        write!(f, ":{}", column_letters(self.end_column))?;
        if let Some(row) = self.end_row {
            write!(f, "{}", row)?;
        }
        Ok(())
    }
}

/// Quote a sheet name for A1 notation: `August 2025` -> `'August 2025'`.
pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Zero-based column index to letters: 0 -> A, 25 -> Z, 26 -> AA.
pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Letters to zero-based column index: A -> 0, AA -> 26.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let mut value: u32 = 0;
    for b in letters.bytes() {
        value = value.checked_mul(26)?.checked_add(u32::from(b - b'A') + 1)?;
    }
    Some(value - 1)
}

fn parse_cell(cell: &str) -> Option<(u32, Option<u32>)> {
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    let column = column_index(letters)?;
    let row = if digits.is_empty() {
        None
    } else {
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(row)
    };
    Some((column, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_shapes() {
        assert_eq!(A1Range::column(0).to_string(), "A:A");
        assert_eq!(A1Range::ledger_rows(2, None).to_string(), "A2:G");
        assert_eq!(A1Range::ledger_rows(5, Some(15)).to_string(), "A5:G15");
    }

    #[test]
    fn test_ledger_rows_clamps_start_to_one() {
        assert_eq!(A1Range::ledger_rows(0, Some(3)).to_string(), "A1:G3");
    }

    #[test]
    fn test_parse_with_sheet_prefix() {
        let range = A1Range::parse("'August 2025'!A12:G14").unwrap();
        assert_eq!(range.start_row(), Some(12));
        assert_eq!(range.end_row(), Some(14));
        assert_eq!(range.start_column(), 0);
        assert_eq!(range.end_column(), 6);
    }

    #[test]
    fn test_parse_single_cell_and_open_columns() {
        let cell = A1Range::parse("Sheet1!A7").unwrap();
        assert_eq!(cell.start_row(), Some(7));
        assert_eq!(cell.end_row(), Some(7));

        let column = A1Range::parse("A:A").unwrap();
        assert_eq!(column, A1Range::column(0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(A1Range::parse("nonsense").is_none());
        assert!(A1Range::parse("A0:G1").is_none());
        assert!(A1Range::parse("").is_none());
    }

    #[test]
    fn test_column_letters_round_trip() {
        for index in [0, 6, 25, 26, 51, 52, 701, 702] {
            assert_eq!(column_index(&column_letters(index)), Some(index));
        }
        assert_eq!(column_letters(26), "AA");
    }

    #[test]
    fn test_qualified_quotes_sheet_names() {
        assert_eq!(
            A1Range::column(0).qualified("August 2025"),
            "'August 2025'!A:A"
        );
        assert_eq!(quote_sheet_name("Bob's"), "'Bob''s'");
    }
}
