//! Core types: row layout, partitions, formatting requests, receipts

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One spreadsheet row, cell values as text
pub type Row = Vec<String>;

/// Fixed column order, A through G.
pub const COLUMN_HEADERS: [&str; 7] = [
    "Date",
    "Courier",
    "QTY",
    "Description",
    "Order ID",
    "Remarks",
    "Marketplace",
];

/// Number of ledger columns
pub const COLUMN_COUNT: u32 = COLUMN_HEADERS.len() as u32;

/// Ledger column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Server-side submission timestamp
    Date,
    /// Courier name
    Courier,
    /// Quantity
    Qty,
    /// Free-text description
    Description,
    /// Marketplace order id
    OrderId,
    /// Outcome remarks, drives highlighting
    Remarks,
    /// Marketplace, stored uppercased
    Marketplace,
}

impl Column {
    /// All columns in sheet order
    pub const ALL: [Column; 7] = [
        Column::Date,
        Column::Courier,
        Column::Qty,
        Column::Description,
        Column::OrderId,
        Column::Remarks,
        Column::Marketplace,
    ];

    /// Zero-based column index
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Header cell text
    pub fn header(self) -> &'static str {
        COLUMN_HEADERS[self as usize]
    }

    /// Request key for this column: the header lowercased, spaces to hyphens.
    pub fn input_key(self) -> String {
        self.header().to_lowercase().replace(' ', "-").replace('\'', "")
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// The column-header row of a header block
pub fn header_row() -> Row {
    COLUMN_HEADERS.iter().map(|h| h.to_string()).collect()
}

/// A month tab as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    /// Tab title, e.g. "August 2025"
    pub title: String,
    /// Store-assigned id, only used for formatting calls
    pub partition_id: i64,
}

/// RGB colour with components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub red: f32,
    /// Green
    pub green: f32,
    /// Blue
    pub blue: f32,
}

impl Color {
    /// Header block spacer row
    pub const SPACER_GRAY: Color = Color {
        red: 0.95,
        green: 0.95,
        blue: 0.95,
    };
    /// Day marker and column-header rows
    pub const HEADER_GREEN: Color = Color {
        red: 0.7,
        green: 1.0,
        blue: 0.7,
    };
    /// Remarks containing SUCCESS
    pub const SUCCESS_GREEN: Color = Color {
        red: 0.8,
        green: 1.0,
        blue: 0.8,
    };
    /// Remarks containing FAILED
    pub const FAILED_RED: Color = Color {
        red: 1.0,
        green: 0.7,
        blue: 0.7,
    };
}

/// Cell attributes applied by a format request. Unset attributes are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CellStyle {
    /// Background colour
    pub background: Option<Color>,
    /// Bold text
    pub bold: bool,
    /// Center horizontally
    pub centered: bool,
}

impl CellStyle {
    /// Centered, nothing else
    pub fn centered() -> Self {
        Self {
            centered: true,
            ..Self::default()
        }
    }

    /// Background colour only
    pub fn background(color: Color) -> Self {
        Self {
            background: Some(color),
            ..Self::default()
        }
    }
}

/// Apply `style` to a rectangular block of cells.
///
/// Row and column bounds are zero-based and end-exclusive, matching the
/// grid-range convention of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatRequest {
    /// First row (inclusive)
    pub start_row: u32,
    /// Last row (exclusive)
    pub end_row: u32,
    /// First column (inclusive)
    pub start_column: u32,
    /// Last column (exclusive)
    pub end_column: u32,
    /// Attributes to set
    pub style: CellStyle,
}

impl FormatRequest {
    /// Style one full ledger row (columns A..G)
    pub fn full_row(row_index: u32, style: CellStyle) -> Self {
        Self {
            start_row: row_index,
            end_row: row_index + 1,
            start_column: 0,
            end_column: COLUMN_COUNT,
            style,
        }
    }

    /// Style a single cell
    pub fn cell(row_index: u32, column: Column, style: CellStyle) -> Self {
        Self {
            start_row: row_index,
            end_row: row_index + 1,
            start_column: column.index(),
            end_column: column.index() + 1,
            style,
        }
    }
}

/// Result of an append as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendOutcome {
    /// Range actually written, e.g. `'August 2025'!A5:G5`
    pub updated_range: String,
}

impl AppendOutcome {
    /// One-based first row written, if the range could be parsed.
    pub fn start_row(&self) -> Option<u32> {
        crate::range::A1Range::parse(&self.updated_range).and_then(|r| r.start_row())
    }
}

/// What a committed append did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendReceipt {
    /// Correlation id used in logs
    pub submission_id: Uuid,
    /// Month tab written to
    pub partition: String,
    /// One-based row of the data record, when the store reported it
    pub row: Option<u32>,
    /// Whether a new header block preceded the record
    pub header_block_inserted: bool,
    /// The row exactly as written
    pub values: Row,
    /// Formatting tasks that failed (best-effort, informational)
    pub enrichment_failures: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_keys_are_lowercase_hyphenated() {
        assert_eq!(Column::OrderId.input_key(), "order-id");
        assert_eq!(Column::Qty.input_key(), "qty");
        assert_eq!(Column::Marketplace.input_key(), "marketplace");
    }

    #[test]
    fn test_column_order_matches_headers() {
        for (i, column) in Column::ALL.iter().enumerate() {
            assert_eq!(column.index() as usize, i);
            assert_eq!(column.header(), COLUMN_HEADERS[i]);
        }
        assert_eq!(Column::Remarks.index(), 5);
    }

    #[test]
    fn test_append_outcome_start_row() {
        let outcome = AppendOutcome {
            updated_range: "'August 2025'!A12:G14".to_string(),
        };
        assert_eq!(outcome.start_row(), Some(12));

        let garbage = AppendOutcome {
            updated_range: "nonsense".to_string(),
        };
        assert_eq!(garbage.start_row(), None);
    }
}
