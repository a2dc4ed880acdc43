//! Operations Sheet Ledger
//!
//! Append-only event ledger kept in a shared, human-edited spreadsheet with
//! one tab per calendar month.
//!
//! # Architecture
//!
//! - **Partition Resolver**: maps "now" to the month tab name in a fixed time zone
//! - **Ledger Writer**: keeps the day-grouped header blocks intact, then appends
//! - **Ledger Reader**: returns every row below row 1 of the current month tab
//! - **Tabular Store**: the remote grid (Google Sheets, or in-memory for tests)
//!
//! # Invariants
//!
//! - Append-only: existing rows are never rewritten
//! - Each day's records follow a header block whose marker date is that day
//! - The Date cell is always server time, never caller input
//! - Formatting is cosmetic; it never decides the outcome of an append

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod clock;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod oauth;
pub mod partition;
pub mod range;
pub mod reader;
pub mod record;
pub mod sheets;
pub mod store;
pub mod types;
pub mod writer;

// Re-exports
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::LedgerConfig;
pub use error::{Error, Result};
pub use memory::{InMemoryStore, StoreOperation};
pub use partition::{resolve_partition_name, PartitionResolver};
pub use range::A1Range;
pub use reader::LedgerReader;
pub use record::{EventRecord, EventRecordInput, RemarksHighlight};
pub use sheets::GoogleSheetsStore;
pub use store::TabularStore;
pub use types::{AppendReceipt, Column, PartitionInfo, Row, COLUMN_HEADERS};
pub use writer::LedgerWriter;
