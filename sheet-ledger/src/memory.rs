//! In-memory tabular store
//!
//! Mirrors the observable behaviour of the Sheets values API closely enough
//! for the ledger: appends land after the last populated row, reads drop
//! trailing empty rows and cells. Individual operations can be switched to
//! fail for failure-injection tests.

use crate::error::{Error, Result};
use crate::range::{column_letters, A1Range};
use crate::store::TabularStore;
use crate::types::{AppendOutcome, FormatRequest, PartitionInfo, Row};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use tracing::debug;

/// Store operations, for failure injection and call accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `list_partitions`
    ListPartitions,
    /// `create_partition`
    CreatePartition,
    /// `read_range`
    ReadRange,
    /// `append_rows`
    AppendRows,
    /// `batch_format`
    BatchFormat,
}

impl StoreOperation {
    fn as_str(self) -> &'static str {
        match self {
            StoreOperation::ListPartitions => "list_partitions",
            StoreOperation::CreatePartition => "create_partition",
            StoreOperation::ReadRange => "read_range",
            StoreOperation::AppendRows => "append_rows",
            StoreOperation::BatchFormat => "batch_format",
        }
    }
}

#[derive(Debug)]
struct MemorySheet {
    info: PartitionInfo,
    rows: Vec<Row>,
    formats: Vec<FormatRequest>,
}

#[derive(Debug, Default)]
struct MemoryState {
    sheets: Vec<MemorySheet>,
    next_id: i64,
}

impl MemoryState {
    fn sheet_mut(&mut self, title: &str) -> Result<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.info.title == title)
            .ok_or_else(|| Error::Store {
                operation: "resolve_sheet",
                message: format!("Unable to parse range: no sheet named {:?}", title),
            })
    }

    fn add_sheet(&mut self, title: &str, rows: Vec<Row>) -> PartitionInfo {
        self.next_id += 1;
        let info = PartitionInfo {
            title: title.to_string(),
            partition_id: self.next_id,
        };
        self.sheets.push(MemorySheet {
            info: info.clone(),
            rows,
            formats: Vec::new(),
        });
        info
    }
}

/// Tabular store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
    failing: Mutex<HashSet<StoreOperation>>,
    calls: Mutex<Vec<StoreOperation>>,
}

impl InMemoryStore {
    /// Empty spreadsheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a partition with pre-existing rows (e.g. manual edits)
    pub fn seed_partition(&self, title: &str, rows: Vec<Row>) -> PartitionInfo {
        self.state.write().add_sheet(title, rows)
    }

    /// Make every subsequent `operation` call fail until [`recover`](Self::recover)
    pub fn fail(&self, operation: StoreOperation) {
        self.failing.lock().insert(operation);
    }

    /// Stop failing `operation`
    pub fn recover(&self, operation: StoreOperation) {
        self.failing.lock().remove(&operation);
    }

    /// Raw rows of a partition, including empty spacer rows
    pub fn rows(&self, title: &str) -> Option<Vec<Row>> {
        self.state
            .read()
            .sheets
            .iter()
            .find(|s| s.info.title == title)
            .map(|s| s.rows.clone())
    }

    /// Format requests applied to a partition, in order
    pub fn format_requests(&self, title: &str) -> Vec<FormatRequest> {
        self.state
            .read()
            .sheets
            .iter()
            .find(|s| s.info.title == title)
            .map(|s| s.formats.clone())
            .unwrap_or_default()
    }

    /// Every operation invoked so far, failed ones included
    pub fn calls(&self) -> Vec<StoreOperation> {
        self.calls.lock().clone()
    }

    /// Number of times `operation` was invoked
    pub fn call_count(&self, operation: StoreOperation) -> usize {
        self.calls.lock().iter().filter(|op| **op == operation).count()
    }

    fn enter(&self, operation: StoreOperation) -> Result<()> {
        self.calls.lock().push(operation);
        if self.failing.lock().contains(&operation) {
            debug!(operation = operation.as_str(), "Injected store failure");
            return Err(Error::Store {
                operation: operation.as_str(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn is_blank(row: &Row) -> bool {
    row.iter().all(|cell| cell.is_empty())
}

fn trim_row(mut row: Row) -> Row {
    while row.last().map_or(false, |c| c.is_empty()) {
        row.pop();
    }
    row
}

#[async_trait]
impl TabularStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_partitions(&self) -> Result<Vec<PartitionInfo>> {
        self.enter(StoreOperation::ListPartitions)?;
        Ok(self
            .state
            .read()
            .sheets
            .iter()
            .map(|s| s.info.clone())
            .collect())
    }

    async fn create_partition(&self, title: &str) -> Result<PartitionInfo> {
        self.enter(StoreOperation::CreatePartition)?;
        let mut state = self.state.write();
        if state.sheets.iter().any(|s| s.info.title == title) {
            return Err(Error::Store {
                operation: "create_partition",
                message: format!("A sheet with the name {:?} already exists", title),
            });
        }
        Ok(state.add_sheet(title, Vec::new()))
    }

    async fn read_range(&self, partition: &str, range: &A1Range) -> Result<Vec<Row>> {
        self.enter(StoreOperation::ReadRange)?;
        let mut state = self.state.write();
        let sheet = state.sheet_mut(partition)?;

        let first = range.start_row().unwrap_or(1) as usize - 1;
        let last = range
            .end_row()
            .map_or(sheet.rows.len(), |r| (r as usize).min(sheet.rows.len()));
        let start_col = range.start_column() as usize;
        let end_col = range.end_column() as usize + 1;

        let mut rows: Vec<Row> = sheet
            .rows
            .iter()
            .skip(first)
            .take(last.saturating_sub(first))
            .map(|row| {
                let cells = row
                    .iter()
                    .skip(start_col)
                    .take(end_col.saturating_sub(start_col))
                    .cloned()
                    .collect();
                trim_row(cells)
            })
            .collect();
        while rows.last().map_or(false, |r| r.is_empty()) {
            rows.pop();
        }
        Ok(rows)
    }

    async fn append_rows(
        &self,
        partition: &str,
        _range: &A1Range,
        rows: Vec<Row>,
    ) -> Result<AppendOutcome> {
        self.enter(StoreOperation::AppendRows)?;
        let mut state = self.state.write();
        let sheet = state.sheet_mut(partition)?;

        let populated = sheet
            .rows
            .iter()
            .rposition(|row| !is_blank(row))
            .map_or(0, |i| i + 1);
        sheet.rows.truncate(populated);

        let start = populated as u32 + 1;
        let end = start + rows.len().max(1) as u32 - 1;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1) as u32;
        sheet.rows.extend(rows);

        let updated_range = format!(
            "{}!A{}:{}{}",
            crate::range::quote_sheet_name(partition),
            start,
            column_letters(width - 1),
            end
        );
        debug!(partition, %updated_range, "Appended rows");
        Ok(AppendOutcome { updated_range })
    }

    async fn batch_format(&self, partition_id: i64, requests: &[FormatRequest]) -> Result<()> {
        self.enter(StoreOperation::BatchFormat)?;
        let mut state = self.state.write();
        let sheet = state
            .sheets
            .iter_mut()
            .find(|s| s.info.partition_id == partition_id)
            .ok_or_else(|| Error::Store {
                operation: "batch_format",
                message: format!("No grid with id: {}", partition_id),
            })?;
        sheet.formats.extend(requests.iter().cloned());
        Ok(())
    }
}
