//! Tabular store interface
//!
//! The ledger treats the spreadsheet as a system of record it does not own.
//! Every call may fail independently and there is no transaction spanning
//! calls; the writer is responsible for ordering them safely.

use crate::error::Result;
use crate::range::A1Range;
use crate::types::{AppendOutcome, FormatRequest, PartitionInfo, Row};
use async_trait::async_trait;

/// Named-sheet, grid-structured remote store
#[async_trait]
pub trait TabularStore: Send + Sync + std::fmt::Debug {
    /// Backend name, for logs and metrics
    fn name(&self) -> &str;

    /// All partitions (tabs) in the spreadsheet
    async fn list_partitions(&self) -> Result<Vec<PartitionInfo>>;

    /// Create a partition named `title`
    async fn create_partition(&self, title: &str) -> Result<PartitionInfo>;

    /// Cell values in `range` of `partition`.
    ///
    /// Trailing empty rows and trailing empty cells are omitted, as the
    /// Sheets values API does.
    async fn read_range(&self, partition: &str, range: &A1Range) -> Result<Vec<Row>>;

    /// Append `rows` after the last populated row of the table at `range`
    async fn append_rows(
        &self,
        partition: &str,
        range: &A1Range,
        rows: Vec<Row>,
    ) -> Result<AppendOutcome>;

    /// Apply cell formatting in one batch
    async fn batch_format(&self, partition_id: i64, requests: &[FormatRequest]) -> Result<()>;
}

/// Find a partition by exact title
pub async fn find_partition(
    store: &dyn TabularStore,
    title: &str,
) -> Result<Option<PartitionInfo>> {
    let partitions = store.list_partitions().await?;
    Ok(partitions.into_iter().find(|p| p.title == title))
}
