//! Ledger reader

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::partition::PartitionResolver;
use crate::range::A1Range;
use crate::store::{find_partition, TabularStore};
use crate::types::Row;
use std::sync::Arc;
use tracing::debug;

/// Reads the current month partition verbatim
#[derive(Debug, Clone)]
pub struct LedgerReader {
    store: Arc<dyn TabularStore>,
    resolver: PartitionResolver,
    clock: Arc<dyn Clock>,
}

impl LedgerReader {
    /// Reader using the system clock
    pub fn new(store: Arc<dyn TabularStore>, resolver: PartitionResolver) -> Self {
        Self {
            store,
            resolver,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Every row below row 1 of this month's partition, header blocks
    /// included. A missing partition reads as empty.
    pub async fn read_all(&self) -> Result<Vec<Row>> {
        let title = self.resolver.partition_name(self.clock.now());
        self.read_partition(&title).await
    }

    /// Rows `A2:G` of the partition named `title`
    pub async fn read_partition(&self, title: &str) -> Result<Vec<Row>> {
        let exists = find_partition(self.store.as_ref(), title)
            .await
            .map_err(|e| Error::store("list_partitions", e))?
            .is_some();
        if !exists {
            debug!(partition = title, "Partition not created yet");
            return Ok(Vec::new());
        }

        let rows = self
            .store
            .read_range(title, &A1Range::ledger_rows(2, None))
            .await
            .map_err(|e| Error::store("read_rows", e))?;
        debug!(partition = title, rows = rows.len(), "Read ledger rows");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::{InMemoryStore, StoreOperation};
    use crate::types::header_row;
    use chrono::{TimeZone, Utc};

    fn reader(store: Arc<InMemoryStore>) -> LedgerReader {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 8, 8, 1, 5, 3).unwrap());
        LedgerReader::new(store, PartitionResolver::from_name("Asia/Manila").unwrap())
            .with_clock(Arc::new(clock))
    }

    #[tokio::test]
    async fn test_missing_partition_reads_empty() {
        let store = Arc::new(InMemoryStore::new());
        assert!(reader(store.clone()).read_all().await.unwrap().is_empty());
        assert_eq!(store.call_count(StoreOperation::ReadRange), 0);
    }

    #[tokio::test]
    async fn test_only_first_row_reads_empty() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_partition("August 2025", vec![header_row()]);
        assert!(reader(store).read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rows_returned_verbatim_from_row_two() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_partition(
            "August 2025",
            vec![
                Vec::new(),
                vec!["Friday, August 8, 2025".to_string()],
                header_row(),
            ],
        );
        let rows = reader(store).read_all().await.unwrap();
        assert_eq!(rows, vec![vec!["Friday, August 8, 2025".to_string()], header_row()]);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_partition("August 2025", vec![header_row()]);
        store.fail(StoreOperation::ReadRange);
        assert!(matches!(
            reader(store).read_all().await,
            Err(Error::Store { .. })
        ));
    }
}
