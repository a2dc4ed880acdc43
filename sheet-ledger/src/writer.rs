//! Ledger writer
//!
//! An append is a sequential chain of store calls:
//!
//! 1. validate the submission (no store calls on failure)
//! 2. make sure the month partition exists
//! 3. decide whether today's header block is already at the bottom
//! 4. append a header block if not
//! 5. append the record row (the commit point)
//! 6. run the post-commit formatting queue
//!
//! Failures in 2 through 5 abort the append with [`Error::Store`]. Anything
//! in 6 is logged and reported on the receipt only.

use crate::clock::{Clock, SystemClock};
use crate::enrichment::{EnrichmentQueue, EnrichmentTask};
use crate::error::{Error, Result};
use crate::metrics::{
    HEADER_BLOCKS_INSERTED_TOTAL, LEDGER_APPENDS_TOTAL, PARTITIONS_CREATED_TOTAL,
};
use crate::partition::{parse_day_marker, PartitionResolver};
use crate::range::A1Range;
use crate::record::{EventRecord, EventRecordInput};
use crate::store::{find_partition, TabularStore};
use crate::types::{
    header_row, AppendReceipt, CellStyle, Color, Column, FormatRequest, PartitionInfo, Row,
    COLUMN_COUNT,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Rows above the last populated row inspected by the freshness check
const FRESHNESS_LOOKBACK: u32 = 10;

/// Appends event records to the month partition
#[derive(Debug, Clone)]
pub struct LedgerWriter {
    store: Arc<dyn TabularStore>,
    resolver: PartitionResolver,
    clock: Arc<dyn Clock>,
    default_marketplace: Option<String>,
}

impl LedgerWriter {
    /// Writer using the system clock
    pub fn new(store: Arc<dyn TabularStore>, resolver: PartitionResolver) -> Self {
        Self {
            store,
            resolver,
            clock: Arc::new(SystemClock),
            default_marketplace: None,
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Marketplace used when a submission leaves it blank
    pub fn with_default_marketplace(mut self, marketplace: Option<String>) -> Self {
        self.default_marketplace = marketplace;
        self
    }

    /// Resolver in use
    pub fn resolver(&self) -> &PartitionResolver {
        &self.resolver
    }

    /// Append one record.
    pub async fn append(&self, input: EventRecordInput) -> Result<AppendReceipt> {
        let submission_id = Uuid::new_v4();

        let record = match EventRecord::from_input(&input, self.default_marketplace.as_deref()) {
            Ok(record) => record,
            Err(e) => {
                LEDGER_APPENDS_TOTAL.with_label_values(&["rejected"]).inc();
                debug!(%submission_id, error = %e, "Submission rejected");
                return Err(e);
            }
        };

        match self.commit(submission_id, record).await {
            Ok(receipt) => {
                LEDGER_APPENDS_TOTAL.with_label_values(&["committed"]).inc();
                Ok(receipt)
            }
            Err(e) => {
                LEDGER_APPENDS_TOTAL.with_label_values(&["failed"]).inc();
                error!(%submission_id, store = self.store.name(), error = %e, "Append failed");
                Err(e)
            }
        }
    }

    async fn commit(&self, submission_id: Uuid, record: EventRecord) -> Result<AppendReceipt> {
        let now = self.clock.now();
        let title = self.resolver.partition_name(now);
        let today = self.resolver.today(now);

        let (partition, created) = self.ensure_partition(&title).await?;

        let needs_header = created || self.needs_header_block(&title, today).await?;

        let mut header_start = None;
        if needs_header {
            let block = vec![Vec::new(), vec![self.resolver.day_marker(now)], header_row()];
            let outcome = self
                .store
                .append_rows(&title, &A1Range::column(0), block)
                .await
                .map_err(|e| Error::store("append_header_block", e))?;
            header_start = outcome.start_row();
            HEADER_BLOCKS_INSERTED_TOTAL.inc();
            info!(
                %submission_id,
                partition = %title,
                range = %outcome.updated_range,
                "Inserted day header block"
            );
        }

        let values = record.to_row(self.resolver.timestamp(now));
        let outcome = self
            .store
            .append_rows(&title, &A1Range::column(0), vec![values.clone()])
            .await
            .map_err(|e| Error::store("append_record", e))?;
        let row = outcome.start_row();
        info!(
            %submission_id,
            partition = %title,
            range = %outcome.updated_range,
            "Record committed"
        );

        let queue = self.enrichment_tasks(&partition, needs_header, header_start, row, &record);
        let report = queue.run(self.store.as_ref()).await;

        Ok(AppendReceipt {
            submission_id,
            partition: title,
            row,
            header_block_inserted: needs_header,
            values,
            enrichment_failures: report.failed.iter().map(|t| t.to_string()).collect(),
        })
    }

    /// Look the partition up, creating it when absent.
    ///
    /// A failed create is followed by one more lookup, since a concurrent
    /// writer may have created the same month in the meantime.
    async fn ensure_partition(&self, title: &str) -> Result<(PartitionInfo, bool)> {
        let store = self.store.as_ref();
        if let Some(existing) = find_partition(store, title)
            .await
            .map_err(|e| Error::store("list_partitions", e))?
        {
            return Ok((existing, false));
        }

        match store.create_partition(title).await {
            Ok(created) => {
                PARTITIONS_CREATED_TOTAL.inc();
                info!(partition = %title, partition_id = created.partition_id, "Created partition");
                Ok((created, true))
            }
            Err(create_err) => match find_partition(store, title).await {
                Ok(Some(existing)) => {
                    warn!(partition = %title, "Partition appeared during create, reusing it");
                    Ok((existing, false))
                }
                _ => Err(Error::store("create_partition", create_err)),
            },
        }
    }

    /// Whether `partition` lacks a header block for `today` at its bottom.
    ///
    /// Reads column A to find the last populated row `n`, then inspects rows
    /// `max(1, n-10)..=n`. Performs reads only.
    pub async fn needs_header_block(&self, partition: &str, today: NaiveDate) -> Result<bool> {
        let column = self
            .store
            .read_range(partition, &A1Range::column(0))
            .await
            .map_err(|e| Error::store("read_column", e))?;
        let n = column.len() as u32;
        if n == 0 {
            return Ok(true);
        }

        let window_range = A1Range::ledger_rows(n.saturating_sub(FRESHNESS_LOOKBACK), Some(n));
        let window = self
            .store
            .read_range(partition, &window_range)
            .await
            .map_err(|e| Error::store("read_window", e))?;

        let fresh = header_block_is_fresh(&window, today);
        debug!(partition, rows = n, window = %window_range, fresh, "Checked header freshness");
        Ok(!fresh)
    }

    fn enrichment_tasks(
        &self,
        partition: &PartitionInfo,
        header_inserted: bool,
        header_start: Option<u32>,
        row: Option<u32>,
        record: &EventRecord,
    ) -> EnrichmentQueue {
        let mut queue = EnrichmentQueue::new(partition.partition_id);
        let mut tasks = Vec::new();

        match (header_inserted, header_start) {
            (true, Some(spacer_row)) => {
                let spacer = spacer_row - 1;
                tasks.push(EnrichmentTask::new(
                    "header_spacer",
                    vec![FormatRequest::full_row(
                        spacer,
                        CellStyle {
                            background: Some(Color::SPACER_GRAY),
                            bold: false,
                            centered: true,
                        },
                    )],
                ));
                tasks.push(EnrichmentTask::new(
                    "header_rows",
                    vec![FormatRequest {
                        start_row: spacer + 1,
                        end_row: spacer + 3,
                        start_column: 0,
                        end_column: COLUMN_COUNT,
                        style: CellStyle {
                            background: Some(Color::HEADER_GREEN),
                            bold: true,
                            centered: true,
                        },
                    }],
                ));
            }
            (true, None) => warn!(
                partition = %partition.title,
                "Header block row unknown, skipping its formatting"
            ),
            _ => {}
        }

        match row {
            Some(row) => {
                let index = row - 1;
                tasks.push(EnrichmentTask::new(
                    "center_row",
                    vec![FormatRequest::full_row(index, CellStyle::centered())],
                ));
                if let Some(highlight) = record.remarks_highlight() {
                    tasks.push(EnrichmentTask::new(
                        "remarks_highlight",
                        vec![FormatRequest::cell(
                            index,
                            Column::Remarks,
                            CellStyle::background(highlight.color()),
                        )],
                    ));
                }
            }
            None => warn!(
                partition = %partition.title,
                "Record row unknown, skipping its formatting"
            ),
        }

        for task in tasks {
            if let Err(e) = queue.push(task) {
                warn!(error = %e, "Formatting task dropped");
            }
        }
        queue
    }
}

/// True when `window` holds a header block dated `today`.
///
/// Scans upward for a row equal to the column headers whose preceding row is
/// a day marker for `today`. Blocks dated another day and header rows without
/// a parseable marker above them are skipped.
pub fn header_block_is_fresh(window: &[Row], today: NaiveDate) -> bool {
    let headers = header_row();
    (1..window.len()).rev().any(|i| {
        window[i] == headers
            && window[i - 1]
                .first()
                .and_then(|cell| parse_day_marker(cell))
                .map_or(false, |date| date == today)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::{InMemoryStore, StoreOperation};
    use chrono::{TimeZone, Utc};

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn aug8() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 8).unwrap()
    }

    fn writer(store: Arc<InMemoryStore>) -> LedgerWriter {
        // 2025-08-08 09:05:03 in Manila
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 8, 8, 1, 5, 3).unwrap());
        LedgerWriter::new(store, PartitionResolver::from_name("Asia/Manila").unwrap())
            .with_clock(Arc::new(clock))
    }

    fn input(pairs: &[(&str, &str)]) -> EventRecordInput {
        EventRecordInput::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_fresh_header_at_bottom() {
        let window = vec![
            Vec::new(),
            row(&["Friday, August 8, 2025"]),
            header_row(),
            row(&["8/8/2025, 9:00:00 AM", "", "1", "", "", "", "SHOPEE"]),
        ];
        assert!(header_block_is_fresh(&window, aug8()));
    }

    #[test]
    fn test_stale_header_needs_new_block() {
        let window = vec![row(&["Thursday, August 7, 2025"]), header_row()];
        assert!(!header_block_is_fresh(&window, aug8()));
    }

    #[test]
    fn test_today_block_above_stale_block_is_fresh() {
        let window = vec![
            row(&["Friday, August 8, 2025"]),
            header_row(),
            row(&["8/8/2025, 9:00:00 AM", "", "1", "", "", "", "SHOPEE"]),
            Vec::new(),
            row(&["Thursday, August 7, 2025"]),
            header_row(),
        ];
        assert!(header_block_is_fresh(&window, aug8()));
    }

    #[test]
    fn test_only_other_days_in_window_is_stale() {
        let window = vec![
            row(&["Wednesday, August 6, 2025"]),
            header_row(),
            Vec::new(),
            row(&["Saturday, August 9, 2025"]),
            header_row(),
        ];
        assert!(!header_block_is_fresh(&window, aug8()));
    }

    #[test]
    fn test_unparseable_marker_keeps_scanning() {
        let window = vec![
            row(&["Friday, August 8, 2025"]),
            header_row(),
            row(&["note: reprinted labels"]),
            header_row(),
        ];
        assert!(header_block_is_fresh(&window, aug8()));
    }

    #[test]
    fn test_header_in_first_window_row_has_no_marker() {
        assert!(!header_block_is_fresh(&[header_row()], aug8()));
        assert!(!header_block_is_fresh(&[], aug8()));
    }

    #[tokio::test]
    async fn test_first_append_of_month_creates_partition_and_header() {
        let store = Arc::new(InMemoryStore::new());
        let receipt = writer(store.clone())
            .append(input(&[("marketplace", "lazada"), ("qty", "3")]))
            .await
            .unwrap();

        assert_eq!(receipt.partition, "August 2025");
        assert!(receipt.header_block_inserted);
        assert_eq!(receipt.row, Some(4));
        assert!(receipt.enrichment_failures.is_empty());

        let rows = store.rows("August 2025").unwrap();
        assert_eq!(
            rows,
            vec![
                Vec::new(),
                row(&["Friday, August 8, 2025"]),
                header_row(),
                row(&["8/8/2025, 9:05:03 AM", "", "3", "", "", "", "LAZADA"]),
            ]
        );
        // freshness is not checked on a partition that was just created
        assert_eq!(store.call_count(StoreOperation::ReadRange), 0);
    }

    #[tokio::test]
    async fn test_same_day_append_adds_no_header() {
        let store = Arc::new(InMemoryStore::new());
        let writer = writer(store.clone());
        writer.append(input(&[("marketplace", "shopee")])).await.unwrap();
        let second = writer.append(input(&[("marketplace", "tiktok")])).await.unwrap();

        assert!(!second.header_block_inserted);
        assert_eq!(second.row, Some(5));
        assert_eq!(store.rows("August 2025").unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_formatting_requests_for_new_block() {
        let store = Arc::new(InMemoryStore::new());
        writer(store.clone())
            .append(input(&[("marketplace", "lazada"), ("remarks", "Delivery FAILED")]))
            .await
            .unwrap();

        let formats = store.format_requests("August 2025");
        assert_eq!(formats.len(), 4);
        assert_eq!(formats[0].start_row, 0);
        assert_eq!(formats[0].style.background, Some(Color::SPACER_GRAY));
        assert_eq!((formats[1].start_row, formats[1].end_row), (1, 3));
        assert!(formats[1].style.bold);
        assert_eq!(formats[2], FormatRequest::full_row(3, CellStyle::centered()));
        assert_eq!(
            formats[3],
            FormatRequest::cell(3, Column::Remarks, CellStyle::background(Color::FAILED_RED))
        );
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_store_calls() {
        let store = Arc::new(InMemoryStore::new());
        let err = writer(store.clone())
            .append(input(&[("courier", "J&T")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_default_marketplace_fills_blank() {
        let store = Arc::new(InMemoryStore::new());
        let receipt = writer(store)
            .with_default_marketplace(Some("walk-in".to_string()))
            .append(input(&[("marketplace", "  ")]))
            .await
            .unwrap();
        assert_eq!(receipt.values[Column::Marketplace.index() as usize], "WALK-IN");
    }

    #[tokio::test]
    async fn test_formatting_failure_does_not_fail_append() {
        let store = Arc::new(InMemoryStore::new());
        store.fail(StoreOperation::BatchFormat);
        let receipt = writer(store.clone())
            .append(input(&[("marketplace", "lazada"), ("remarks", "SUCCESS")]))
            .await
            .unwrap();
        assert_eq!(
            receipt.enrichment_failures,
            vec!["header_spacer", "header_rows", "center_row", "remarks_highlight"]
        );
        assert_eq!(store.rows("August 2025").unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_header_append_failure_is_fatal() {
        let store = Arc::new(InMemoryStore::new());
        store.fail(StoreOperation::AppendRows);
        let err = writer(store.clone())
            .append(input(&[("marketplace", "lazada")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
        assert_eq!(store.call_count(StoreOperation::AppendRows), 1);
        assert_eq!(store.call_count(StoreOperation::BatchFormat), 0);
    }

    #[tokio::test]
    async fn test_freshness_read_failure_is_fatal() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_partition("August 2025", vec![row(&["x"])]);
        store.fail(StoreOperation::ReadRange);
        let err = writer(store.clone())
            .append(input(&[("marketplace", "lazada")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
        assert_eq!(store.call_count(StoreOperation::AppendRows), 0);
    }

    #[tokio::test]
    async fn test_stale_partition_gets_new_block() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_partition(
            "August 2025",
            vec![
                Vec::new(),
                row(&["Thursday, August 7, 2025"]),
                header_row(),
                row(&["8/7/2025, 5:00:00 PM", "LBC", "1", "", "", "", "SHOPEE"]),
            ],
        );
        let receipt = writer(store.clone())
            .append(input(&[("marketplace", "lazada")]))
            .await
            .unwrap();
        assert!(receipt.header_block_inserted);
        assert_eq!(receipt.row, Some(8));
        assert_eq!(
            store.rows("August 2025").unwrap()[5],
            row(&["Friday, August 8, 2025"])
        );
    }

    #[tokio::test]
    async fn test_needs_header_block_is_read_only_and_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_partition(
            "August 2025",
            vec![row(&["Friday, August 8, 2025"]), header_row()],
        );
        let writer = writer(store.clone());

        let first = writer.needs_header_block("August 2025", aug8()).await.unwrap();
        let second = writer.needs_header_block("August 2025", aug8()).await.unwrap();
        assert!(!first);
        assert_eq!(first, second);
        assert_eq!(store.call_count(StoreOperation::AppendRows), 0);
    }

    #[tokio::test]
    async fn test_empty_existing_partition_needs_header() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_partition("August 2025", Vec::new());
        let writer = writer(store.clone());
        assert!(writer.needs_header_block("August 2025", aug8()).await.unwrap());
    }
}
