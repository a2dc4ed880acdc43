//! Ledger metrics

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

lazy_static::lazy_static! {
    pub static ref LEDGER_APPENDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ledger_appends_total",
        "Ledger append attempts by outcome (committed, rejected, failed)",
        &["outcome"]
    )
    .unwrap();

    pub static ref HEADER_BLOCKS_INSERTED_TOTAL: IntCounter = register_int_counter!(
        "ledger_header_blocks_inserted_total",
        "Day header blocks appended"
    )
    .unwrap();

    pub static ref PARTITIONS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "ledger_partitions_created_total",
        "Month partitions created"
    )
    .unwrap();

    pub static ref ENRICHMENT_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ledger_enrichment_failures_total",
        "Best-effort formatting tasks that failed",
        &["task"]
    )
    .unwrap();

    pub static ref STORE_CALL_DURATION: HistogramVec = register_histogram_vec!(
        "ledger_store_call_duration_seconds",
        "Tabular store call duration",
        &["store", "operation"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();
}
