//! Post-commit enrichment queue
//!
//! Formatting runs only after the data row is committed. Each task is one
//! batch of format requests; a failing task is logged and counted, and the
//! remaining tasks still run.

use crate::error::{Error, Result};
use crate::metrics::ENRICHMENT_FAILURES_TOTAL;
use crate::store::TabularStore;
use crate::types::FormatRequest;
use tracing::{debug, warn};

/// Upper bound on tasks per append
pub const MAX_ENRICHMENT_TASKS: usize = 8;

/// One best-effort formatting batch
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentTask {
    /// Task name for logs and metrics
    pub name: &'static str,
    /// Requests applied in one batch call
    pub requests: Vec<FormatRequest>,
}

impl EnrichmentTask {
    /// Task `name` applying `requests`
    pub fn new(name: &'static str, requests: Vec<FormatRequest>) -> Self {
        Self { name, requests }
    }
}

/// What running the queue did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Tasks attempted
    pub attempted: usize,
    /// Names of tasks that failed
    pub failed: Vec<&'static str>,
}

/// Bounded list of formatting tasks for one partition
#[derive(Debug, Clone)]
pub struct EnrichmentQueue {
    partition_id: i64,
    tasks: Vec<EnrichmentTask>,
}

impl EnrichmentQueue {
    /// Empty queue targeting `partition_id`
    pub fn new(partition_id: i64) -> Self {
        Self {
            partition_id,
            tasks: Vec::new(),
        }
    }

    /// Enqueue a task. Tasks without requests are dropped.
    pub fn push(&mut self, task: EnrichmentTask) -> Result<()> {
        if task.requests.is_empty() {
            return Ok(());
        }
        if self.tasks.len() >= MAX_ENRICHMENT_TASKS {
            return Err(Error::Formatting(format!(
                "enrichment queue full, dropping {}",
                task.name
            )));
        }
        self.tasks.push(task);
        Ok(())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.tasks.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every task in order against `store`.
    pub async fn run(self, store: &dyn TabularStore) -> EnrichmentReport {
        let mut report = EnrichmentReport::default();
        for task in self.tasks {
            report.attempted += 1;
            match store.batch_format(self.partition_id, &task.requests).await {
                Ok(()) => debug!(task = task.name, "Applied formatting"),
                Err(e) => {
                    let err = Error::Formatting(e.to_string());
                    warn!(
                        task = task.name,
                        partition_id = self.partition_id,
                        error = %err,
                        "Formatting failed, record left unformatted"
                    );
                    ENRICHMENT_FAILURES_TOTAL
                        .with_label_values(&[task.name])
                        .inc();
                    report.failed.push(task.name);
                }
            }
        }
        report
    }
}
