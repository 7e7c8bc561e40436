//! Batch progress aggregation.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use clipnote_core::traits::BatchRepository;
use clipnote_core::{Batch, BatchStatus, Result};

/// Folds sub-task outcomes into their batch record.
///
/// Called exactly once per sub-task terminal transition; the caller gates on
/// the task repository's idempotent `complete`/`fail` return value, so a
/// duplicate terminal report never reaches this point.
pub struct BatchAggregator {
    batches: Arc<dyn BatchRepository>,
}

impl BatchAggregator {
    pub fn new(batches: Arc<dyn BatchRepository>) -> Self {
        Self { batches }
    }

    /// Record one sub-task outcome and return the updated batch.
    pub async fn record(&self, batch_id: Uuid, success: bool) -> Result<Batch> {
        let batch = self.batches.record_terminal(batch_id, success).await?;

        if batch.status == BatchStatus::Completed {
            info!(
                batch_id = %batch.id,
                total = batch.total,
                success = batch.success_count,
                failed = batch.failed_count,
                "batch completed"
            );
        }
        if batch.processed > batch.total {
            warn!(batch_id = %batch.id, "batch processed count exceeds total");
        }

        Ok(batch)
    }
}
