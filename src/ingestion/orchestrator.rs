use super::types::BatchRequest;
use crate::error::PipelineError;
use crate::events::{IngestionStage, Quantity};
use crate::pipeline::{PipelineResources, RunContext, RunDriver, RunOutcome, RunSteps};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Largest batch the ingestion pipeline accepts.
pub const MAX_INGEST_RECORD_COUNT: i64 = 5_000_000;

/// Durable storage for an accepted batch.
#[async_trait]
pub trait BatchStore: Send + Sync + 'static {
    async fn persist(&self, context: &RunContext) -> std::io::Result<()>;
}

/// Stand-in store that only takes time.
pub struct SimulatedBatchStore {
    latency: Duration,
}

impl SimulatedBatchStore {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl BatchStore for SimulatedBatchStore {
    async fn persist(&self, context: &RunContext) -> std::io::Result<()> {
        tokio::time::sleep(self.latency).await;
        tracing::debug!(
            records = context.record_count,
            latency_ms = self.latency.as_millis() as u64,
            "batch persisted"
        );
        Ok(())
    }
}

pub struct BatchPersistSteps {
    store: Arc<dyn BatchStore>,
}

#[async_trait]
impl RunSteps for BatchPersistSteps {
    type Stage = IngestionStage;
    const MAX_RECORD_COUNT: i64 = MAX_INGEST_RECORD_COUNT;
    const ERROR_CODE_PREFIX: &'static str = "INGEST";

    fn quantity(&self, context: &RunContext, _stage: IngestionStage) -> Quantity {
        Quantity::RecordCount(context.record_count)
    }

    async fn execute(&self, context: RunContext) -> std::io::Result<RunContext> {
        self.store.persist(&context).await?;
        Ok(context)
    }
}

/// Carries an accepted batch through RECEIVED, VALIDATED and PERSISTED.
pub struct IngestionPipeline {
    driver: RunDriver<BatchPersistSteps>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn BatchStore>, resources: PipelineResources) -> Self {
        Self {
            driver: RunDriver::new(Arc::new(BatchPersistSteps { store }), resources),
        }
    }

    /// Starts and drives one run for `request`. The batch id becomes the run id.
    pub async fn start_run(&self, request: BatchRequest) -> Result<RunOutcome, PipelineError> {
        let context = RunContext::new(
            uuid::Uuid::new_v4().to_string(),
            request.tenant_id,
            request.batch_id,
            request.source_system,
            request.record_count,
        );

        self.driver.drive(context).await
    }
}
