use crate::error::{HandlerError, PipelineError};
use crate::events::validate::MAX_RUN_ID_LEN;
use crate::events::{DeidStage, IngestionEvent, IngestionStage, Quantity};
use crate::messaging::StageHandler;
use crate::pipeline::{PipelineResources, RunContext, RunDriver, RunOutcome, RunSteps};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Largest batch a masking job accepts.
pub const MAX_DEID_RECORD_COUNT: i64 = 10_000_000;

/// Object-store prefixes for raw input and masked output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationTemplates {
    raw_prefix: String,
    output_prefix: String,
}

impl LocationTemplates {
    pub fn new(raw_prefix: impl Into<String>, output_prefix: impl Into<String>) -> Self {
        Self {
            raw_prefix: raw_prefix.into().trim_end_matches('/').to_string(),
            output_prefix: output_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// `{raw_prefix}/{tenantId}/{batchId}`
    pub fn raw_location(&self, tenant_id: &str, batch_id: &str) -> String {
        format!("{}/{}/{}", self.raw_prefix, tenant_id, batch_id)
    }

    /// `{output_prefix}/{tenantId}/{jobId}`
    pub fn output_location(&self, tenant_id: &str, job_id: &str) -> String {
        format!("{}/{}/{}", self.output_prefix, tenant_id, job_id)
    }
}

impl Default for LocationTemplates {
    fn default() -> Self {
        Self::new("s3://raw", "s3://deid")
    }
}

/// Masks the raw batch of one job.
#[async_trait]
pub trait MaskingEngine: Send + Sync + 'static {
    async fn mask(&self, context: &RunContext) -> std::io::Result<()>;
}

/// Stand-in masking engine that only takes time.
pub struct SimulatedMasker {
    latency: Duration,
}

impl SimulatedMasker {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl MaskingEngine for SimulatedMasker {
    async fn mask(&self, context: &RunContext) -> std::io::Result<()> {
        tokio::time::sleep(self.latency).await;
        tracing::debug!(records = context.record_count, "batch masked");
        Ok(())
    }
}

pub struct MaskingSteps {
    engine: Arc<dyn MaskingEngine>,
    locations: LocationTemplates,
}

#[async_trait]
impl RunSteps for MaskingSteps {
    type Stage = DeidStage;
    const MAX_RECORD_COUNT: i64 = MAX_DEID_RECORD_COUNT;
    const ERROR_CODE_PREFIX: &'static str = "DEID";

    fn quantity(&self, context: &RunContext, stage: DeidStage) -> Quantity {
        let location = match stage {
            DeidStage::Completed => context.output_location.as_ref(),
            _ => context.raw_location.as_ref(),
        };
        Quantity::Location(location.cloned().unwrap_or_default())
    }

    async fn execute(&self, mut context: RunContext) -> std::io::Result<RunContext> {
        self.engine.mask(&context).await?;
        context.output_location = Some(
            self.locations
                .output_location(&context.tenant_id, &context.run_id),
        );
        Ok(context)
    }
}

/// Starts a masking job for every persisted ingestion run it is handed.
pub struct DeidPipeline {
    driver: RunDriver<MaskingSteps>,
    locations: LocationTemplates,
}

impl DeidPipeline {
    pub fn new(
        engine: Arc<dyn MaskingEngine>,
        locations: LocationTemplates,
        resources: PipelineResources,
    ) -> Self {
        let steps = MaskingSteps {
            engine,
            locations: locations.clone(),
        };
        Self {
            driver: RunDriver::new(Arc::new(steps), resources),
            locations,
        }
    }

    /// Runs a job for a `PERSISTED` event. Any other stage is skipped with `Ok(None)`.
    pub async fn handle_ingestion_event(
        &self,
        event: IngestionEvent,
    ) -> Result<Option<RunOutcome>, PipelineError> {
        if event.stage() != IngestionStage::Persisted {
            tracing::debug!(
                run = %event.run_id(),
                stage = %event.stage(),
                "ignoring non-persisted ingestion event"
            );
            return Ok(None);
        }

        let context = self.derive_context(&event)?;
        tracing::info!(
            batch = %event.run_id(),
            job = %context.run_id,
            "de-identification job requested"
        );

        self.driver.drive(context).await.map(Some)
    }

    /// Job id `{uuid}-{batchId}`; eventId and sourceSystem carry over from upstream.
    ///
    /// Fails before anything is published when the job id could not pass event validation,
    /// since no stage event of such a run, FAILED included, could ever be appended.
    fn derive_context(&self, event: &IngestionEvent) -> Result<RunContext, PipelineError> {
        let record_count = event.quantity().record_count().ok_or_else(|| {
            PipelineError::InvalidUpstream(format!(
                "ingestion event for {} carries no record count",
                event.run_id()
            ))
        })?;

        let job_id = format!("{}-{}", uuid::Uuid::new_v4(), event.run_id());
        if job_id.chars().count() > MAX_RUN_ID_LEN {
            return Err(PipelineError::InvalidUpstream(format!(
                "job id for batch {} would exceed {} characters",
                event.run_id(),
                MAX_RUN_ID_LEN
            )));
        }
        let raw_location = self
            .locations
            .raw_location(event.tenant_id(), event.run_id());

        Ok(RunContext::new(
            event.event_id(),
            event.tenant_id(),
            job_id,
            event.source_system(),
            record_count,
        )
        .with_raw_location(raw_location))
    }
}

#[async_trait]
impl StageHandler<IngestionStage> for DeidPipeline {
    /// An upstream event that can never start a run is acknowledged and dropped; redelivery
    /// would fail the same way.
    async fn handle(&self, event: IngestionEvent) -> Result<(), HandlerError> {
        match self.handle_ingestion_event(event).await {
            Ok(_) => Ok(()),
            Err(PipelineError::InvalidUpstream(reason)) => {
                tracing::error!(%reason, "dropping ingestion event that cannot start a job");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
