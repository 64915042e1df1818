//! Shared Run Chain
//!
//! Every pipeline walks the same chain:
//!
//! ```text
//! STARTED ──cpu: validate──> VALIDATED ──io: heavy step──> SUCCEEDED
//!    │                          │                             │
//!    └──────────────── any failure ──────────────> FAILED ────┘
//! ```
//!
//! Each step returns `Result<_, FailureReason>` and the first `Err` short-circuits to a single
//! FAILED event. A run therefore ends in exactly one terminal event, unless even the FAILED
//! publish is lost, which surfaces as `PipelineError::TerminalPublish`.

use super::context::{validate_record_count, RunContext, RunOutcome};
use crate::error::{FailureReason, PipelineError, PublishError};
use crate::events::{PipelineStage, Quantity, StageEvent};
use crate::executor::pool::WorkerPool;
use crate::messaging::StagePublisher;
use crate::telemetry;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::Instrument;

/// The pipeline-specific parts of a run.
#[async_trait]
pub trait RunSteps: Send + Sync + 'static {
    type Stage: PipelineStage;

    /// Inclusive record-count ceiling checked on the CPU pool.
    const MAX_RECORD_COUNT: i64;
    /// First half of every error code, e.g. `INGEST` in `INGEST-VALIDATION`.
    const ERROR_CODE_PREFIX: &'static str;

    /// The quantity carried by the event for `stage`.
    fn quantity(&self, context: &RunContext, stage: Self::Stage) -> Quantity;

    /// The heavy IO step. Runs on the IO pool.
    async fn execute(&self, context: RunContext) -> std::io::Result<RunContext>;
}

/// Publisher and pools a pipeline is constructed with.
#[derive(Clone)]
pub struct PipelineResources {
    pub publisher: Arc<StagePublisher>,
    pub cpu_pool: Arc<WorkerPool>,
    pub io_pool: Arc<WorkerPool>,
}

pub struct RunDriver<P: RunSteps> {
    steps: Arc<P>,
    resources: PipelineResources,
}

impl<P: RunSteps> RunDriver<P> {
    pub fn new(steps: Arc<P>, resources: PipelineResources) -> Self {
        Self { steps, resources }
    }

    pub fn steps(&self) -> &P {
        &self.steps
    }

    /// Drives one run to its terminal event.
    pub async fn drive(&self, context: RunContext) -> Result<RunOutcome, PipelineError> {
        let span = telemetry::run_span(
            <P::Stage as PipelineStage>::PIPELINE,
            &context.tenant_id,
            &context.run_id,
        );

        async move {
            tracing::info!(record_count = context.record_count, "run started");

            match self.advance(context.clone()).await {
                Ok(finished) => {
                    tracing::info!("run succeeded");
                    telemetry::record_run_finished(
                        <P::Stage as PipelineStage>::PIPELINE,
                        "succeeded",
                    );
                    Ok(RunOutcome::Succeeded(finished))
                }
                Err(reason) => self.fail(context, reason).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn advance(&self, context: RunContext) -> Result<RunContext, FailureReason> {
        self.publish(&context, <P::Stage as PipelineStage>::STARTED).await?;

        let max = P::MAX_RECORD_COUNT;
        let validated = self
            .resources
            .cpu_pool
            .run_blocking(move || validate_record_count(context, max))
            .await??;
        self.publish(&validated, <P::Stage as PipelineStage>::VALIDATED).await?;

        let steps = self.steps.clone();
        let finished = self
            .resources
            .io_pool
            .run(async move { steps.execute(validated).await })
            .await??;
        self.publish(&finished, <P::Stage as PipelineStage>::SUCCEEDED).await?;

        Ok(finished)
    }

    async fn fail(
        &self,
        context: RunContext,
        reason: FailureReason,
    ) -> Result<RunOutcome, PipelineError> {
        let error_code = reason.error_code(P::ERROR_CODE_PREFIX);
        tracing::warn!(error_code = %error_code, reason = %reason, "run failed");

        let failed = self.event(
            &context,
            <P::Stage as PipelineStage>::FAILED,
            Some((error_code, reason.to_string())),
        );
        let published = match failed {
            Ok(event) => self.resources.publisher.publish(&event).await.map(|_| ()),
            Err(err) => Err(err),
        };

        match published {
            Ok(()) => {
                telemetry::record_run_finished(<P::Stage as PipelineStage>::PIPELINE, "failed");
                Ok(RunOutcome::Failed { context, reason })
            }
            Err(source) => {
                tracing::error!(error = %source, "FAILED event could not be published");
                telemetry::record_run_finished(
                    <P::Stage as PipelineStage>::PIPELINE,
                    "unreported",
                );
                Err(PipelineError::TerminalPublish {
                    run_key: context.partition_key(),
                    reason,
                    source,
                })
            }
        }
    }

    async fn publish(&self, context: &RunContext, stage: P::Stage) -> Result<(), PublishError> {
        let event = self.event(context, stage, None)?;
        self.resources.publisher.publish(&event).await?;
        Ok(())
    }

    fn event(
        &self,
        context: &RunContext,
        stage: P::Stage,
        error: Option<(String, String)>,
    ) -> Result<StageEvent<P::Stage>, PublishError> {
        let (error_code, error_message) = match error {
            Some((code, message)) => (Some(code), Some(message)),
            None => (None, None),
        };

        let event = StageEvent::<P::Stage>::builder()
            .event_id(context.event_id.clone())
            .occurred_now()
            .tenant_id(context.tenant_id.clone())
            .run_id(context.run_id.clone())
            .stage(stage)
            .quantity(self.steps.quantity(context, stage))
            .source_system(context.source_system.clone())
            .error_code(error_code)
            .error_message(error_message)
            .build()?;

        Ok(event)
    }
}
