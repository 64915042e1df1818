use super::types::{EventLog, RecordMetadata};
use crate::error::{ConfigError, PublishError};
use crate::events::{encode, validate, PipelineStage, StageEvent};
use crate::telemetry;

use std::sync::Arc;
use tracing::Instrument;

/// Validates, encodes and appends stage events to one topic, keyed by `"{tenantId}:{runId}"`.
pub struct StagePublisher {
    log: Arc<dyn EventLog>,
    topic: String,
}

impl StagePublisher {
    pub fn new(log: Arc<dyn EventLog>, topic: impl Into<String>) -> Result<Self, ConfigError> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "publisher topic must not be blank".to_string(),
            ));
        }
        Ok(Self { log, topic })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Nothing is appended unless the event passes validation and encodes cleanly.
    pub async fn publish<S: PipelineStage>(
        &self,
        event: &StageEvent<S>,
    ) -> Result<RecordMetadata, PublishError> {
        let key = event.partition_key();
        let stage = event.stage().as_str();
        let span = telemetry::publish_span(&self.topic, &key, stage);

        self.append_event(event, &key, stage)
            .instrument(span)
            .await
    }

    async fn append_event<S: PipelineStage>(
        &self,
        event: &StageEvent<S>,
        key: &str,
        stage: &str,
    ) -> Result<RecordMetadata, PublishError> {
        if let Err(err) = validate(event) {
            telemetry::record_publish_failure(&self.topic, "invalid");
            tracing::warn!(error = %err, "stage event rejected");
            return Err(err.into());
        }

        let payload = encode(event).map_err(|err| {
            telemetry::record_publish_failure(&self.topic, "codec");
            PublishError::from(err)
        })?;

        let metadata = self
            .log
            .append(&self.topic, key, Some(payload))
            .await
            .map_err(|err| {
                telemetry::record_publish_failure(&self.topic, "transport");
                tracing::error!(error = %err, "append failed");
                PublishError::from(err)
            })?;

        telemetry::record_published(&self.topic, stage);
        tracing::debug!(
            partition = metadata.partition,
            offset = metadata.offset,
            "stage event published"
        );

        Ok(metadata)
    }
}
