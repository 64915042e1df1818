use crate::error::CodecError;
use chrono::{DateTime, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// Which shape of `quantity` a pipeline's schema carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityKind {
    RecordCount,
    Location,
}

/// Record count (ingestion) or payload location (de-identification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantity {
    RecordCount(i64),
    Location(String),
}

impl Quantity {
    pub fn kind(&self) -> QuantityKind {
        match self {
            Quantity::RecordCount(_) => QuantityKind::RecordCount,
            Quantity::Location(_) => QuantityKind::Location,
        }
    }

    pub fn record_count(&self) -> Option<i64> {
        match self {
            Quantity::RecordCount(count) => Some(*count),
            Quantity::Location(_) => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Quantity::Location(location) => Some(location),
            Quantity::RecordCount(_) => None,
        }
    }
}

/// The stage enum of one pipeline.
///
/// Every pipeline has the same structure: an initial progress stage, a validated progress
/// stage, one success terminal and the absorbing `FAILED` terminal.
pub trait PipelineStage:
    Copy + Eq + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Pipeline name, also written into every encoded event.
    const PIPELINE: &'static str;
    const QUANTITY: QuantityKind;

    const STARTED: Self;
    const VALIDATED: Self;
    const SUCCEEDED: Self;
    const FAILED: Self;

    fn as_str(self) -> &'static str;

    fn is_terminal(self) -> bool {
        self == Self::SUCCEEDED || self == Self::FAILED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestionStage {
    Received,
    Validated,
    Persisted,
    Failed,
}

impl PipelineStage for IngestionStage {
    const PIPELINE: &'static str = "ingestion";
    const QUANTITY: QuantityKind = QuantityKind::RecordCount;

    const STARTED: Self = IngestionStage::Received;
    const VALIDATED: Self = IngestionStage::Validated;
    const SUCCEEDED: Self = IngestionStage::Persisted;
    const FAILED: Self = IngestionStage::Failed;

    fn as_str(self) -> &'static str {
        match self {
            IngestionStage::Received => "RECEIVED",
            IngestionStage::Validated => "VALIDATED",
            IngestionStage::Persisted => "PERSISTED",
            IngestionStage::Failed => "FAILED",
        }
    }
}

impl Display for IngestionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeidStage {
    Requested,
    Running,
    Completed,
    Failed,
}

impl PipelineStage for DeidStage {
    const PIPELINE: &'static str = "deid";
    const QUANTITY: QuantityKind = QuantityKind::Location;

    const STARTED: Self = DeidStage::Requested;
    const VALIDATED: Self = DeidStage::Running;
    const SUCCEEDED: Self = DeidStage::Completed;
    const FAILED: Self = DeidStage::Failed;

    fn as_str(self) -> &'static str {
        match self {
            DeidStage::Requested => "REQUESTED",
            DeidStage::Running => "RUNNING",
            DeidStage::Completed => "COMPLETED",
            DeidStage::Failed => "FAILED",
        }
    }
}

impl Display for DeidStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stage transition of one run.
///
/// Immutable once built: construct it with [`StageEvent::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct StageEvent<S> {
    pub(super) event_id: String,
    pub(super) occurred_at: DateTime<Utc>,
    pub(super) tenant_id: String,
    pub(super) run_id: String,
    pub(super) stage: S,
    pub(super) quantity: Quantity,
    pub(super) source_system: String,
    pub(super) error_code: Option<String>,
    pub(super) error_message: Option<String>,
}

pub type IngestionEvent = StageEvent<IngestionStage>;
pub type DeidEvent = StageEvent<DeidStage>;

impl<S: PipelineStage> StageEvent<S> {
    pub fn builder() -> StageEventBuilder<S> {
        StageEventBuilder::default()
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn stage(&self) -> S {
        self.stage
    }

    pub fn quantity(&self) -> &Quantity {
        &self.quantity
    }

    pub fn source_system(&self) -> &str {
        &self.source_system
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// `"{tenantId}:{runId}"`, stable for the whole run.
    pub fn partition_key(&self) -> String {
        partition_key(&self.tenant_id, &self.run_id)
    }
}

pub fn partition_key(tenant_id: &str, run_id: &str) -> String {
    format!("{}:{}", tenant_id, run_id)
}

/// Collects fields for a [`StageEvent`]; `build` enforces required-field presence.
#[derive(Debug, Clone)]
pub struct StageEventBuilder<S> {
    event_id: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
    tenant_id: Option<String>,
    run_id: Option<String>,
    stage: Option<S>,
    quantity: Option<Quantity>,
    source_system: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
}

impl<S> Default for StageEventBuilder<S> {
    fn default() -> Self {
        Self {
            event_id: None,
            occurred_at: None,
            tenant_id: None,
            run_id: None,
            stage: None,
            quantity: None,
            source_system: None,
            error_code: None,
            error_message: None,
        }
    }
}

impl<S: PipelineStage> StageEventBuilder<S> {
    pub fn event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Truncated to milliseconds, the resolution of the wire timestamp.
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at.trunc_subsecs(3));
        self
    }

    pub fn occurred_now(self) -> Self {
        self.occurred_at(Utc::now())
    }

    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn stage(mut self, stage: S) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn source_system(mut self, source_system: impl Into<String>) -> Self {
        self.source_system = Some(source_system.into());
        self
    }

    pub fn error_code(mut self, error_code: Option<String>) -> Self {
        self.error_code = error_code;
        self
    }

    pub fn error_message(mut self, error_message: Option<String>) -> Self {
        self.error_message = error_message;
        self
    }

    pub fn build(self) -> Result<StageEvent<S>, CodecError> {
        Ok(StageEvent {
            event_id: required(self.event_id, "eventId")?,
            occurred_at: required(self.occurred_at, "occurredAt")?,
            tenant_id: required(self.tenant_id, "tenantId")?,
            run_id: required(self.run_id, "runId")?,
            stage: required(self.stage, "stage")?,
            quantity: required(self.quantity, "quantity")?,
            source_system: required(self.source_system, "sourceSystem")?,
            error_code: self.error_code,
            error_message: self.error_message,
        })
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, CodecError> {
    value.ok_or_else(|| CodecError::schema(field, "required field is not set"))
}
