use crate::error::{FailureReason, ValidationError};
use crate::events::partition_key;

/// Everything one run carries from stage to stage.
///
/// Built once when the run starts and passed by value through the chain. The same `event_id`
/// is stamped on every event of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub event_id: String,
    pub tenant_id: String,
    pub run_id: String,
    pub source_system: String,
    pub record_count: i64,
    /// Where the raw batch lives. Set for de-identification runs.
    pub raw_location: Option<String>,
    /// Where masked output was written. Set once the heavy step has run.
    pub output_location: Option<String>,
}

impl RunContext {
    pub fn new(
        event_id: impl Into<String>,
        tenant_id: impl Into<String>,
        run_id: impl Into<String>,
        source_system: impl Into<String>,
        record_count: i64,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            tenant_id: tenant_id.into(),
            run_id: run_id.into(),
            source_system: source_system.into(),
            record_count,
            raw_location: None,
            output_location: None,
        }
    }

    pub fn with_raw_location(mut self, location: impl Into<String>) -> Self {
        self.raw_location = Some(location.into());
        self
    }

    pub fn partition_key(&self) -> String {
        partition_key(&self.tenant_id, &self.run_id)
    }
}

/// The run's record count must be positive and at most `max`.
pub fn validate_record_count(context: RunContext, max: i64) -> Result<RunContext, ValidationError> {
    if context.record_count <= 0 {
        return Err(ValidationError::NonPositiveRecordCount(context.record_count));
    }
    if context.record_count > max {
        return Err(ValidationError::RecordCountCeilingExceeded {
            actual: context.record_count,
            max,
        });
    }
    Ok(context)
}

/// How a run ended once its terminal event is on the log.
#[derive(Debug)]
pub enum RunOutcome {
    Succeeded(RunContext),
    Failed {
        context: RunContext,
        reason: FailureReason,
    },
}

impl RunOutcome {
    pub fn context(&self) -> &RunContext {
        match self {
            RunOutcome::Succeeded(context) => context,
            RunOutcome::Failed { context, .. } => context,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, RunOutcome::Succeeded(_))
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            RunOutcome::Succeeded(_) => None,
            RunOutcome::Failed { reason, .. } => Some(reason),
        }
    }
}
