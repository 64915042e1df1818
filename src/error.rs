//! Error Taxonomy
//!
//! One `thiserror` enum per concern. Errors that end up inside a FAILED event are `Clone`
//! so the run can keep the reason while the terminal event is being published.

use std::path::PathBuf;

/// Wire-level failures of the stage event codec.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// A required field is missing, or a field does not fit the pipeline's schema.
    #[error("schema violation on `{field}`: {reason}")]
    SchemaViolation { field: &'static str, reason: String },

    /// Truncated, corrupt or foreign bytes.
    #[error("decode error: {0}")]
    Decode(String),
}

impl CodecError {
    pub fn schema(field: &'static str, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            field,
            reason: reason.into(),
        }
    }
}

/// A decoded or freshly built event breaks a domain rule.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid event field `{field}`: {reason}")]
pub struct EventValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl EventValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// The event log could not take or hand out a record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("unknown topic `{0}`")]
    UnknownTopic(String),

    #[error("topic `{0}` already exists")]
    TopicExists(String),

    #[error("group `{group}` is already subscribed to `{topic}`")]
    GroupAlreadySubscribed { topic: String, group: String },

    #[error("event log is closed")]
    Closed,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    #[error("event rejected before publish: {0}")]
    Invalid(#[from] EventValidationError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

/// Submission or execution failures of a worker pool.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PoolError {
    #[error("pool `{pool}` is saturated ({workers} workers busy, queue capacity {capacity})")]
    Saturated {
        pool: String,
        workers: usize,
        capacity: usize,
    },

    #[error("pool `{pool}` is shut down")]
    ShutDown { pool: String },

    #[error("worker in pool `{pool}` was lost before completing the job")]
    WorkerLost { pool: String },
}

/// Domain rule violated by a run. Deterministic, never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("recordCount must be greater than 0 (was {0})")]
    NonPositiveRecordCount(i64),

    #[error("recordCount {actual} exceeds the maximum allowed ({max})")]
    RecordCountCeilingExceeded { actual: i64, max: i64 },
}

/// Why a run ended in FAILED. Each variant maps to one error-code suffix.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FailureReason {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("heavy step failed: {0}")]
    Io(String),

    #[error("stage publish failed: {0}")]
    Publish(#[from] PublishError),
}

impl FailureReason {
    pub fn kind(&self) -> &'static str {
        match self {
            FailureReason::Validation(_) => "VALIDATION",
            FailureReason::Pool(_) => "POOL",
            FailureReason::Io(_) => "IO",
            FailureReason::Publish(_) => "PUBLISH",
        }
    }

    /// Error code carried by the FAILED event, e.g. `DEID-VALIDATION`.
    pub fn error_code(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.kind())
    }
}

impl From<std::io::Error> for FailureReason {
    fn from(err: std::io::Error) -> Self {
        FailureReason::Io(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The run failed and even its FAILED event could not be published.
    #[error("run {run_key} failed ({reason}) and its FAILED event could not be published: {source}")]
    TerminalPublish {
        run_key: String,
        reason: FailureReason,
        #[source]
        source: PublishError,
    },

    #[error("upstream event cannot start a run: {0}")]
    InvalidUpstream(String),
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("event for run {run_id} carries no payload location")]
    MissingLocation { run_id: String },

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("index storage failure: {0}")]
    Storage(String),
}

/// Anything a stage handler can return to its consumer. Always answered with a nack.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
