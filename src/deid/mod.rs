//! De-identification Service Module
//!
//! Reacts to `PERSISTED` ingestion events and runs one masking job per event:
//! `REQUESTED`, record-count validation on the CPU pool, `RUNNING`, masking on the IO pool,
//! then `COMPLETED` with the output location. Failures end in one `FAILED` event (`DEID-*`).
//!
//! Redelivered upstream events are not deduplicated: each delivery starts a new job with a
//! fresh job id.

pub mod orchestrator;

pub use orchestrator::{
    DeidPipeline, LocationTemplates, MaskingEngine, MaskingSteps, SimulatedMasker,
    MAX_DEID_RECORD_COUNT,
};
