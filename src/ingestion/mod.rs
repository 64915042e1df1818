//! Ingestion Service Module
//!
//! Accepts batches of clinical records and carries each one through the ingestion stages.
//!
//! ## Workflow
//! 1. **Intake**: `POST /batches` checks the request shape and answers `202 Accepted`.
//! 2. **Run**: `RECEIVED`, record-count validation on the CPU pool, `VALIDATED`.
//! 3. **Persist**: the batch store runs on the IO pool, then `PERSISTED` is published.
//!
//! Any failure along the way ends the run with one `FAILED` event (`INGEST-*` error code).

pub mod handlers;
pub mod orchestrator;
pub mod types;

pub use orchestrator::{
    BatchPersistSteps, BatchStore, IngestionPipeline, SimulatedBatchStore, MAX_INGEST_RECORD_COUNT,
};
pub use types::{BatchAccepted, BatchRejected, BatchRequest};

#[cfg(test)]
mod tests;
