//! Clinical Record Pipeline Library
//!
//! Batches of clinical records move through three services that only talk through a
//! partitioned event log. This crate holds all three plus the log itself; the binary
//! (`main.rs`) wires them into one process.
//!
//! ## Architecture Modules
//! - **`events`**: the stage event record, its binary codec and domain validation.
//! - **`messaging`**: the partitioned log, the stage publisher and the stage consumer.
//! - **`executor`**: bounded CPU and IO worker pools that keep heavy steps off the listeners.
//! - **`pipeline`**: the run chain shared by every orchestrator, with failure capture.
//! - **`ingestion`**: batch intake and the `RECEIVED -> VALIDATED -> PERSISTED` runs.
//! - **`deid`**: masking jobs started by persisted batches (`REQUESTED -> RUNNING -> COMPLETED`).
//! - **`indexer`**: turns completed jobs into searchable documents.
//! - **`config`**, **`error`**, **`telemetry`**: configuration, error taxonomy, logging and metrics.

pub mod config;
pub mod deid;
pub mod error;
pub mod events;
pub mod executor;
pub mod indexer;
pub mod ingestion;
pub mod messaging;
pub mod pipeline;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;
