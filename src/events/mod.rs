//! Stage Event Model & Codec
//!
//! Every message on the log is a [`StageEvent`]: one stage transition of one run, identified by
//! `(tenantId, runId)`. Both pipelines share the record shape and differ only in their stage
//! enum and in what `quantity` carries.
//!
//! ## Submodules
//! - **`types`**: the event, its builder, the stage enums and the `PipelineStage` trait.
//! - **`codec`**: versioned binary encoding (bincode body behind a small header).
//! - **`validate`**: domain rules checked before publish and again after decode.

pub mod codec;
pub mod types;
pub mod validate;

pub use codec::{decode, encode};
pub use types::{
    partition_key, DeidEvent, DeidStage, IngestionEvent, IngestionStage, PipelineStage, Quantity,
    QuantityKind, StageEvent, StageEventBuilder,
};
pub use validate::validate;

#[cfg(test)]
mod tests;
