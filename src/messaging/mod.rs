//! Partitioned Event Log & Stage Messaging
//!
//! The log is the only channel between the services. Producers append keyed records; each
//! consumer group reads a topic from the earliest offset and settles every delivery manually.
//!
//! ## Delivery Guarantees
//! - **Ordering**: records sharing a key land on one partition and keep their append order.
//! - **At-least-once**: a nacked delivery comes back to the same group after a backoff, with no
//!   attempt limit and no dead-letter topic. Handlers must tolerate duplicates.
//!
//! ## Submodules
//! - **`partitioner`**: key to partition mapping.
//! - **`types`**: records, deliveries, acknowledgments and the `EventLog` trait.
//! - **`memory`**: the in-process `EventLog` implementation.
//! - **`publisher`**: validate, encode and append stage events.
//! - **`consumer`**: group subscription, decode and dispatch to a `StageHandler`.

pub mod consumer;
pub mod memory;
pub mod partitioner;
pub mod publisher;
pub mod types;

pub use consumer::{Dispatch, Settlement, StageConsumer, StageHandler};
pub use memory::MemoryEventLog;
pub use publisher::StagePublisher;
pub use types::{
    Acknowledgment, Delivery, EventLog, GroupStatsSnapshot, Record, RecordMetadata, Subscription,
};
