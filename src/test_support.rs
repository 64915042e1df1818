//! Fixtures shared by the subsystem test modules.

use crate::events::{decode, PipelineStage, StageEvent};
use crate::executor::pool::WorkerPool;
use crate::executor::types::{PoolKind, PoolSettings};
use crate::messaging::{MemoryEventLog, StagePublisher};
use crate::pipeline::PipelineResources;

use std::sync::Arc;
use std::time::Duration;

pub const INGESTION_TOPIC: &str = "clinical.ingestion.events";
pub const DEID_TOPIC: &str = "clinical.deid.jobs";

pub fn memory_log() -> Arc<MemoryEventLog> {
    let log = Arc::new(MemoryEventLog::new());
    log.create_topic(INGESTION_TOPIC, 12).unwrap();
    log.create_topic(DEID_TOPIC, 12).unwrap();
    log
}

pub fn resources(log: &Arc<MemoryEventLog>, topic: &str) -> PipelineResources {
    PipelineResources {
        publisher: Arc::new(StagePublisher::new(log.clone(), topic).unwrap()),
        cpu_pool: WorkerPool::new("test-cpu", PoolKind::Cpu, PoolSettings::new(2, 2, 16)),
        io_pool: WorkerPool::new("test-io", PoolKind::Io, PoolSettings::new(2, 4, 16)),
    }
}

/// Decodes every event on `topic` in append order.
pub fn events_on<S: PipelineStage>(log: &MemoryEventLog, topic: &str) -> Vec<StageEvent<S>> {
    log.records(topic)
        .unwrap()
        .into_iter()
        .filter_map(|record| record.payload)
        .map(|payload| decode::<S>(&payload).unwrap())
        .collect()
}

pub fn stages_of<S: PipelineStage>(events: &[StageEvent<S>], run_id: &str) -> Vec<S> {
    events
        .iter()
        .filter(|event| event.run_id() == run_id)
        .map(|event| event.stage())
        .collect()
}

pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 3s");
}
