//! Logging, Spans and Metrics
//!
//! Structured logging goes through `tracing`; counters go through the `metrics` facade and
//! are no-ops until a recorder is installed.

use metrics::{counter, describe_counter};
use tracing::Span;
use tracing_subscriber::EnvFilter;

// ============================================================
// Metric names
// ============================================================

pub const EVENTS_PUBLISHED: &str = "pipeline_events_published_total";
pub const PUBLISH_FAILURES: &str = "pipeline_publish_failures_total";
pub const DELIVERIES_CONSUMED: &str = "pipeline_deliveries_consumed_total";
pub const RUNS_FINISHED: &str = "pipeline_runs_finished_total";
pub const POOL_REJECTIONS: &str = "pipeline_pool_rejections_total";
pub const DOCUMENTS_INDEXED: &str = "pipeline_documents_indexed_total";

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Registers metric descriptions. Call once at startup.
pub fn register_metrics() {
    describe_counter!(EVENTS_PUBLISHED, "Stage events appended to the log");
    describe_counter!(PUBLISH_FAILURES, "Stage events that failed validation, encoding or append");
    describe_counter!(DELIVERIES_CONSUMED, "Deliveries settled by stage consumers, by outcome");
    describe_counter!(RUNS_FINISHED, "Pipeline runs that reached a terminal outcome");
    describe_counter!(POOL_REJECTIONS, "Jobs rejected by a saturated or stopped worker pool");
    describe_counter!(DOCUMENTS_INDEXED, "Index documents written by the indexer");
}

pub fn publish_span(topic: &str, key: &str, stage: &str) -> Span {
    tracing::info_span!("publish", topic = topic, key = key, stage = stage)
}

pub fn consume_span(consumer: &str, topic: &str, partition: u32, offset: u64, attempt: u32) -> Span {
    tracing::info_span!(
        "consume",
        consumer = consumer,
        topic = topic,
        partition = partition,
        offset = offset,
        attempt = attempt,
    )
}

pub fn run_span(pipeline: &str, tenant_id: &str, run_id: &str) -> Span {
    tracing::info_span!("run", pipeline = pipeline, tenant = tenant_id, run = run_id)
}

pub fn record_published(topic: &str, stage: &str) {
    counter!(EVENTS_PUBLISHED, "topic" => topic.to_string(), "stage" => stage.to_string())
        .increment(1);
}

pub fn record_publish_failure(topic: &str, kind: &'static str) {
    counter!(PUBLISH_FAILURES, "topic" => topic.to_string(), "kind" => kind).increment(1);
}

pub fn record_consumed(consumer: &str, outcome: &'static str) {
    counter!(DELIVERIES_CONSUMED, "consumer" => consumer.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_run_finished(pipeline: &'static str, outcome: &'static str) {
    counter!(RUNS_FINISHED, "pipeline" => pipeline, "outcome" => outcome).increment(1);
}

pub fn record_pool_rejection(pool: &str) {
    counter!(POOL_REJECTIONS, "pool" => pool.to_string()).increment(1);
}

pub fn record_document_indexed() {
    counter!(DOCUMENTS_INDEXED).increment(1);
}
