use anyhow::Context;
use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use clap::Parser;
use clinical_pipeline::config::AppConfig;
use clinical_pipeline::deid::{DeidPipeline, LocationTemplates, SimulatedMasker};
use clinical_pipeline::events::{DeidStage, IngestionStage};
use clinical_pipeline::executor::pool::WorkerPool;
use clinical_pipeline::executor::types::PoolKind;
use clinical_pipeline::indexer::handlers::{handle_get_document, handle_list_documents};
use clinical_pipeline::indexer::{
    DocumentCache, InMemoryIndexRepository, IndexQueryService, ResearchIndexer,
};
use clinical_pipeline::ingestion::handlers::handle_submit_batch;
use clinical_pipeline::ingestion::{IngestionPipeline, SimulatedBatchStore};
use clinical_pipeline::messaging::{EventLog, MemoryEventLog, StageConsumer, StagePublisher};
use clinical_pipeline::pipeline::PipelineResources;
use clinical_pipeline::telemetry;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "clinical-pipeline",
    version = env!("CARGO_PKG_VERSION"),
    about = "Ingestion, de-identification and indexing of clinical record batches"
)]
struct Cli {
    /// JSON configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured HTTP listen address.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    telemetry::init_tracing(&config.log_filter);
    telemetry::register_metrics();

    // 1. Event log and topics:
    let log = Arc::new(MemoryEventLog::new());
    log.create_topic(&config.topics.ingestion_events, config.topics.partitions)?;
    log.create_topic(&config.topics.deid_jobs, config.topics.partitions)?;
    let shared_log: Arc<dyn EventLog> = log.clone();

    // 2. Ingestion service:
    let ingestion = Arc::new(IngestionPipeline::new(
        Arc::new(SimulatedBatchStore::new(Duration::from_millis(
            config.ingestion.persist_latency_ms,
        ))),
        PipelineResources {
            publisher: Arc::new(StagePublisher::new(
                shared_log.clone(),
                &config.topics.ingestion_events,
            )?),
            cpu_pool: WorkerPool::new("ingestion-cpu", PoolKind::Cpu, config.ingestion.cpu_pool),
            io_pool: WorkerPool::new("ingestion-io", PoolKind::Io, config.ingestion.io_pool),
        },
    ));

    // 3. De-identification service, fed by ingestion events:
    let deid = Arc::new(DeidPipeline::new(
        Arc::new(SimulatedMasker::new(Duration::from_millis(
            config.deid.mask_latency_ms,
        ))),
        LocationTemplates::new(
            &config.deid.raw_location_prefix,
            &config.deid.output_location_prefix,
        ),
        PipelineResources {
            publisher: Arc::new(StagePublisher::new(
                shared_log.clone(),
                &config.topics.deid_jobs,
            )?),
            cpu_pool: WorkerPool::new("deid-cpu", PoolKind::Cpu, config.deid.cpu_pool),
            io_pool: WorkerPool::new("deid-io", PoolKind::Io, config.deid.io_pool),
        },
    ));

    let deid_consumer = StageConsumer::<IngestionStage, _>::new(
        "deid",
        &config.topics.ingestion_events,
        &config.deid.consumer.group_id,
        config.deid.consumer.concurrency,
        config.deid.consumer.backoff(),
        deid,
    );
    deid_consumer.start(shared_log.clone()).await?;

    // 4. Research indexer, fed by deid jobs:
    let repository = Arc::new(InMemoryIndexRepository::new());
    let cache = Arc::new(DocumentCache::new());
    let indexer = Arc::new(ResearchIndexer::new(
        repository.clone(),
        cache.clone(),
        WorkerPool::new("indexer-io", PoolKind::Io, config.indexer.io_pool),
    ));

    let indexer_consumer = StageConsumer::<DeidStage, _>::new(
        "research",
        &config.topics.deid_jobs,
        &config.indexer.consumer.group_id,
        config.indexer.consumer.concurrency,
        config.indexer.consumer.backoff(),
        indexer,
    );
    indexer_consumer.start(shared_log.clone()).await?;

    let index = Arc::new(IndexQueryService::new(repository, cache));

    // 5. HTTP Router:
    let app = Router::new()
        .route("/batches", post(handle_submit_batch))
        .route("/documents", get(handle_list_documents))
        .route("/documents/:document_id", get(handle_get_document))
        .layer(Extension(ingestion))
        .layer(Extension(index));

    // 6. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    log.close();
    Ok(())
}
