use super::cache::{cache_key, CacheInvalidator, DocumentCache};
use super::repository::IndexRepository;
use super::types::IndexDocument;
use crate::error::{HandlerError, IndexError};
use crate::events::{DeidEvent, DeidStage};
use crate::executor::pool::WorkerPool;
use crate::messaging::StageHandler;
use crate::telemetry;

use async_trait::async_trait;
use std::sync::Arc;

/// Turns completed de-identification jobs into index documents.
pub struct ResearchIndexer {
    repository: Arc<dyn IndexRepository>,
    invalidator: Arc<dyn CacheInvalidator>,
    io_pool: Arc<WorkerPool>,
}

impl ResearchIndexer {
    pub fn new(
        repository: Arc<dyn IndexRepository>,
        invalidator: Arc<dyn CacheInvalidator>,
        io_pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            repository,
            invalidator,
            io_pool,
        }
    }

    /// Indexes a `COMPLETED` event. Other stages are ignored with `Ok(None)`.
    pub async fn handle_deid_event(
        &self,
        event: DeidEvent,
    ) -> Result<Option<IndexDocument>, IndexError> {
        if event.stage() != DeidStage::Completed {
            tracing::debug!(job = %event.run_id(), stage = %event.stage(), "ignoring deid event");
            return Ok(None);
        }

        let payload_location = event
            .quantity()
            .location()
            .ok_or_else(|| IndexError::MissingLocation {
                run_id: event.run_id().to_string(),
            })?
            .to_string();

        let document = IndexDocument {
            document_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: event.tenant_id().to_string(),
            job_id: event.run_id().to_string(),
            payload_location,
            indexed_at: chrono::Utc::now(),
        };

        let repository = self.repository.clone();
        let saved = self
            .io_pool
            .run(async move { repository.save(document).await })
            .await??;

        self.invalidator.evict(&cache_key(&saved.document_id));
        telemetry::record_document_indexed();
        tracing::info!(
            document = %saved.document_id,
            tenant = %saved.tenant_id,
            job = %saved.job_id,
            "document indexed"
        );

        Ok(Some(saved))
    }
}

#[async_trait]
impl StageHandler<DeidStage> for ResearchIndexer {
    async fn handle(&self, event: DeidEvent) -> Result<(), HandlerError> {
        self.handle_deid_event(event).await?;
        Ok(())
    }
}

/// Read side of the index. Lookups by id go through the document cache.
pub struct IndexQueryService {
    repository: Arc<dyn IndexRepository>,
    cache: Arc<DocumentCache>,
}

impl IndexQueryService {
    pub fn new(repository: Arc<dyn IndexRepository>, cache: Arc<DocumentCache>) -> Self {
        Self { repository, cache }
    }

    pub async fn find_all(&self) -> Result<Vec<IndexDocument>, IndexError> {
        self.repository.find_all().await
    }

    pub async fn find_by_document_id(
        &self,
        document_id: &str,
    ) -> Result<Option<IndexDocument>, IndexError> {
        let key = cache_key(document_id);
        if let Some(document) = self.cache.get(&key) {
            return Ok(Some(document));
        }

        let found = self.repository.find_by_document_id(document_id).await?;
        if let Some(document) = &found {
            self.cache.put(key, document.clone());
        }
        Ok(found)
    }
}
