use super::types::IndexDocument;
use crate::error::IndexError;

use async_trait::async_trait;
use dashmap::DashMap;

/// Where index documents are kept.
#[async_trait]
pub trait IndexRepository: Send + Sync + 'static {
    async fn save(&self, document: IndexDocument) -> Result<IndexDocument, IndexError>;

    async fn find_by_document_id(
        &self,
        document_id: &str,
    ) -> Result<Option<IndexDocument>, IndexError>;

    async fn find_all(&self) -> Result<Vec<IndexDocument>, IndexError>;
}

#[derive(Default)]
pub struct InMemoryIndexRepository {
    documents: DashMap<String, IndexDocument>,
}

impl InMemoryIndexRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl IndexRepository for InMemoryIndexRepository {
    async fn save(&self, document: IndexDocument) -> Result<IndexDocument, IndexError> {
        self.documents
            .insert(document.document_id.clone(), document.clone());
        Ok(document)
    }

    async fn find_by_document_id(
        &self,
        document_id: &str,
    ) -> Result<Option<IndexDocument>, IndexError> {
        Ok(self
            .documents
            .get(document_id)
            .map(|entry| entry.value().clone()))
    }

    /// Oldest first.
    async fn find_all(&self) -> Result<Vec<IndexDocument>, IndexError> {
        let mut documents: Vec<IndexDocument> = self
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        documents.sort_by(|a, b| {
            a.indexed_at
                .cmp(&b.indexed_at)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        Ok(documents)
    }
}
