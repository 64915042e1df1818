use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A searchable record of one completed de-identification job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    pub document_id: String,
    pub tenant_id: String,
    pub job_id: String,
    pub payload_location: String,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub total_count: usize,
    pub documents: Vec<IndexDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
