//! Ingestion Data Types
//!
//! Request and response bodies of the batch intake endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_TENANT_ID_LEN: usize = 64;
pub const MAX_BATCH_ID_LEN: usize = 128;
pub const MAX_SOURCE_SYSTEM_LEN: usize = 128;

/// A batch of clinical records announced by an upstream warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub tenant_id: String,
    pub batch_id: String,
    pub source_system: String,
    pub record_count: i64,
}

impl BatchRequest {
    /// Request-shape violations. Empty when the request may start a run.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        check_text(&mut errors, "tenantId", &self.tenant_id, MAX_TENANT_ID_LEN);
        check_text(&mut errors, "batchId", &self.batch_id, MAX_BATCH_ID_LEN);
        check_text(
            &mut errors,
            "sourceSystem",
            &self.source_system,
            MAX_SOURCE_SYSTEM_LEN,
        );
        if self.record_count < 1 {
            errors.push(format!(
                "recordCount must be at least 1 (was {})",
                self.record_count
            ));
        }

        errors
    }
}

fn check_text(errors: &mut Vec<String>, field: &str, value: &str, max: usize) {
    if value.trim().is_empty() {
        errors.push(format!("{} must not be blank", field));
    } else if value.chars().count() > max {
        errors.push(format!("{} must be at most {} characters", field, max));
    }
}

/// Returned with `202 Accepted` once the run has been started in the background.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAccepted {
    pub batch_id: String,
    pub tenant_id: String,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRejected {
    pub errors: Vec<String>,
}
