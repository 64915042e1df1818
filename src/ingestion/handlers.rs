use super::orchestrator::IngestionPipeline;
use super::types::{BatchAccepted, BatchRejected, BatchRequest};
use crate::pipeline::RunOutcome;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::Arc;

/// `POST /batches`: starts the run in the background and answers before it finishes.
pub async fn handle_submit_batch(
    Extension(pipeline): Extension<Arc<IngestionPipeline>>,
    Json(request): Json<BatchRequest>,
) -> Response {
    let errors = request.validate();
    if !errors.is_empty() {
        tracing::info!(batch = %request.batch_id, ?errors, "batch request rejected");
        return (StatusCode::BAD_REQUEST, Json(BatchRejected { errors })).into_response();
    }

    let accepted = BatchAccepted {
        batch_id: request.batch_id.clone(),
        tenant_id: request.tenant_id.clone(),
        accepted_at: chrono::Utc::now(),
    };

    tokio::spawn(async move {
        let batch_id = request.batch_id.clone();
        match pipeline.start_run(request).await {
            Ok(RunOutcome::Succeeded(_)) => {
                tracing::info!(batch = %batch_id, "ingestion run persisted");
            }
            Ok(RunOutcome::Failed { reason, .. }) => {
                tracing::warn!(batch = %batch_id, reason = %reason, "ingestion run failed");
            }
            Err(err) => {
                tracing::error!(batch = %batch_id, error = %err, "ingestion run lost its terminal event");
            }
        }
    });

    (StatusCode::ACCEPTED, Json(accepted)).into_response()
}
