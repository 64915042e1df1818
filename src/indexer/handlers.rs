use super::service::IndexQueryService;
use super::types::{DocumentListResponse, ErrorResponse};

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::Arc;

pub async fn handle_list_documents(
    Extension(index): Extension<Arc<IndexQueryService>>,
) -> Response {
    match index.find_all().await {
        Ok(documents) => Json(DocumentListResponse {
            total_count: documents.len(),
            documents,
        })
        .into_response(),
        Err(err) => {
            tracing::error!("Failed to list documents: {}", err);
            internal_error(err.to_string())
        }
    }
}

pub async fn handle_get_document(
    Path(document_id): Path<String>,
    Extension(index): Extension<Arc<IndexQueryService>>,
) -> Response {
    match index.find_by_document_id(&document_id).await {
        Ok(Some(document)) => Json(document).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("document {} not found", document_id),
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to load document {}: {}", document_id, err);
            internal_error(err.to_string())
        }
    }
}

fn internal_error(error: String) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error })).into_response()
}
