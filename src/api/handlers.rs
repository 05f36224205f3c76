use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::results::{ConnectionReport, ImportResult, MethodPreference, UploadResult};
use crate::petfinder::SearchCriteria;
use crate::sync::upload::NO_DOGS;
use crate::sync::SyncSummary;
use crate::AppState;

// ── Request DTOs ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub method: MethodPreference,
}

fn import_response(result: ImportResult) -> (StatusCode, Json<ImportResult>) {
    let status = if result.imported > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(result))
}

fn upload_response(result: UploadResult) -> (StatusCode, Json<UploadResult>) {
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(result))
}

// ── Handlers ─────────────────────────────────────────────────

/// POST /api/v1/sync/import/organization/:org_id
pub async fn import_organization(
    State(state): State<Arc<AppState>>,
    Path(org_id): Path<String>,
) -> Result<(StatusCode, Json<ImportResult>), AppError> {
    let result = state.sync.import_from_organization(Some(&org_id)).await?;
    Ok(import_response(result))
}

/// POST /api/v1/sync/import/search
pub async fn import_search(
    State(state): State<Arc<AppState>>,
    Json(criteria): Json<SearchCriteria>,
) -> Result<(StatusCode, Json<ImportResult>), AppError> {
    let result = state.sync.import_from_search(&criteria).await?;
    Ok(import_response(result))
}

/// POST /api/v1/sync/import/animal/:petfinder_id
pub async fn import_animal(
    State(state): State<Arc<AppState>>,
    Path(petfinder_id): Path<u64>,
) -> Result<(StatusCode, Json<ImportResult>), AppError> {
    let result = state.sync.import_animal(petfinder_id).await?;
    Ok(import_response(result))
}

/// POST /api/v1/sync/dogs/:id/upload with optional body `{"method": "auto" | "ftp" | ...}`.
pub async fn upload_dog(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResult>), AppError> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        UploadRequest::default()
    } else {
        serde_json::from_slice::<UploadRequest>(&body).map_err(|e| {
            tracing::warn!("upload_dog: invalid body: {}", e);
            AppError::BadRequest(format!("invalid upload request: {}", e))
        })?
    };

    let result = state.sync.upload_dog(id, req.method).await?;
    Ok(upload_response(result))
}

/// POST /api/v1/sync/dogs/upload-pending
///
/// An empty queue is 200; nothing was sent upstream.
pub async fn upload_pending(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<UploadResult>), AppError> {
    let result = state.sync.upload_pending().await?;
    if result.error.as_deref() == Some(NO_DOGS) {
        return Ok((StatusCode::OK, Json(result)));
    }
    Ok(upload_response(result))
}

/// GET /api/v1/sync/connection
pub async fn test_connection(State(state): State<Arc<AppState>>) -> Json<ConnectionReport> {
    Json(state.sync.test_connection().await)
}

/// GET /api/v1/sync/status
pub async fn sync_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncSummary>, AppError> {
    Ok(Json(state.sync.summary().await?))
}
