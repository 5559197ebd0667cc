use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use common::storage::StorageError;
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Serve a stored blob (project images and other uploaded assets).
#[instrument(skip(state))]
pub async fn serve_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state.blobs.get(&path).await.map_err(|e| match e {
        StorageError::NotFound(_) | StorageError::InvalidKey(_) => {
            AppError::NotFound("Asset not found".to_string())
        }
        other => AppError::Internal(other.to_string()),
    })?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}
