//! Product image upload URLs.
//!
//! The browser sends file names and types, receives presigned S3 `PUT`
//! URLs, and uploads directly to the bucket. Nothing passes through here.

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::PresignedUpload;
use crate::state::AppState;
use crate::validation::{UploadForm, validate_upload};

/// Build the upload router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/upload", post(presign))
}

#[derive(Debug, Serialize)]
pub struct UploadList {
    pub uploads: Vec<PresignedUpload>,
}

/// Presign one upload per requested image.
///
/// A `fileName`/`fileType` body gets a single upload object back; a `files`
/// body gets `{"uploads": [...]}` in request order.
///
/// # Errors
///
/// Returns 400 for missing names or non-image types, 503 when no bucket is
/// configured and 502 if signing fails.
#[instrument(skip(admin, state, form), fields(admin_id = %admin.id))]
pub async fn presign(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(form): Json<UploadForm>,
) -> Result<Response> {
    let storage = state.storage().ok_or_else(|| {
        AppError::Unavailable("画像アップロードは設定されていません".to_string())
    })?;

    let batch = form.files.is_some();
    let files = validate_upload(form)?;

    let mut uploads = Vec::with_capacity(files.len());
    for file in &files {
        uploads.push(storage.presign_upload(&file.name, &file.content_type).await?);
    }
    tracing::info!(count = uploads.len(), "Presigned image uploads");

    if batch {
        return Ok(Json(UploadList { uploads }).into_response());
    }
    let upload = uploads
        .pop()
        .ok_or_else(|| AppError::Internal("no upload presigned".to_string()))?;
    Ok(Json(upload).into_response())
}
