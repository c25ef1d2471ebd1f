//! Image upload proxy.

use axum::{extract::{Multipart, State, multipart::MultipartRejection}, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::middleware::RequireWriter;
use crate::services::media::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Request body limit for the upload route: the file plus multipart framing.
pub const BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Upload an image from the multipart `file` field. Responds `201` with
/// `{ url, public_id, width, height }`.
#[instrument(skip_all)]
pub async fn upload(
    RequireWriter(admin): RequireWriter,
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let media = state
        .media()
        .ok_or_else(|| AppError::Unavailable("media uploads are not configured".to_string()))?;
    let mut multipart = multipart?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let uploaded = media.upload(&file_name, &content_type, bytes.to_vec()).await?;
        state.audit().record(
            &admin,
            "media.upload",
            "media",
            Some(uploaded.public_id.clone()),
            json!({ "file_name": file_name, "url": uploaded.url }),
        );
        return Ok((StatusCode::CREATED, Json(uploaded)));
    }

    Err(AppError::BadRequest("missing multipart field 'file'".to_string()))
}
