//! Handlers for the `/attachments` resource.

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use stagetrack_core::error::CoreError;
use stagetrack_core::types::DbId;
use stagetrack_core::upload::sanitize_filename;
use stagetrack_db::repositories::AttachmentRepo;

use crate::error::{AppError, AppResult};
use crate::lifecycle;
use crate::state::AppState;

/// Content type served for a stored extension.
fn content_type_for(file_type: Option<&str>) -> &'static str {
    match file_type {
        Some("txt") => "text/plain; charset=utf-8",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// GET /api/v1/attachments/{id}
///
/// Download the stored bytes under the original file name.
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let attachment = AttachmentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Attachment",
            id,
        }))?;

    let bytes = state.blobs.get(&attachment.file_path).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(&attachment.filename)
    );

    Ok((
        StatusCode::OK,
        [
            (
                CONTENT_TYPE,
                content_type_for(attachment.file_type.as_deref()).to_string(),
            ),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// DELETE /api/v1/attachments/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    lifecycle::delete_attachment(&state.pool, state.blobs.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
