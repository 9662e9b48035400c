//! Handlers for the `/projects` resource.
//!
//! Create and edit take the multipart project form: text fields for the
//! project and its stages plus `<stage>_files` upload parts.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use stagetrack_core::error::CoreError;
use stagetrack_core::types::DbId;
use stagetrack_db::models::attachment::Attachment;
use stagetrack_db::models::project::Project;
use stagetrack_db::repositories::{AttachmentRepo, ProjectRepo};

use crate::error::{AppError, AppResult};
use crate::form::read_submission;
use crate::lifecycle::{self, ProjectDetail, SubmissionOutcome};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/projects
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let projects = ProjectRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/{id}
///
/// The project with its stage records and attachments.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    let mut conn = state.pool.acquire().await?;
    let detail = lifecycle::load_detail(&mut conn, id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/projects
pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<SubmissionOutcome>>)> {
    let submission = read_submission(multipart).await?;
    let outcome = lifecycle::create_project(
        &state.pool,
        state.blobs.as_ref(),
        &state.config.allowed_extensions,
        &submission,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// PUT /api/v1/projects/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<SubmissionOutcome>>> {
    let submission = read_submission(multipart).await?;
    let outcome = lifecycle::edit_project(
        &state.pool,
        state.blobs.as_ref(),
        &state.config.allowed_extensions,
        id,
        &submission,
    )
    .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// DELETE /api/v1/projects/{id}
///
/// Removes the project, its stage records, attachment rows and blobs.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    lifecycle::delete_project(&state.pool, state.blobs.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/projects/{id}/attachments
pub async fn list_attachments(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Attachment>>>> {
    ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;
    let attachments = AttachmentRepo::list_by_project(&state.pool, id).await?;
    Ok(Json(DataResponse { data: attachments }))
}
