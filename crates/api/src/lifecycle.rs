//! Project create / edit / delete orchestration.
//!
//! Every operation runs in one transaction taken from the pool. Stage
//! records and attachment rows are written through `&mut PgConnection`
//! borrowed from that transaction, so an error anywhere rolls back all of
//! it. Blob writes cannot join the transaction: blobs written by a failed
//! create or edit are removed after the rollback, and blobs of a deletion
//! are parked until the commit outcome is known.

use serde::Serialize;
use sqlx::{PgConnection, Postgres, Transaction};
use stagetrack_core::error::CoreError;
use stagetrack_core::fields::FormFields;
use stagetrack_core::stage::StageKind;
use stagetrack_core::types::DbId;
use stagetrack_core::upload::{base_name, blob_key, AllowedExtensions};
use stagetrack_db::models::attachment::{Attachment, CreateAttachment};
use stagetrack_db::models::project::{Project, ProjectInput, NAME_MAX_LEN};
use stagetrack_db::models::stage::StageRecord;
use stagetrack_db::repositories::{AttachmentRepo, ProjectRepo, StageRepo};
use stagetrack_db::DbPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::form::{Submission, UploadedFile};
use crate::storage::BlobStore;

/// A project with everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDetail {
    pub project: Project,
    /// Existing stage records, in pipeline order.
    pub stages: Vec<StageRecord>,
    pub attachments: Vec<Attachment>,
}

impl ProjectDetail {
    pub fn stage(&self, kind: StageKind) -> Option<&StageRecord> {
        self.stages.iter().find(|record| record.kind == kind)
    }
}

/// Result of a create or edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionOutcome {
    #[serde(flatten)]
    pub detail: ProjectDetail,
    /// Uploaded file names rejected by the extension policy.
    pub skipped_files: Vec<String>,
}

/// What a project deletion removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub project_id: DbId,
    pub stage_records: u64,
    pub attachments: usize,
    pub blobs: usize,
}

fn project_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Project",
        id,
    })
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

/// Create or fully overwrite the `kind` record of a project from the form.
pub async fn sync_stage(
    conn: &mut PgConnection,
    project_id: DbId,
    kind: StageKind,
    fields: &FormFields,
) -> AppResult<StageRecord> {
    let values = fields.stage_values(kind)?;
    let record = StageRepo::upsert(conn, kind, project_id, &values).await?;
    Ok(record)
}

/// Store one upload and link it to `record`.
///
/// Returns `None` without error when the extension is not allowed. Keys of
/// written blobs are pushed to `written` so a failed operation can remove
/// them.
pub async fn register_attachment(
    conn: &mut PgConnection,
    blobs: &dyn BlobStore,
    allowed: &AllowedExtensions,
    record: &StageRecord,
    upload: &UploadedFile,
    written: &mut Vec<String>,
) -> AppResult<Option<Attachment>> {
    let Some(file_type) = allowed.accept(&upload.filename) else {
        warn_disallowed(record.project_id, upload);
        return Ok(None);
    };

    let key = blob_key(record.project_id, record.kind, Uuid::new_v4(), &upload.filename);
    blobs.put(&key, &upload.bytes).await?;
    written.push(key.clone());

    let size_bytes = i64::try_from(upload.bytes.len())
        .map_err(|_| AppError::InternalError("Upload size exceeds i64".into()))?;
    let filename: String = base_name(&upload.filename)
        .chars()
        .filter(|c| *c != '\0')
        .take(NAME_MAX_LEN)
        .collect();

    let attachment = AttachmentRepo::create(
        &mut *conn,
        &CreateAttachment {
            project_id: record.project_id,
            stage_kind: record.kind,
            stage_id: record.id,
            filename,
            file_path: key,
            file_type: Some(file_type),
            size_bytes,
        },
    )
    .await?;

    tracing::info!(
        attachment_id = attachment.id,
        project_id = attachment.project_id,
        stage = %attachment.stage_kind,
        size_bytes,
        "Stored attachment"
    );
    Ok(Some(attachment))
}

/// Load a project with its stage records and attachments.
pub async fn load_detail(conn: &mut PgConnection, project_id: DbId) -> AppResult<ProjectDetail> {
    let project = ProjectRepo::find_by_id(&mut *conn, project_id)
        .await?
        .ok_or_else(|| project_not_found(project_id))?;
    let stages = StageRepo::list_for_project(&mut *conn, project_id).await?;
    let attachments = AttachmentRepo::list_by_project(&mut *conn, project_id).await?;
    Ok(ProjectDetail {
        project,
        stages,
        attachments,
    })
}

/// Store every upload of a submission against its stage record, creating a
/// blank record for stages the form did not otherwise touch.
///
/// A disallowed upload is skipped before its stage is looked up, so it never
/// creates a record.
async fn register_uploads(
    conn: &mut PgConnection,
    blobs: &dyn BlobStore,
    allowed: &AllowedExtensions,
    project_id: DbId,
    uploads: &[UploadedFile],
    written: &mut Vec<String>,
) -> AppResult<Vec<String>> {
    let mut skipped = Vec::new();
    for upload in uploads {
        if allowed.accept(&upload.filename).is_none() {
            warn_disallowed(project_id, upload);
            skipped.push(upload.filename.clone());
            continue;
        }
        let record = StageRepo::ensure(&mut *conn, upload.stage, project_id).await?;
        register_attachment(&mut *conn, blobs, allowed, &record, upload, written).await?;
    }
    Ok(skipped)
}

fn warn_disallowed(project_id: DbId, upload: &UploadedFile) {
    tracing::warn!(
        project_id,
        stage = %upload.stage,
        filename = %upload.filename,
        "Skipping upload with disallowed extension"
    );
}

/// Commit on success. On failure, or when the commit itself fails, roll
/// back and remove the blobs written so far.
async fn settle<T>(
    tx: Transaction<'static, Postgres>,
    blobs: &dyn BlobStore,
    written: Vec<String>,
    result: AppResult<T>,
) -> AppResult<T> {
    let error = match result {
        Ok(value) => match tx.commit().await {
            Ok(()) => return Ok(value),
            Err(e) => AppError::from(e),
        },
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "Rollback failed");
            }
            e
        }
    };

    for key in &written {
        if let Err(e) = blobs.remove(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to remove blob of aborted submission");
        }
    }
    Err(error)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Create a project, all thirteen stage records and any uploads.
pub async fn create_project(
    pool: &DbPool,
    blobs: &dyn BlobStore,
    allowed: &AllowedExtensions,
    submission: &Submission,
) -> AppResult<SubmissionOutcome> {
    let input = ProjectInput::from_fields(&submission.fields)?;

    let mut tx = pool.begin().await?;
    let mut written = Vec::new();
    let result = apply_create(&mut tx, blobs, allowed, &input, submission, &mut written).await;
    let outcome = settle(tx, blobs, written, result).await?;

    tracing::info!(
        project_id = outcome.detail.project.id,
        attachments = outcome.detail.attachments.len(),
        skipped = outcome.skipped_files.len(),
        "Project created"
    );
    Ok(outcome)
}

async fn apply_create(
    conn: &mut PgConnection,
    blobs: &dyn BlobStore,
    allowed: &AllowedExtensions,
    input: &ProjectInput,
    submission: &Submission,
    written: &mut Vec<String>,
) -> AppResult<SubmissionOutcome> {
    let project = ProjectRepo::create(&mut *conn, input).await?;
    for kind in StageKind::ALL {
        sync_stage(&mut *conn, project.id, kind, &submission.fields).await?;
    }
    let skipped_files =
        register_uploads(&mut *conn, blobs, allowed, project.id, &submission.uploads, written)
            .await?;
    let detail = load_detail(&mut *conn, project.id).await?;
    Ok(SubmissionOutcome {
        detail,
        skipped_files,
    })
}

/// Overwrite a project's attributes, the stages the form touches, and add
/// any uploads.
pub async fn edit_project(
    pool: &DbPool,
    blobs: &dyn BlobStore,
    allowed: &AllowedExtensions,
    project_id: DbId,
    submission: &Submission,
) -> AppResult<SubmissionOutcome> {
    let mut tx = pool.begin().await?;
    let mut written = Vec::new();
    let result = apply_edit(&mut tx, blobs, allowed, project_id, submission, &mut written).await;
    let outcome = settle(tx, blobs, written, result).await?;

    tracing::info!(
        project_id,
        current_stage = %outcome.detail.project.current_stage,
        skipped = outcome.skipped_files.len(),
        "Project updated"
    );
    Ok(outcome)
}

async fn apply_edit(
    conn: &mut PgConnection,
    blobs: &dyn BlobStore,
    allowed: &AllowedExtensions,
    project_id: DbId,
    submission: &Submission,
    written: &mut Vec<String>,
) -> AppResult<SubmissionOutcome> {
    let stored = ProjectRepo::lock_by_id(&mut *conn, project_id)
        .await?
        .ok_or_else(|| project_not_found(project_id))?;

    let input = ProjectInput::for_edit(&submission.fields, stored.current_stage)?;
    ProjectRepo::update(&mut *conn, project_id, &input)
        .await?
        .ok_or_else(|| project_not_found(project_id))?;

    for kind in StageKind::ALL {
        if submission.fields.touches(kind) {
            sync_stage(&mut *conn, project_id, kind, &submission.fields).await?;
        }
    }
    let skipped_files =
        register_uploads(&mut *conn, blobs, allowed, project_id, &submission.uploads, written)
            .await?;
    let detail = load_detail(&mut *conn, project_id).await?;
    Ok(SubmissionOutcome {
        detail,
        skipped_files,
    })
}

/// Delete a project with its stage records, attachment rows and blobs.
///
/// Blobs are parked before the commit, purged after it, and restored if
/// the commit fails. A failed purge leaves stray bytes behind but does not
/// fail the deletion.
pub async fn delete_project(
    pool: &DbPool,
    blobs: &dyn BlobStore,
    project_id: DbId,
) -> AppResult<DeleteSummary> {
    let mut tx = pool.begin().await?;

    ProjectRepo::lock_by_id(&mut *tx, project_id)
        .await?
        .ok_or_else(|| project_not_found(project_id))?;

    let attachments = AttachmentRepo::delete_by_project(&mut *tx, project_id).await?;
    let stage_records = StageRepo::delete_all_for_project(&mut tx, project_id).await?;
    ProjectRepo::delete(&mut *tx, project_id).await?;

    let keys: Vec<String> = attachments.iter().map(|a| a.file_path.clone()).collect();
    let batch = blobs.park(&keys).await?;

    if let Err(e) = tx.commit().await {
        if let Err(restore_err) = blobs.restore(batch).await {
            tracing::error!(project_id, error = %restore_err, "Failed to restore parked blobs");
        }
        return Err(e.into());
    }

    let summary = DeleteSummary {
        project_id,
        stage_records,
        attachments: attachments.len(),
        blobs: batch.len(),
    };
    if let Err(e) = blobs.purge(batch).await {
        tracing::warn!(project_id, error = %e, "Failed to purge parked blobs");
    }

    tracing::info!(
        project_id,
        stage_records = summary.stage_records,
        attachments = summary.attachments,
        "Project deleted"
    );
    Ok(summary)
}

/// Delete one attachment row together with its blob.
pub async fn delete_attachment(
    pool: &DbPool,
    blobs: &dyn BlobStore,
    attachment_id: DbId,
) -> AppResult<Attachment> {
    let mut tx = pool.begin().await?;

    let attachment = AttachmentRepo::delete(&mut *tx, attachment_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Attachment",
            id: attachment_id,
        }))?;

    let batch = blobs.park(std::slice::from_ref(&attachment.file_path)).await?;
    if let Err(e) = tx.commit().await {
        if let Err(restore_err) = blobs.restore(batch).await {
            tracing::error!(attachment_id, error = %restore_err, "Failed to restore parked blob");
        }
        return Err(e.into());
    }
    if let Err(e) = blobs.purge(batch).await {
        tracing::warn!(attachment_id, error = %e, "Failed to purge parked blob");
    }

    tracing::info!(
        attachment_id,
        project_id = attachment.project_id,
        "Attachment deleted"
    );
    Ok(attachment)
}
