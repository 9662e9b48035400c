//! Repository for the `attachments` table.

use sqlx::PgExecutor;
use stagetrack_core::stage::StageKind;
use stagetrack_core::types::DbId;

use crate::models::attachment::{Attachment, CreateAttachment};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, project_id, stage_kind, stage_id, filename, file_path, file_type, size_bytes, uploaded_at";

/// Provides CRUD operations for attachment metadata.
pub struct AttachmentRepo;

impl AttachmentRepo {
    /// Insert a new attachment row, returning it.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &CreateAttachment,
    ) -> Result<Attachment, sqlx::Error> {
        let query = format!(
            "INSERT INTO attachments
                (project_id, stage_kind, stage_id, filename, file_path, file_type, size_bytes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attachment>(&query)
            .bind(input.project_id)
            .bind(input.stage_kind.slug())
            .bind(input.stage_id)
            .bind(&input.filename)
            .bind(&input.file_path)
            .bind(&input.file_type)
            .bind(input.size_bytes)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Attachment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM attachments WHERE id = $1");
        sqlx::query_as::<_, Attachment>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// All attachments of a project, oldest first.
    pub async fn list_by_project<'e>(
        executor: impl PgExecutor<'e>,
        project_id: DbId,
    ) -> Result<Vec<Attachment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attachments WHERE project_id = $1 ORDER BY uploaded_at, id"
        );
        sqlx::query_as::<_, Attachment>(&query)
            .bind(project_id)
            .fetch_all(executor)
            .await
    }

    /// All attachments linked to one stage record, oldest first.
    pub async fn list_by_stage<'e>(
        executor: impl PgExecutor<'e>,
        kind: StageKind,
        stage_id: DbId,
    ) -> Result<Vec<Attachment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attachments
             WHERE stage_kind = $1 AND stage_id = $2
             ORDER BY uploaded_at, id"
        );
        sqlx::query_as::<_, Attachment>(&query)
            .bind(kind.slug())
            .bind(stage_id)
            .fetch_all(executor)
            .await
    }

    /// Delete one attachment row, returning it if it existed.
    pub async fn delete<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Attachment>, sqlx::Error> {
        let query = format!("DELETE FROM attachments WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Attachment>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Delete every attachment row of a project, returning the removed rows
    /// so their blobs can be cleaned up.
    pub async fn delete_by_project<'e>(
        executor: impl PgExecutor<'e>,
        project_id: DbId,
    ) -> Result<Vec<Attachment>, sqlx::Error> {
        let query = format!("DELETE FROM attachments WHERE project_id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Attachment>(&query)
            .bind(project_id)
            .fetch_all(executor)
            .await
    }
}
