//! Attachment metadata model and DTO.

use serde::Serialize;
use sqlx::FromRow;
use stagetrack_core::stage::StageKind;
use stagetrack_core::types::{DbId, Timestamp};

/// A row from the `attachments` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Attachment {
    pub id: DbId,
    pub project_id: DbId,
    #[sqlx(try_from = "String")]
    pub stage_kind: StageKind,
    pub stage_id: DbId,
    /// Name as uploaded by the client.
    pub filename: String,
    /// Key of the blob in the storage area.
    pub file_path: String,
    /// Lower-cased extension.
    pub file_type: Option<String>,
    pub size_bytes: i64,
    pub uploaded_at: Timestamp,
}

/// DTO for recording a stored upload.
#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub project_id: DbId,
    pub stage_kind: StageKind,
    pub stage_id: DbId,
    pub filename: String,
    pub file_path: String,
    pub file_type: Option<String>,
    pub size_bytes: i64,
}
