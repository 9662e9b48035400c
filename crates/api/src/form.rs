//! Collects a multipart project submission into text fields and uploads.

use axum::body::Bytes;
use axum::extract::Multipart;
use stagetrack_core::error::CoreError;
use stagetrack_core::fields::FormFields;
use stagetrack_core::stage::StageKind;

use crate::error::{AppError, AppResult};

/// One uploaded file part, already routed to its stage.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub stage: StageKind,
    /// Name as sent by the client.
    pub filename: String,
    pub bytes: Bytes,
}

/// A whole new/edit form.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub fields: FormFields,
    pub uploads: Vec<UploadedFile>,
}

impl Submission {
    pub fn new(fields: FormFields) -> Self {
        Self {
            fields,
            uploads: Vec::new(),
        }
    }

    pub fn with_upload(mut self, stage: StageKind, filename: &str, bytes: impl Into<Bytes>) -> Self {
        self.uploads.push(UploadedFile {
            stage,
            filename: filename.to_string(),
            bytes: bytes.into(),
        });
        self
    }
}

/// Drain a multipart body.
///
/// Parts carrying a file name are uploads and must be named
/// `<stage>_files`. File inputs left empty by the browser (no name, no
/// bytes) are ignored. Every other part is a text field. A body with
/// neither is rejected.
pub async fn read_submission(mut multipart: Multipart) -> AppResult<Submission> {
    let mut submission = Submission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        if let Some(filename) = field.file_name().map(str::to_string) {
            let stage = StageKind::from_upload_field(&name).ok_or_else(|| {
                CoreError::invalid_field(name.clone(), "is not a stage upload field")
            })?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            if filename.trim().is_empty() {
                continue;
            }
            submission.uploads.push(UploadedFile {
                stage,
                filename,
                bytes,
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            submission.fields.insert(name, text);
        }
    }

    if submission.fields.is_empty() && submission.uploads.is_empty() {
        return Err(AppError::BadRequest("Form submission is empty".into()));
    }

    tracing::debug!(uploads = submission.uploads.len(), "Read form submission");
    Ok(submission)
}
