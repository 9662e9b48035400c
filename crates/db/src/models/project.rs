//! Project entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use stagetrack_core::error::CoreError;
use stagetrack_core::fields::FormFields;
use stagetrack_core::stage::ProjectStage;
use stagetrack_core::types::{Date, DbId, Timestamp};

/// Width of the `creator_name` and `project_name` columns.
pub const NAME_MAX_LEN: usize = 255;

/// Width of the `primary_communication_method` column.
pub const COMMUNICATION_METHOD_MAX_LEN: usize = 50;

/// A project row from the `projects` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub creator_name: String,
    pub project_name: String,
    #[sqlx(try_from = "String")]
    pub current_stage: ProjectStage,
    pub first_contact_date: Option<Date>,
    pub first_response_date: Option<Date>,
    pub last_contact_date: Option<Date>,
    pub last_response_date: Option<Date>,
    pub primary_communication_method: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Project attributes from the new/edit form.
///
/// Used for both inserts and edits; an edit overwrites every attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInput {
    pub creator_name: String,
    pub project_name: String,
    pub current_stage: ProjectStage,
    pub first_contact_date: Option<Date>,
    pub first_response_date: Option<Date>,
    pub last_contact_date: Option<Date>,
    pub last_response_date: Option<Date>,
    pub primary_communication_method: Option<String>,
}

impl ProjectInput {
    /// Build the attributes of a new project from submitted form fields.
    ///
    /// `creator_name` and `project_name` are required. A blank or missing
    /// `current_stage` means `CONCEPT`.
    pub fn from_fields(fields: &FormFields) -> Result<Self, CoreError> {
        Self::with_stage_fallback(fields, ProjectStage::Concept)
    }

    /// Like [`ProjectInput::from_fields`], but a blank or missing
    /// `current_stage` keeps `current` instead of resetting to `CONCEPT`.
    pub fn for_edit(fields: &FormFields, current: ProjectStage) -> Result<Self, CoreError> {
        Self::with_stage_fallback(fields, current)
    }

    fn with_stage_fallback(fields: &FormFields, fallback: ProjectStage) -> Result<Self, CoreError> {
        let current_stage = match fields.get("current_stage").map(str::trim) {
            None | Some("") => fallback,
            Some(label) => label.parse()?,
        };

        Ok(Self {
            creator_name: fields.required_text("creator_name", NAME_MAX_LEN)?,
            project_name: fields.required_text("project_name", NAME_MAX_LEN)?,
            current_stage,
            first_contact_date: fields.optional_date("first_contact_date")?,
            first_response_date: fields.optional_date("first_response_date")?,
            last_contact_date: fields.optional_date("last_contact_date")?,
            last_response_date: fields.optional_date("last_response_date")?,
            primary_communication_method: fields
                .optional_text("primary_communication_method", COMMUNICATION_METHOD_MAX_LEN)?,
        })
    }
}

/// Number of projects currently at one lifecycle label.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct StageCount {
    #[sqlx(try_from = "String")]
    pub current_stage: ProjectStage,
    pub project_count: i64,
}
