//! Repository for the `projects` table.

use sqlx::{PgConnection, PgExecutor};
use stagetrack_core::types::DbId;

use crate::models::project::{Project, ProjectInput, StageCount};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, creator_name, project_name, current_stage, \
    first_contact_date, first_response_date, last_contact_date, last_response_date, \
    primary_communication_method, created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the created row.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &ProjectInput,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (creator_name, project_name, current_stage,
                first_contact_date, first_response_date, last_contact_date, last_response_date,
                primary_communication_method)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.creator_name)
            .bind(&input.project_name)
            .bind(input.current_stage.as_str())
            .bind(input.first_contact_date)
            .bind(input.first_response_date)
            .bind(input.last_contact_date)
            .bind(input.last_response_date)
            .bind(&input.primary_communication_method)
            .fetch_one(executor)
            .await
    }

    /// Find a project by its internal ID.
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a project and take a row lock for the rest of the caller's
    /// transaction, so concurrent edits and deletes of the same project
    /// serialize.
    pub async fn lock_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List all projects ordered by most recently created first.
    pub async fn list<'e>(executor: impl PgExecutor<'e>) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Project>(&query).fetch_all(executor).await
    }

    /// Overwrite every attribute of a project.
    ///
    /// `updated_at` only moves when a value actually changes, so submitting
    /// the same form twice leaves the row untouched. Returns `None` if no
    /// row with the given `id` exists.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        input: &ProjectInput,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                creator_name = $2,
                project_name = $3,
                current_stage = $4,
                first_contact_date = $5,
                first_response_date = $6,
                last_contact_date = $7,
                last_response_date = $8,
                primary_communication_method = $9,
                updated_at = NOW()
             WHERE id = $1
               AND (creator_name, project_name, current_stage,
                    first_contact_date, first_response_date, last_contact_date,
                    last_response_date, primary_communication_method)
                   IS DISTINCT FROM ($2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.creator_name)
            .bind(&input.project_name)
            .bind(input.current_stage.as_str())
            .bind(input.first_contact_date)
            .bind(input.first_response_date)
            .bind(input.last_contact_date)
            .bind(input.last_response_date)
            .bind(&input.primary_communication_method)
            .fetch_optional(&mut *conn)
            .await?;

        match updated {
            Some(project) => Ok(Some(project)),
            // Either unchanged or missing.
            None => Self::find_by_id(&mut *conn, id).await,
        }
    }

    /// Permanently delete a project by ID. Returns `true` if a row was removed.
    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count projects per lifecycle label. Labels with no projects are omitted.
    pub async fn count_by_stage<'e>(
        executor: impl PgExecutor<'e>,
    ) -> Result<Vec<StageCount>, sqlx::Error> {
        sqlx::query_as::<_, StageCount>(
            "SELECT current_stage, COUNT(*) AS project_count
             FROM projects
             GROUP BY current_stage
             ORDER BY current_stage",
        )
        .fetch_all(executor)
        .await
    }
}
