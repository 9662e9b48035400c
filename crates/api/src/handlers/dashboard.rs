//! Handler for the dashboard view: every project plus a count per
//! lifecycle label.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use stagetrack_core::stage::ProjectStage;
use stagetrack_db::models::project::{Project, StageCount};
use stagetrack_db::repositories::ProjectRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_projects: i64,
    /// One entry per lifecycle label in pipeline order, zero-filled.
    pub stage_counts: Vec<StageCount>,
    pub projects: Vec<Project>,
}

/// Expand the grouped counts to cover every label.
fn zero_filled(counts: &[StageCount]) -> Vec<StageCount> {
    ProjectStage::ALL
        .into_iter()
        .map(|stage| StageCount {
            current_stage: stage,
            project_count: counts
                .iter()
                .find(|c| c.current_stage == stage)
                .map_or(0, |c| c.project_count),
        })
        .collect()
}

/// GET /api/v1/dashboard
pub async fn get_dashboard(State(state): State<AppState>) -> AppResult<Json<DataResponse<Dashboard>>> {
    let projects = ProjectRepo::list(&state.pool).await?;
    let counts = ProjectRepo::count_by_stage(&state.pool).await?;
    let stage_counts = zero_filled(&counts);

    Ok(Json(DataResponse {
        data: Dashboard {
            total_projects: stage_counts.iter().map(|c| c.project_count).sum(),
            stage_counts,
            projects,
        },
    }))
}
