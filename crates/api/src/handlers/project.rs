//! Handlers for the `/projects` resource.
//!
//! Projects are the budget container for milestones. Only `project_value`
//! and `end_date` feed milestone rules.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use crm_core::error::CoreError;
use crm_core::milestone::allocation::{calculate_remaining, AllocationSummary};
use crm_core::types::DbId;
use crm_db::models::milestone::Milestone;
use crm_db::models::project::{CreateProject, Project};
use crm_db::repositories::{MilestoneRepo, ProjectRepo};
use sqlx::PgPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::query::AllocationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Verify that a project exists, returning the full row.
pub(crate) async fn ensure_project_exists(pool: &PgPool, id: DbId) -> AppResult<Project> {
    ProjectRepo::find_by_id(pool, id).await?.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        })
    })
}

/// Allocation of `milestones` against `project`, leaving out `exclude_id`.
pub(crate) fn summarize(
    project: &Project,
    milestones: &[Milestone],
    exclude_id: Option<DbId>,
) -> AllocationSummary {
    let entries: Vec<_> = milestones.iter().map(Milestone::allocation_entry).collect();
    calculate_remaining(&entries, project.project_value, exclude_id)
}

/// POST /api/v1/projects
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let project = ProjectRepo::create(&state.pool, &input).await?;
    tracing::info!(
        id = project.id,
        name = %project.name,
        project_value = project.project_value,
        "Project created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects
pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let projects = ProjectRepo::list(&state.pool).await?;
    tracing::debug!(count = projects.len(), "Listed projects");
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let project = ensure_project_exists(&state.pool, id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// GET /api/v1/projects/{id}/allocation?exclude_id=
///
/// Total allocated and remaining budget across the project's milestones.
/// The edit form passes the milestone being edited as `exclude_id`.
pub async fn allocation(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<AllocationParams>,
) -> AppResult<impl IntoResponse> {
    let project = ensure_project_exists(&state.pool, id).await?;
    let milestones = MilestoneRepo::list_by_project(&state.pool, id).await?;
    let summary = summarize(&project, &milestones, params.exclude_id);

    tracing::debug!(
        project_id = id,
        exclude_id = ?params.exclude_id,
        total_allocated = summary.total_allocated,
        remaining_amount = summary.remaining_amount,
        "Computed allocation"
    );
    Ok(Json(DataResponse { data: summary }))
}
