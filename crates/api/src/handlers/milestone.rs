//! Handlers for the `/milestones` resource.
//!
//! Every write runs the same pipeline: load the project and its milestones,
//! compute the remaining budget (excluding the milestone being edited),
//! validate the form, map it to a record, then persist. A rejected
//! submission writes nothing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use crm_core::error::CoreError;
use crm_core::milestone::mapping::{
    map_reschedule, map_to_storage, MappingContext, MilestoneRecord, RescheduleOutcome,
};
use crm_core::milestone::validation::{validate_milestone, validate_reschedule, ValidationContext};
use crm_core::milestone::{MilestoneForm, MilestoneState, MilestoneStatus, RescheduleRequest};
use crm_core::types::DbId;
use crm_db::models::milestone::Milestone;
use crm_db::models::project::Project;
use crm_db::repositories::MilestoneRepo;
use serde::Deserialize;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::handlers::project::{ensure_project_exists, summarize};
use crate::query::MilestoneListParams;
use crate::response::{DataResponse, ListResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /milestones`: the owning project plus the form values.
#[derive(Debug, Deserialize)]
pub struct CreateMilestone {
    pub project_id: DbId,
    #[serde(flatten)]
    pub form: MilestoneForm,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Verify that a milestone exists, returning the full row.
async fn ensure_milestone_exists(pool: &PgPool, id: DbId) -> AppResult<Milestone> {
    MilestoneRepo::find_by_id(pool, id).await?.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Milestone",
            id,
        })
    })
}

/// Validate `form` against the project's budget and map it to a record.
///
/// `initial` is the stored state when editing; the remaining budget then
/// excludes that milestone's own allocation.
async fn prepare_record(
    pool: &PgPool,
    project: &Project,
    form: &MilestoneForm,
    initial: Option<&MilestoneState>,
) -> AppResult<MilestoneRecord> {
    let siblings = MilestoneRepo::list_by_project(pool, project.id).await?;
    let summary = summarize(project, &siblings, initial.map(|i| i.id));

    validate_milestone(
        form,
        &ValidationContext {
            project_value: project.project_value,
            project_end_date: project.end_date,
            remaining_amount: summary.remaining_amount,
            initial,
        },
    )
    .into_result()?;

    let record = map_to_storage(
        form,
        &MappingContext {
            initial,
            remaining_amount: summary.remaining_amount,
            project_value: project.project_value,
        },
    )?;
    Ok(record)
}

// ---------------------------------------------------------------------------
// GET /milestones?project_id=
// ---------------------------------------------------------------------------

/// List a project's milestones in due-date order.
pub async fn list_by_project(
    State(state): State<AppState>,
    Query(params): Query<MilestoneListParams>,
) -> AppResult<impl IntoResponse> {
    ensure_project_exists(&state.pool, params.project_id).await?;
    let items = MilestoneRepo::list_by_project(&state.pool, params.project_id).await?;
    tracing::debug!(project_id = params.project_id, count = items.len(), "Listed milestones");
    Ok(Json(DataResponse {
        data: ListResponse { items },
    }))
}

// ---------------------------------------------------------------------------
// GET /milestones/{id}
// ---------------------------------------------------------------------------

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let milestone = ensure_milestone_exists(&state.pool, id).await?;
    Ok(Json(DataResponse { data: milestone }))
}

// ---------------------------------------------------------------------------
// POST /milestones
// ---------------------------------------------------------------------------

/// Create a milestone.
///
/// Rejected with 400 `VALIDATION_ERROR` for field problems and 400
/// `BUDGET_EXCEEDED` when the allocation does not fit.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateMilestone>,
) -> AppResult<impl IntoResponse> {
    let project = ensure_project_exists(&state.pool, input.project_id).await?;
    let record = prepare_record(&state.pool, &project, &input.form, None).await?;

    let created = MilestoneRepo::create(&state.pool, project.id, &record).await?;
    tracing::info!(
        id = created.id,
        project_id = project.id,
        payment_type = %created.payment_type,
        calculated_amount = created.calculated_amount,
        "Milestone created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

// ---------------------------------------------------------------------------
// PATCH /milestones/{id}
// ---------------------------------------------------------------------------

/// Update a milestone from the full set of form values.
///
/// The budget is not re-checked when the trigger type and value are
/// unchanged. Completing a milestone remembers its progress; reopening it
/// restores that progress.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(form): Json<MilestoneForm>,
) -> AppResult<impl IntoResponse> {
    let existing = ensure_milestone_exists(&state.pool, id).await?;
    let project = ensure_project_exists(&state.pool, existing.project_id).await?;
    let initial = existing.state();

    let mut record = prepare_record(&state.pool, &project, &form, Some(&initial)).await?;

    let transition = state.progress_cache.read().await.peek_status_change(
        id,
        existing.status,
        record.status,
        existing.progress,
        record.progress,
    );
    record.progress = transition.progress;

    let updated = MilestoneRepo::update(&state.pool, id, &record)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Milestone",
            id,
        }))?;
    state.progress_cache.write().await.commit(id, transition.update);
    tracing::info!(
        id,
        status = %updated.status,
        payment_status = %updated.payment_status,
        calculated_amount = updated.calculated_amount,
        "Milestone updated"
    );
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// POST /milestones/{id}/reschedule
// ---------------------------------------------------------------------------

/// Move a milestone's due date, reopening it and bumping its reschedule count.
///
/// Milestones that have not opted in with `reset_due_on_fail` are left
/// untouched and returned as they are.
pub async fn reschedule(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<RescheduleRequest>,
) -> AppResult<impl IntoResponse> {
    let existing = ensure_milestone_exists(&state.pool, id).await?;
    let current = existing.state();

    let mut patch = match map_reschedule(&current, &request)? {
        RescheduleOutcome::Rescheduled(patch) => patch,
        RescheduleOutcome::Disabled => {
            tracing::info!(id, "Reschedule skipped: milestone has not opted in");
            return Ok(Json(DataResponse { data: existing }));
        }
    };

    let today = Utc::now().date_naive();
    validate_reschedule(&request, today).into_result()?;

    let transition = state.progress_cache.read().await.peek_status_change(
        id,
        existing.status,
        MilestoneStatus::Pending,
        existing.progress,
        patch.progress,
    );
    patch.progress = transition.progress;

    let rescheduled = MilestoneRepo::reschedule(&state.pool, id, &patch)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Milestone",
            id,
        }))?;
    state.progress_cache.write().await.commit(id, transition.update);
    tracing::info!(
        id,
        due_date = %rescheduled.due_date,
        reschedule_count = rescheduled.reschedule_count,
        "Milestone rescheduled"
    );
    Ok(Json(DataResponse { data: rescheduled }))
}

// ---------------------------------------------------------------------------
// DELETE /milestones/{id}
// ---------------------------------------------------------------------------

/// Delete a milestone. Its allocation is released immediately.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    let deleted = MilestoneRepo::delete(&state.pool, id).await?;
    if deleted {
        state.progress_cache.write().await.forget(id);
        tracing::info!(id, "Milestone deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Milestone",
            id,
        }))
    }
}
