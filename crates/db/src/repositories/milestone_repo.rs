//! Repository for the `milestones` table.
//!
//! Writes take the already-mapped [`MilestoneRecord`] / [`ReschedulePatch`]
//! from `crm_core`; this layer never derives status or amounts itself.

use crm_core::milestone::mapping::{MilestoneRecord, ReschedulePatch};
use crm_core::types::DbId;
use sqlx::PgPool;

use crate::models::milestone::{Milestone, MilestoneRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, title, description, due_date, assigned_to, \
    payment_type, payment_request_stage, payment_trigger_type, payment_trigger_value, \
    payment_percentage, calculated_amount, status, payment_status, progress, \
    reschedule_count, reschedule_reason, reset_due_on_fail, created_at, updated_at";

/// Provides CRUD operations for milestones.
pub struct MilestoneRepo;

fn decode(row: MilestoneRow) -> Result<Milestone, sqlx::Error> {
    Milestone::try_from(row).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

impl MilestoneRepo {
    /// Insert a milestone under `project_id`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        record: &MilestoneRecord,
    ) -> Result<Milestone, sqlx::Error> {
        let query = format!(
            "INSERT INTO milestones
                (project_id, title, description, due_date, assigned_to,
                 payment_type, payment_request_stage, payment_trigger_type,
                 payment_trigger_value, payment_percentage, calculated_amount,
                 status, payment_status, progress, reset_due_on_fail)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, MilestoneRow>(&query)
            .bind(project_id)
            .bind(&record.title)
            .bind(&record.description)
            .bind(record.due_date)
            .bind(&record.assigned_to)
            .bind(record.payment_type.as_str())
            .bind(record.payment_request_stage.map(|s| s.as_str()))
            .bind(record.payment_trigger_type.map(|t| t.as_str()))
            .bind(record.payment_trigger_value)
            .bind(&record.payment_percentage)
            .bind(record.calculated_amount)
            .bind(record.status.as_str())
            .bind(record.payment_status.as_str())
            .bind(record.progress)
            .bind(record.reset_due_on_fail)
            .fetch_one(pool)
            .await?;
        decode(row)
    }

    /// Find a milestone by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Milestone>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM milestones WHERE id = $1");
        sqlx::query_as::<_, MilestoneRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(decode)
            .transpose()
    }

    /// List a project's milestones in due-date order.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Milestone>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM milestones
             WHERE project_id = $1
             ORDER BY due_date ASC, id ASC"
        );
        sqlx::query_as::<_, MilestoneRow>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Overwrite a milestone's editable fields.
    ///
    /// Returns `None` if no row with the given `id` exists. Reschedule
    /// bookkeeping (`reschedule_count`, `reschedule_reason`) is left alone.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        record: &MilestoneRecord,
    ) -> Result<Option<Milestone>, sqlx::Error> {
        let query = format!(
            "UPDATE milestones SET
                title = $2,
                description = $3,
                due_date = $4,
                assigned_to = $5,
                payment_type = $6,
                payment_request_stage = $7,
                payment_trigger_type = $8,
                payment_trigger_value = $9,
                payment_percentage = $10,
                calculated_amount = $11,
                status = $12,
                payment_status = $13,
                progress = $14,
                reset_due_on_fail = $15
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MilestoneRow>(&query)
            .bind(id)
            .bind(&record.title)
            .bind(&record.description)
            .bind(record.due_date)
            .bind(&record.assigned_to)
            .bind(record.payment_type.as_str())
            .bind(record.payment_request_stage.map(|s| s.as_str()))
            .bind(record.payment_trigger_type.map(|t| t.as_str()))
            .bind(record.payment_trigger_value)
            .bind(&record.payment_percentage)
            .bind(record.calculated_amount)
            .bind(record.status.as_str())
            .bind(record.payment_status.as_str())
            .bind(record.progress)
            .bind(record.reset_due_on_fail)
            .fetch_optional(pool)
            .await?
            .map(decode)
            .transpose()
    }

    /// Apply a reschedule. Returns `None` if no row with the given `id` exists.
    pub async fn reschedule(
        pool: &PgPool,
        id: DbId,
        patch: &ReschedulePatch,
    ) -> Result<Option<Milestone>, sqlx::Error> {
        let query = format!(
            "UPDATE milestones SET
                due_date = $2,
                reschedule_reason = $3,
                reschedule_count = $4,
                status = $5,
                payment_status = $6,
                progress = $7
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MilestoneRow>(&query)
            .bind(id)
            .bind(patch.due_date)
            .bind(&patch.reschedule_reason)
            .bind(patch.reschedule_count)
            .bind(patch.status.as_str())
            .bind(patch.payment_status.as_str())
            .bind(patch.progress)
            .fetch_optional(pool)
            .await?
            .map(decode)
            .transpose()
    }

    /// Delete a milestone. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM milestones WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
