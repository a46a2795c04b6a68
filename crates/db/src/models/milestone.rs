//! Milestone entity model.
//!
//! Rows store enum-like columns as their wire strings. [`MilestoneRow`] is the
//! raw row; [`Milestone`] is the typed entity handed to handlers, produced by
//! `TryFrom<MilestoneRow>`. Writes go through `crm_core` mapping output
//! ([`MilestoneRecord`](crm_core::milestone::mapping::MilestoneRecord)), so
//! there are no separate create/update DTOs here.

use chrono::NaiveDate;
use crm_core::assignees::AssigneeSet;
use crm_core::error::CoreError;
use crm_core::milestone::allocation::AllocationEntry;
use crm_core::milestone::{
    MilestoneState, MilestoneStatus, PaymentRequestStage, PaymentStatus, PaymentType,
    TriggerType,
};
use crm_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A raw row from the `milestones` table.
#[derive(Debug, Clone, FromRow)]
pub struct MilestoneRow {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub assigned_to: String,
    pub payment_type: String,
    pub payment_request_stage: Option<String>,
    pub payment_trigger_type: Option<String>,
    pub payment_trigger_value: Option<f64>,
    pub payment_percentage: Option<String>,
    pub calculated_amount: f64,
    pub status: String,
    pub payment_status: String,
    pub progress: i16,
    pub reschedule_count: i32,
    pub reschedule_reason: Option<String>,
    pub reset_due_on_fail: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A milestone with typed payment fields.
#[derive(Debug, Clone, Serialize)]
pub struct Milestone {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub assigned_to: AssigneeSet,
    pub payment_type: PaymentType,
    pub payment_request_stage: Option<PaymentRequestStage>,
    pub payment_trigger_type: Option<TriggerType>,
    pub payment_trigger_value: Option<f64>,
    pub payment_percentage: Option<String>,
    pub calculated_amount: f64,
    pub status: MilestoneStatus,
    pub payment_status: PaymentStatus,
    pub progress: i16,
    pub reschedule_count: i32,
    pub reschedule_reason: Option<String>,
    pub reset_due_on_fail: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<MilestoneRow> for Milestone {
    type Error = CoreError;

    fn try_from(row: MilestoneRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            assigned_to: AssigneeSet::parse(&row.assigned_to),
            payment_type: row.payment_type.parse()?,
            payment_request_stage: row
                .payment_request_stage
                .as_deref()
                .map(str::parse)
                .transpose()?,
            payment_trigger_type: row
                .payment_trigger_type
                .as_deref()
                .map(str::parse)
                .transpose()?,
            payment_trigger_value: row.payment_trigger_value,
            payment_percentage: row.payment_percentage,
            calculated_amount: row.calculated_amount,
            status: row.status.parse()?,
            payment_status: row.payment_status.parse()?,
            progress: row.progress,
            reschedule_count: row.reschedule_count,
            reschedule_reason: row.reschedule_reason,
            reset_due_on_fail: row.reset_due_on_fail,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl Milestone {
    /// The persisted state used as initial values for edits and reschedules.
    pub fn state(&self) -> MilestoneState {
        MilestoneState {
            id: self.id,
            due_date: self.due_date,
            payment_type: self.payment_type,
            payment_trigger_type: self.payment_trigger_type,
            payment_trigger_value: self.payment_trigger_value,
            status: self.status,
            payment_status: self.payment_status,
            progress: self.progress,
            reschedule_count: self.reschedule_count,
            reset_due_on_fail: self.reset_due_on_fail,
        }
    }

    pub fn allocation_entry(&self) -> AllocationEntry {
        AllocationEntry {
            id: self.id,
            payment_type: self.payment_type,
            payment_trigger_type: self.payment_trigger_type,
            payment_trigger_value: self.payment_trigger_value,
        }
    }
}

