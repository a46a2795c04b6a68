//! Mapping milestone form values to the persisted shape.
//!
//! The mapper enforces the status couplings at submission time and re-runs
//! the budget check, rejecting the whole submission rather than returning a
//! partial record.

use chrono::NaiveDate;
use serde::Serialize;

use super::allocation::{effective_amount, round_to_cents};
use super::validation::{
    check_budget, trigger_unchanged, FieldViolation, ValidationContext, FIELD_DUE_DATE,
    FIELD_RESCHEDULE_REASON, FIELD_TRIGGER_VALUE, MAX_PERCENTAGE, MAX_PROGRESS,
};
use super::{
    MilestoneForm, MilestoneState, MilestoneStatus, PaymentRequestStage, PaymentStatus,
    PaymentType, RescheduleRequest, TriggerType,
};
use crate::error::CoreError;

/// Progress recorded for a completed milestone.
pub const COMPLETE_PROGRESS: i16 = 100;

/// Inputs the mapper needs besides the form.
#[derive(Debug, Clone, Copy)]
pub struct MappingContext<'a> {
    /// Stored values of the milestone being edited; `None` on create.
    pub initial: Option<&'a MilestoneState>,
    pub remaining_amount: f64,
    pub project_value: f64,
}

/// A milestone ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneRecord {
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    /// Comma-joined member ids.
    pub assigned_to: String,
    pub payment_type: PaymentType,
    pub payment_request_stage: Option<PaymentRequestStage>,
    pub payment_trigger_type: Option<TriggerType>,
    pub payment_trigger_value: Option<f64>,
    /// Raw percentage as text, for display. Only set for percentage triggers.
    pub payment_percentage: Option<String>,
    pub calculated_amount: f64,
    pub status: MilestoneStatus,
    pub payment_status: PaymentStatus,
    pub progress: i16,
    pub reset_due_on_fail: bool,
}

/// The fields a successful reschedule writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReschedulePatch {
    pub due_date: NaiveDate,
    pub reschedule_reason: String,
    pub reschedule_count: i32,
    pub status: MilestoneStatus,
    pub payment_status: PaymentStatus,
    /// Progress carried over from a pending milestone; a completed one
    /// reopens at zero unless the progress cache restores it.
    pub progress: i16,
}

/// Result of mapping a reschedule.
#[derive(Debug, Clone, PartialEq)]
pub enum RescheduleOutcome {
    Rescheduled(ReschedulePatch),
    /// The milestone has not opted in to rescheduling; nothing to write.
    Disabled,
}

/// Resolve the milestone status for a submission.
///
/// Unconditional payments are always complete: either the stored type (on
/// edit) or the submitted type forces `Completed`. Otherwise the toggle
/// decides.
pub fn resolve_status(form: &MilestoneForm, initial: Option<&MilestoneState>) -> MilestoneStatus {
    let stored_unconditional =
        initial.is_some_and(|i| i.payment_type == PaymentType::Unconditional);
    if stored_unconditional
        || form.payment_type == PaymentType::Unconditional
        || form.mark_as_completed
    {
        MilestoneStatus::Completed
    } else {
        MilestoneStatus::Pending
    }
}

/// Derive the payment status from the resolved milestone status.
///
/// A completed milestone is fully paid. A stale `Fully Paid` on a milestone
/// that is no longer complete is reset to `Not Started`.
pub fn resolve_payment_status(
    status: MilestoneStatus,
    incoming: Option<PaymentStatus>,
) -> PaymentStatus {
    match (status, incoming) {
        (MilestoneStatus::Completed, _) => PaymentStatus::FullyPaid,
        (MilestoneStatus::Pending, None | Some(PaymentStatus::FullyPaid)) => {
            PaymentStatus::NotStarted
        }
        (MilestoneStatus::Pending, Some(other)) => other,
    }
}

/// Map form values to the record that will be persisted.
///
/// Rejects with [`CoreError::FieldValidation`] when the due date is missing
/// or a percentage is out of bounds, and with [`CoreError::BudgetExceeded`]
/// when the allocation overflows the remaining budget (unless an edit left
/// the trigger unchanged).
pub fn map_to_storage(
    form: &MilestoneForm,
    ctx: &MappingContext<'_>,
) -> Result<MilestoneRecord, CoreError> {
    let due_date = form.due_date.ok_or_else(|| {
        CoreError::FieldValidation(vec![FieldViolation::new(
            FIELD_DUE_DATE,
            "Please select a due date",
        )])
    })?;

    let payment_percentage = match form.payment_trigger_type {
        Some(TriggerType::Percentage) => {
            let value = percentage_in_bounds(form, ctx.initial)?;
            value.map(|v| v.to_string())
        }
        _ => None,
    };

    let validation_ctx = ValidationContext {
        project_value: ctx.project_value,
        project_end_date: None,
        remaining_amount: ctx.remaining_amount,
        initial: ctx.initial,
    };
    if let Some(exceeded) = check_budget(form, &validation_ctx) {
        return Err(CoreError::BudgetExceeded(exceeded));
    }

    let status = resolve_status(form, ctx.initial);
    let payment_status = resolve_payment_status(status, form.payment_status);

    let payment_request_stage = match form.payment_type {
        PaymentType::Conditional => form.payment_request_stage,
        PaymentType::Unconditional => None,
    };

    let calculated_amount = round_to_cents(effective_amount(
        form.payment_type,
        form.payment_trigger_type,
        form.payment_trigger_value,
        ctx.project_value,
    ));

    Ok(MilestoneRecord {
        title: form.title.trim().to_string(),
        description: form.description.clone(),
        due_date,
        assigned_to: form.assigned_to.to_storage(),
        payment_type: form.payment_type,
        payment_request_stage,
        payment_trigger_type: form.payment_trigger_type,
        payment_trigger_value: form.payment_trigger_value,
        payment_percentage,
        calculated_amount,
        status,
        payment_status,
        progress: resolve_progress(form, ctx.initial, status),
        reset_due_on_fail: form.reset_due_on_fail,
    })
}

/// A percentage must lie in `(0, 100]`, unless an edit carries the stored
/// value through unchanged.
fn percentage_in_bounds(
    form: &MilestoneForm,
    initial: Option<&MilestoneState>,
) -> Result<Option<f64>, CoreError> {
    let value = form.payment_trigger_value;
    if trigger_unchanged(form, initial) {
        return Ok(value);
    }
    match value {
        Some(v) if v > 0.0 && v <= MAX_PERCENTAGE => Ok(Some(v)),
        _ => Err(CoreError::FieldValidation(vec![FieldViolation::new(
            FIELD_TRIGGER_VALUE,
            "Percentage must be greater than 0 and at most 100",
        )])),
    }
}

/// Completed milestones sit at full progress. A pending milestone keeps the
/// submitted progress, or its stored progress if it was already pending.
fn resolve_progress(
    form: &MilestoneForm,
    initial: Option<&MilestoneState>,
    status: MilestoneStatus,
) -> i16 {
    if status == MilestoneStatus::Completed {
        return COMPLETE_PROGRESS;
    }
    let stored = initial
        .filter(|i| i.status == MilestoneStatus::Pending)
        .map(|i| i.progress);
    form.progress.or(stored).unwrap_or(0).clamp(0, MAX_PROGRESS)
}

/// Map a reschedule of `current`.
///
/// The milestone is reopened (`Pending`) and its reschedule count goes up by
/// exactly one. Milestones without `reset_due_on_fail` are not rescheduled.
/// The request is assumed to have passed
/// [`validate_reschedule`](super::validation::validate_reschedule); a missing
/// date or reason is still rejected here.
pub fn map_reschedule(
    current: &MilestoneState,
    request: &RescheduleRequest,
) -> Result<RescheduleOutcome, CoreError> {
    if !current.reset_due_on_fail {
        return Ok(RescheduleOutcome::Disabled);
    }

    let mut violations = Vec::new();
    if request.due_date.is_none() {
        violations.push(FieldViolation::new(FIELD_DUE_DATE, "Please select a new due date"));
    }
    let reason = request
        .reschedule_reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if reason.is_none() {
        violations.push(FieldViolation::new(
            FIELD_RESCHEDULE_REASON,
            "Please enter a reason for rescheduling",
        ));
    }

    match (request.due_date, reason) {
        (Some(due_date), Some(reason)) => {
            let reschedule_count = current.reschedule_count.checked_add(1).ok_or_else(|| {
                CoreError::Validation(format!(
                    "Milestone {} cannot be rescheduled any further",
                    current.id
                ))
            })?;
            let status = MilestoneStatus::Pending;
            Ok(RescheduleOutcome::Rescheduled(ReschedulePatch {
                due_date,
                reschedule_reason: reason.to_string(),
                reschedule_count,
                status,
                payment_status: resolve_payment_status(status, Some(current.payment_status)),
                progress: match current.status {
                    MilestoneStatus::Pending => current.progress,
                    MilestoneStatus::Completed => 0,
                },
            }))
        }
        _ => Err(CoreError::FieldValidation(violations)),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::assignees::AssigneeSet;

    const PROJECT_VALUE: f64 = 100_000.0;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn form(payment_type: PaymentType, trigger_type: TriggerType, value: f64) -> MilestoneForm {
        MilestoneForm {
            title: " Launch ".to_string(),
            due_date: Some(date(2026, 12, 1)),
            assigned_to: AssigneeSet::parse("2,7"),
            payment_type,
            payment_trigger_type: Some(trigger_type),
            payment_trigger_value: Some(value),
            ..MilestoneForm::blank()
        }
    }

    fn create_ctx(remaining: f64) -> MappingContext<'static> {
        MappingContext {
            initial: None,
            remaining_amount: remaining,
            project_value: PROJECT_VALUE,
        }
    }

    fn stored() -> MilestoneState {
        MilestoneState {
            id: 11,
            due_date: date(2026, 11, 1),
            payment_type: PaymentType::Conditional,
            payment_trigger_type: Some(TriggerType::Percentage),
            payment_trigger_value: Some(30.0),
            status: MilestoneStatus::Pending,
            payment_status: PaymentStatus::NotStarted,
            progress: 40,
            reschedule_count: 2,
            reset_due_on_fail: true,
        }
    }

    // -- create --

    #[test]
    fn conditional_percentage_maps_amount_and_percentage() {
        let record = map_to_storage(
            &form(PaymentType::Conditional, TriggerType::Percentage, 50.0),
            &create_ctx(60_000.0),
        )
        .unwrap();

        assert_eq!(record.title, "Launch");
        assert_eq!(record.assigned_to, "2,7");
        assert_eq!(record.calculated_amount, 50_000.0);
        assert_eq!(record.payment_percentage.as_deref(), Some("50"));
        assert_eq!(record.status, MilestoneStatus::Pending);
        assert_eq!(record.payment_status, PaymentStatus::NotStarted);
        assert_eq!(
            record.payment_request_stage,
            Some(PaymentRequestStage::DuringProgress)
        );
    }

    #[test]
    fn percentage_over_remaining_is_rejected() {
        let result = map_to_storage(
            &form(PaymentType::Conditional, TriggerType::Percentage, 70.0),
            &create_ctx(60_000.0),
        );
        assert_matches!(
            result,
            Err(CoreError::BudgetExceeded(e)) if e.calculated == 70_000.0 && e.remaining == 60_000.0
        );
    }

    #[test]
    fn percentage_over_100_never_reaches_storage() {
        let result = map_to_storage(
            &form(PaymentType::Conditional, TriggerType::Percentage, 150.0),
            &create_ctx(PROJECT_VALUE),
        );
        assert_matches!(result, Err(CoreError::FieldValidation(_)));
    }

    #[test]
    fn fixed_amount_over_remaining_is_rejected() {
        let result = map_to_storage(
            &form(PaymentType::Conditional, TriggerType::FixedAmount, 61_000.0),
            &create_ctx(60_000.0),
        );
        assert_matches!(result, Err(CoreError::BudgetExceeded(_)));
    }

    #[test]
    fn fixed_amount_has_no_percentage() {
        let record = map_to_storage(
            &form(PaymentType::Conditional, TriggerType::FixedAmount, 15_000.0),
            &create_ctx(60_000.0),
        )
        .unwrap();
        assert_eq!(record.payment_percentage, None);
        assert_eq!(record.calculated_amount, 15_000.0);
    }

    #[test]
    fn missing_due_date_is_rejected() {
        let mut f = form(PaymentType::Conditional, TriggerType::FixedAmount, 1.0);
        f.due_date = None;
        assert_matches!(
            map_to_storage(&f, &create_ctx(60_000.0)),
            Err(CoreError::FieldValidation(_))
        );
    }

    // -- status coupling --

    #[test]
    fn unconditional_is_completed_and_fully_paid() {
        let mut f = form(PaymentType::Unconditional, TriggerType::Percentage, 20.0);
        f.mark_as_completed = false;
        f.payment_status = Some(PaymentStatus::NotStarted);
        f.payment_request_stage = Some(PaymentRequestStage::OnCompletion);

        let record = map_to_storage(&f, &create_ctx(PROJECT_VALUE)).unwrap();
        assert_eq!(record.status, MilestoneStatus::Completed);
        assert_eq!(record.payment_status, PaymentStatus::FullyPaid);
        assert_eq!(record.calculated_amount, 20_000.0);
        assert_eq!(record.payment_request_stage, None);
        assert_eq!(record.progress, COMPLETE_PROGRESS);
    }

    #[test]
    fn stored_unconditional_stays_completed_on_edit() {
        let mut initial = stored();
        initial.payment_type = PaymentType::Unconditional;
        let f = form(PaymentType::Conditional, TriggerType::Percentage, 30.0);

        let ctx = MappingContext {
            initial: Some(&initial),
            ..create_ctx(0.0)
        };
        let record = map_to_storage(&f, &ctx).unwrap();
        assert_eq!(record.status, MilestoneStatus::Completed);
    }

    #[test]
    fn toggle_marks_conditional_completed() {
        let mut f = form(PaymentType::Conditional, TriggerType::FixedAmount, 100.0);
        f.mark_as_completed = true;
        let record = map_to_storage(&f, &create_ctx(60_000.0)).unwrap();
        assert_eq!(record.status, MilestoneStatus::Completed);
        assert_eq!(record.payment_status, PaymentStatus::FullyPaid);
    }

    #[test]
    fn stale_fully_paid_is_reset_when_pending() {
        let mut f = form(PaymentType::Conditional, TriggerType::FixedAmount, 100.0);
        f.payment_status = Some(PaymentStatus::FullyPaid);
        let record = map_to_storage(&f, &create_ctx(60_000.0)).unwrap();
        assert_eq!(record.payment_status, PaymentStatus::NotStarted);
    }

    // -- edit --

    #[test]
    fn unchanged_trigger_on_edit_is_not_rechecked() {
        let initial = stored();
        let f = form(PaymentType::Conditional, TriggerType::Percentage, 30.0);
        let ctx = MappingContext {
            initial: Some(&initial),
            ..create_ctx(0.0)
        };
        let record = map_to_storage(&f, &ctx).unwrap();
        assert_eq!(record.calculated_amount, 30_000.0);
        assert_eq!(record.progress, 40);
    }

    #[test]
    fn edit_without_own_allocation_fits_remaining() {
        // Remaining was computed excluding the edited milestone: raising it
        // from 30% to 35% with 40,000 remaining is fine.
        let initial = stored();
        let f = form(PaymentType::Conditional, TriggerType::Percentage, 35.0);
        let ctx = MappingContext {
            initial: Some(&initial),
            ..create_ctx(40_000.0)
        };
        assert!(map_to_storage(&f, &ctx).is_ok());
    }

    // -- reschedule --

    #[test]
    fn reschedule_increments_count_and_reopens() {
        let mut current = stored();
        current.status = MilestoneStatus::Completed;
        current.payment_status = PaymentStatus::FullyPaid;
        let request = RescheduleRequest {
            due_date: Some(date(2026, 10, 16)),
            reschedule_reason: Some(" client delay ".to_string()),
        };

        let outcome = map_reschedule(&current, &request).unwrap();
        let patch = assert_matches!(outcome, RescheduleOutcome::Rescheduled(p) => p);
        assert_eq!(patch.reschedule_count, 3);
        assert_eq!(patch.status, MilestoneStatus::Pending);
        assert_eq!(patch.payment_status, PaymentStatus::NotStarted);
        assert_eq!(patch.reschedule_reason, "client delay");
        assert_eq!(patch.progress, 0);
    }

    #[test]
    fn reschedule_disabled_without_opt_in() {
        let mut current = stored();
        current.reset_due_on_fail = false;
        let request = RescheduleRequest {
            due_date: Some(date(2026, 10, 16)),
            reschedule_reason: Some("client delay".to_string()),
        };
        assert_eq!(
            map_reschedule(&current, &request).unwrap(),
            RescheduleOutcome::Disabled
        );
    }

    #[test]
    fn reschedule_count_at_limit_is_rejected() {
        let mut current = stored();
        current.reschedule_count = i32::MAX;
        let request = RescheduleRequest {
            due_date: Some(date(2026, 10, 16)),
            reschedule_reason: Some("client delay".to_string()),
        };
        assert_matches!(
            map_reschedule(&current, &request),
            Err(CoreError::Validation(msg)) if msg.contains("11")
        );
    }

    #[test]
    fn reschedule_without_reason_is_rejected() {
        let request = RescheduleRequest {
            due_date: Some(date(2026, 10, 16)),
            reschedule_reason: None,
        };
        assert_matches!(
            map_reschedule(&stored(), &request),
            Err(CoreError::FieldValidation(v)) if v.len() == 1
        );
    }
}
