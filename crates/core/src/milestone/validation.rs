//! Form-level validation for milestone writes.
//!
//! Validation never fails with an error for expected problems: it returns a
//! [`ValidationReport`] listing per-field violations and, separately, a
//! budget-exceeded notice. Callers decide whether to show the report or turn
//! it into a [`CoreError`] with [`ValidationReport::into_result`].

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::allocation::{effective_amount, exceeds_remaining, round_to_cents};
use super::{MilestoneForm, MilestoneState, RescheduleRequest, TriggerType};
use crate::currency::format_inr;
use crate::error::CoreError;

/// Upper bound for a percentage trigger.
pub const MAX_PERCENTAGE: f64 = 100.0;

/// Progress is a percentage of completion.
pub const MAX_PROGRESS: i16 = 100;

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

pub const FIELD_TITLE: &str = "title";
pub const FIELD_ASSIGNED_TO: &str = "assigned_to";
pub const FIELD_DUE_DATE: &str = "due_date";
pub const FIELD_TRIGGER_TYPE: &str = "payment_trigger_type";
pub const FIELD_TRIGGER_VALUE: &str = "payment_trigger_value";
pub const FIELD_PROGRESS: &str = "progress";
pub const FIELD_RESCHEDULE_REASON: &str = "reschedule_reason";

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// A single failed rule, attributed to the field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// A payment allocation that does not fit in the remaining budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetExceeded {
    pub calculated: f64,
    pub remaining: f64,
}

impl fmt::Display for BudgetExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Calculated amount {} exceeds remaining budget {}",
            format_inr(self.calculated),
            format_inr(self.remaining)
        )
    }
}

/// Outcome of validating a milestone write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<FieldViolation>,
    pub budget: Option<BudgetExceeded>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty() && self.budget.is_none()
    }

    pub fn has_violation(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.violations.push(FieldViolation::new(field, message));
    }

    /// Field violations take precedence over the budget notice.
    pub fn into_result(self) -> Result<(), CoreError> {
        if !self.violations.is_empty() {
            return Err(CoreError::FieldValidation(self.violations));
        }
        match self.budget {
            Some(exceeded) => Err(CoreError::BudgetExceeded(exceeded)),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Whether a form write creates a milestone or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Edit,
}

/// Everything the validator needs besides the form itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub project_value: f64,
    pub project_end_date: Option<NaiveDate>,
    /// Remaining budget computed with the edited milestone excluded.
    pub remaining_amount: f64,
    /// Stored values of the milestone being edited; `None` on create.
    pub initial: Option<&'a MilestoneState>,
}

impl ValidationContext<'_> {
    pub fn mode(&self) -> WriteMode {
        if self.initial.is_some() {
            WriteMode::Edit
        } else {
            WriteMode::Create
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Validate a create or edit submission.
pub fn validate_milestone(form: &MilestoneForm, ctx: &ValidationContext<'_>) -> ValidationReport {
    let mut report = ValidationReport::default();

    if form.title.trim().is_empty() {
        report.push(FIELD_TITLE, "Please enter a milestone title");
    }

    if form.assigned_to.is_empty() {
        report.push(FIELD_ASSIGNED_TO, "Please assign at least one team member");
    }

    check_due_date(form, ctx, &mut report);

    if let Some(progress) = form.progress {
        if !(0..=MAX_PROGRESS).contains(&progress) {
            report.push(FIELD_PROGRESS, "Progress must be between 0 and 100");
        }
    }

    match form.payment_trigger_type {
        None => report.push(FIELD_TRIGGER_TYPE, "Please select a payment trigger type"),
        Some(trigger_type) => {
            if check_trigger_value(trigger_type, form.payment_trigger_value, &mut report) {
                report.budget = check_budget(form, ctx);
            }
        }
    }

    report
}

/// Validate a reschedule request against `today`.
pub fn validate_reschedule(request: &RescheduleRequest, today: NaiveDate) -> ValidationReport {
    let mut report = ValidationReport::default();

    match request.due_date {
        None => report.push(FIELD_DUE_DATE, "Please select a new due date"),
        Some(date) if date < today => {
            report.push(FIELD_DUE_DATE, "New due date cannot be in the past")
        }
        Some(_) => {}
    }

    let reason_missing = request
        .reschedule_reason
        .as_deref()
        .map_or(true, |r| r.trim().is_empty());
    if reason_missing {
        report.push(FIELD_RESCHEDULE_REASON, "Please enter a reason for rescheduling");
    }

    report
}

/// Check the trigger value's own bounds. Returns `true` when the value is
/// well-formed enough to run the budget check.
fn check_trigger_value(
    trigger_type: TriggerType,
    value: Option<f64>,
    report: &mut ValidationReport,
) -> bool {
    let Some(value) = value else {
        let message = match trigger_type {
            TriggerType::Percentage => "Please enter a percentage",
            TriggerType::FixedAmount => "Please enter an amount",
        };
        report.push(FIELD_TRIGGER_VALUE, message);
        return false;
    };

    match trigger_type {
        TriggerType::Percentage if value <= 0.0 => {
            report.push(FIELD_TRIGGER_VALUE, "Percentage must be greater than 0");
            false
        }
        TriggerType::Percentage if value > MAX_PERCENTAGE => {
            report.push(FIELD_TRIGGER_VALUE, "Percentage cannot exceed 100");
            false
        }
        TriggerType::FixedAmount if value < 0.0 => {
            report.push(FIELD_TRIGGER_VALUE, "Amount cannot be negative");
            false
        }
        _ => true,
    }
}

/// Creation pins the due date to the project's end date. An edit only
/// re-checks it when the date actually moved.
fn check_due_date(form: &MilestoneForm, ctx: &ValidationContext<'_>, report: &mut ValidationReport) {
    let Some(due_date) = form.due_date else {
        report.push(FIELD_DUE_DATE, "Please select a due date");
        return;
    };

    let date_changed = ctx.initial.map_or(true, |initial| initial.due_date != due_date);
    if let Some(end_date) = ctx.project_end_date {
        if date_changed && due_date > end_date {
            report.push(
                FIELD_DUE_DATE,
                format!("Due date cannot be after the project end date ({end_date})"),
            );
        }
    }
}

/// Whether an edit leaves the stored trigger type and value untouched.
pub fn trigger_unchanged(form: &MilestoneForm, initial: Option<&MilestoneState>) -> bool {
    let Some(initial) = initial else {
        return false;
    };
    form.payment_trigger_type == initial.payment_trigger_type
        && form.payment_trigger_value == initial.payment_trigger_value
}

/// Compare the form's effective amount against the remaining budget.
///
/// Skipped when editing without touching the trigger: the stored allocation
/// was accepted when first saved. This trusts the remaining-amount snapshot
/// taken when the form was loaded, so concurrent edits to sibling milestones
/// are not re-checked.
pub fn check_budget(form: &MilestoneForm, ctx: &ValidationContext<'_>) -> Option<BudgetExceeded> {
    let trigger_type = form.payment_trigger_type?;
    if trigger_unchanged(form, ctx.initial) {
        return None;
    }

    let calculated = round_to_cents(effective_amount(
        form.payment_type,
        Some(trigger_type),
        form.payment_trigger_value,
        ctx.project_value,
    ));

    exceeds_remaining(calculated, ctx.remaining_amount).then_some(BudgetExceeded {
        calculated,
        remaining: ctx.remaining_amount,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::assignees::AssigneeSet;
    use crate::milestone::{MilestoneStatus, PaymentStatus, PaymentType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn form(trigger_type: TriggerType, value: f64) -> MilestoneForm {
        MilestoneForm {
            title: "Wireframes".to_string(),
            due_date: Some(date(2026, 11, 15)),
            assigned_to: AssigneeSet::parse("4"),
            payment_trigger_type: Some(trigger_type),
            payment_trigger_value: Some(value),
            ..MilestoneForm::blank()
        }
    }

    fn create_ctx(remaining: f64) -> ValidationContext<'static> {
        ValidationContext {
            project_value: 100_000.0,
            project_end_date: Some(date(2026, 12, 31)),
            remaining_amount: remaining,
            initial: None,
        }
    }

    fn stored(trigger_type: TriggerType, value: f64) -> MilestoneState {
        MilestoneState {
            id: 5,
            due_date: date(2026, 11, 15),
            payment_type: PaymentType::Conditional,
            payment_trigger_type: Some(trigger_type),
            payment_trigger_value: Some(value),
            status: MilestoneStatus::Pending,
            payment_status: PaymentStatus::NotStarted,
            progress: 0,
            reschedule_count: 0,
            reset_due_on_fail: false,
        }
    }

    // -- required fields --

    #[test]
    fn valid_form_passes() {
        let report = validate_milestone(&form(TriggerType::Percentage, 50.0), &create_ctx(60_000.0));
        assert!(report.is_valid(), "{report:?}");
    }

    #[test]
    fn blank_title_and_assignees_are_reported_per_field() {
        let mut f = form(TriggerType::Percentage, 10.0);
        f.title = "   ".to_string();
        f.assigned_to = AssigneeSet::new();

        let report = validate_milestone(&f, &create_ctx(60_000.0));
        assert!(report.has_violation(FIELD_TITLE));
        assert!(report.has_violation(FIELD_ASSIGNED_TO));
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn missing_trigger_type_is_reported() {
        let mut f = form(TriggerType::Percentage, 10.0);
        f.payment_trigger_type = None;
        let report = validate_milestone(&f, &create_ctx(60_000.0));
        assert!(report.has_violation(FIELD_TRIGGER_TYPE));
    }

    #[test]
    fn progress_out_of_range_is_reported() {
        let mut f = form(TriggerType::Percentage, 10.0);
        f.progress = Some(120);
        let report = validate_milestone(&f, &create_ctx(60_000.0));
        assert!(report.has_violation(FIELD_PROGRESS));
    }

    // -- due date --

    #[test]
    fn due_date_after_project_end_is_rejected_on_create() {
        let mut f = form(TriggerType::Percentage, 10.0);
        f.due_date = Some(date(2027, 1, 1));
        let report = validate_milestone(&f, &create_ctx(60_000.0));
        assert!(report.has_violation(FIELD_DUE_DATE));
    }

    #[test]
    fn due_date_on_project_end_is_accepted() {
        let mut f = form(TriggerType::Percentage, 10.0);
        f.due_date = Some(date(2026, 12, 31));
        let report = validate_milestone(&f, &create_ctx(60_000.0));
        assert!(!report.has_violation(FIELD_DUE_DATE));
    }

    #[test]
    fn missing_due_date_is_reported() {
        let mut f = form(TriggerType::Percentage, 10.0);
        f.due_date = None;
        let report = validate_milestone(&f, &create_ctx(60_000.0));
        assert!(report.has_violation(FIELD_DUE_DATE));
    }

    #[test]
    fn unchanged_late_due_date_is_not_rechecked_on_edit() {
        let mut initial = stored(TriggerType::Percentage, 10.0);
        initial.due_date = date(2027, 2, 1);
        let mut f = form(TriggerType::Percentage, 10.0);
        f.due_date = Some(initial.due_date);

        let ctx = ValidationContext {
            initial: Some(&initial),
            ..create_ctx(60_000.0)
        };
        assert_eq!(ctx.mode(), WriteMode::Edit);
        assert!(!validate_milestone(&f, &ctx).has_violation(FIELD_DUE_DATE));
    }

    // -- percentage trigger --

    #[test]
    fn percentage_over_100_is_rejected() {
        let report = validate_milestone(&form(TriggerType::Percentage, 100.5), &create_ctx(100_000.0));
        assert!(report.has_violation(FIELD_TRIGGER_VALUE));
        assert!(report.budget.is_none());
    }

    #[test]
    fn zero_percentage_is_rejected() {
        let report = validate_milestone(&form(TriggerType::Percentage, 0.0), &create_ctx(100_000.0));
        assert!(report.has_violation(FIELD_TRIGGER_VALUE));
    }

    #[test]
    fn missing_percentage_is_rejected() {
        let mut f = form(TriggerType::Percentage, 1.0);
        f.payment_trigger_value = None;
        let report = validate_milestone(&f, &create_ctx(100_000.0));
        assert!(report.has_violation(FIELD_TRIGGER_VALUE));
    }

    #[test]
    fn missing_fixed_amount_is_rejected() {
        let mut f = form(TriggerType::FixedAmount, 1.0);
        f.payment_trigger_value = None;
        let report = validate_milestone(&f, &create_ctx(100_000.0));
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].field, FIELD_TRIGGER_VALUE);
        assert_eq!(report.violations[0].message, "Please enter an amount");
        assert!(report.budget.is_none());
    }

    #[test]
    fn percentage_within_remaining_is_accepted() {
        // 40,000 already allocated: 50% = 50,000 fits in 60,000.
        let report = validate_milestone(&form(TriggerType::Percentage, 50.0), &create_ctx(60_000.0));
        assert!(report.budget.is_none());
    }

    #[test]
    fn percentage_over_remaining_reports_budget() {
        let report = validate_milestone(&form(TriggerType::Percentage, 70.0), &create_ctx(60_000.0));
        assert!(report.violations.is_empty());
        let exceeded = report.budget.expect("budget should be exceeded");
        assert_eq!(exceeded.calculated, 70_000.0);
        assert_eq!(exceeded.remaining, 60_000.0);
        assert_eq!(
            exceeded.to_string(),
            "Calculated amount ₹70,000.00 exceeds remaining budget ₹60,000.00"
        );
    }

    // -- fixed amount trigger --

    #[test]
    fn fixed_amount_over_remaining_reports_budget() {
        let report = validate_milestone(&form(TriggerType::FixedAmount, 60_000.5), &create_ctx(60_000.0));
        assert!(report.budget.is_some());
    }

    #[test]
    fn fixed_amount_within_tolerance_is_accepted() {
        let report = validate_milestone(&form(TriggerType::FixedAmount, 60_000.01), &create_ctx(60_000.0));
        assert!(report.is_valid());
    }

    #[test]
    fn negative_fixed_amount_is_rejected() {
        let report = validate_milestone(&form(TriggerType::FixedAmount, -5.0), &create_ctx(60_000.0));
        assert!(report.has_violation(FIELD_TRIGGER_VALUE));
    }

    // -- skip on unchanged edit --

    #[test]
    fn unchanged_trigger_on_edit_skips_budget_check() {
        let initial = stored(TriggerType::FixedAmount, 90_000.0);
        let ctx = ValidationContext {
            initial: Some(&initial),
            ..create_ctx(10_000.0)
        };
        let report = validate_milestone(&form(TriggerType::FixedAmount, 90_000.0), &ctx);
        assert!(report.is_valid(), "{report:?}");
    }

    #[test]
    fn changed_trigger_on_edit_is_checked() {
        let initial = stored(TriggerType::FixedAmount, 9_000.0);
        let ctx = ValidationContext {
            initial: Some(&initial),
            ..create_ctx(10_000.0)
        };
        let report = validate_milestone(&form(TriggerType::FixedAmount, 12_000.0), &ctx);
        assert!(report.budget.is_some());
    }

    // -- reschedule --

    #[test]
    fn reschedule_requires_future_date_and_reason() {
        let today = date(2026, 10, 15);
        let request = RescheduleRequest {
            due_date: Some(date(2026, 10, 14)),
            reschedule_reason: Some("  ".to_string()),
        };
        let report = validate_reschedule(&request, today);
        assert!(report.has_violation(FIELD_DUE_DATE));
        assert!(report.has_violation(FIELD_RESCHEDULE_REASON));
    }

    #[test]
    fn reschedule_to_today_is_accepted() {
        let today = date(2026, 10, 15);
        let request = RescheduleRequest {
            due_date: Some(today),
            reschedule_reason: Some("client delay".to_string()),
        };
        assert!(validate_reschedule(&request, today).is_valid());
    }

    // -- into_result --

    #[test]
    fn into_result_prefers_field_violations() {
        let mut f = form(TriggerType::Percentage, 70.0);
        f.title.clear();
        let result = validate_milestone(&f, &create_ctx(60_000.0)).into_result();
        assert_matches!(result, Err(CoreError::FieldValidation(v)) if v.len() == 1);
    }

    #[test]
    fn into_result_reports_budget() {
        let result = validate_milestone(&form(TriggerType::Percentage, 70.0), &create_ctx(60_000.0))
            .into_result();
        assert_matches!(result, Err(CoreError::BudgetExceeded(_)));
    }
}
