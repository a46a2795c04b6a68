//! Budget allocation across a project's milestones.
//!
//! Each milestone claims an *effective amount* of the project value. The sum
//! of effective amounts, excluding the milestone currently being edited, must
//! not exceed the project value.

use serde::Serialize;

use super::{MilestoneState, PaymentType, TriggerType};
use crate::types::DbId;

/// Tolerance applied when comparing an amount against the remaining budget,
/// absorbing floating-point drift.
pub const BUDGET_TOLERANCE: f64 = 0.01;

/// The allocation-relevant slice of a stored milestone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationEntry {
    pub id: DbId,
    pub payment_type: PaymentType,
    pub payment_trigger_type: Option<TriggerType>,
    pub payment_trigger_value: Option<f64>,
}

impl From<&MilestoneState> for AllocationEntry {
    fn from(state: &MilestoneState) -> Self {
        Self {
            id: state.id,
            payment_type: state.payment_type,
            payment_trigger_type: state.payment_trigger_type,
            payment_trigger_value: state.payment_trigger_value,
        }
    }
}

/// Allocated and remaining budget for a project, both rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AllocationSummary {
    pub total_allocated: f64,
    pub remaining_amount: f64,
}

/// Round to two decimal places.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The amount a milestone claims from the project value.
///
/// A percentage trigger is always a share of `project_value`, whatever the
/// payment type. A fixed-amount trigger, or an unconditional payment with no
/// trigger type recorded, claims the value directly. Missing or non-finite
/// values count as zero.
pub fn effective_amount(
    payment_type: PaymentType,
    trigger_type: Option<TriggerType>,
    trigger_value: Option<f64>,
    project_value: f64,
) -> f64 {
    let value = trigger_value.filter(|v| v.is_finite()).unwrap_or(0.0);
    match (trigger_type, payment_type) {
        (Some(TriggerType::Percentage), _) => value / 100.0 * project_value,
        (Some(TriggerType::FixedAmount), _) | (None, PaymentType::Unconditional) => value,
        (None, PaymentType::Conditional) => 0.0,
    }
}

/// Sum the effective amounts of `milestones` (skipping `exclude_id`) and
/// derive the remaining budget.
///
/// `remaining_amount` is floored at zero; both figures are rounded to cents
/// so repeated recomputation is stable.
pub fn calculate_remaining(
    milestones: &[AllocationEntry],
    project_value: f64,
    exclude_id: Option<DbId>,
) -> AllocationSummary {
    let total: f64 = milestones
        .iter()
        .filter(|m| Some(m.id) != exclude_id)
        .map(|m| {
            effective_amount(
                m.payment_type,
                m.payment_trigger_type,
                m.payment_trigger_value,
                project_value,
            )
        })
        .sum();

    let total_allocated = round_to_cents(total);
    let remaining_amount = round_to_cents(project_value - total_allocated).max(0.0);

    AllocationSummary {
        total_allocated,
        remaining_amount,
    }
}

/// Whether `amount` overflows `remaining`, allowing [`BUDGET_TOLERANCE`].
pub fn exceeds_remaining(amount: f64, remaining: f64) -> bool {
    amount > remaining + BUDGET_TOLERANCE
}
