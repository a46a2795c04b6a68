//! Milestone payment allocation.
//!
//! A milestone is one payment checkpoint in a project. This module holds the
//! shared vocabulary (payment type, trigger type, statuses), the form values a
//! client submits, and the last-known persisted state used when editing or
//! rescheduling. The rules live in the submodules:
//!
//! - [`allocation`]: effective amounts and remaining budget
//! - [`validation`]: field-level and budget checks before submission
//! - [`mapping`]: form values to the persisted record, and reschedules
//! - [`form_state`]: modal state and the payment-type reducer
//! - [`progress`]: the ephemeral progress cache

pub mod allocation;
pub mod form_state;
pub mod mapping;
pub mod progress;
pub mod validation;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::assignees::AssigneeSet;
use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Implements `as_str`, `Display`, `FromStr` and `TryFrom<String>` for a
/// fieldless enum using its wire strings.
macro_rules! wire_enum {
    ($name:ident, $label:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The string stored in the database and sent over the wire.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(CoreError::Validation(format!(
                        "Unknown {}: '{other}'",
                        $label
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

/// Whether a milestone's payment depends on a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Conditional,
    /// Advance payment: always completed and fully paid.
    Unconditional,
}

wire_enum!(PaymentType, "payment type" {
    Conditional => "conditional",
    Unconditional => "unconditional",
});

/// When a conditional payment may be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRequestStage {
    DuringProgress,
    OnCompletion,
}

wire_enum!(PaymentRequestStage, "payment request stage" {
    DuringProgress => "during_progress",
    OnCompletion => "on_completion",
});

/// How `payment_trigger_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerType {
    /// Percentage (0-100) of the project value.
    #[serde(rename = "%")]
    Percentage,
    /// Absolute currency amount.
    #[serde(rename = "fixed_amount")]
    FixedAmount,
}

wire_enum!(TriggerType, "payment trigger type" {
    Percentage => "%",
    FixedAmount => "fixed_amount",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MilestoneStatus {
    #[default]
    Pending,
    Completed,
}

wire_enum!(MilestoneStatus, "milestone status" {
    Pending => "Pending",
    Completed => "Completed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "Fully Paid")]
    FullyPaid,
}

wire_enum!(PaymentStatus, "payment status" {
    NotStarted => "Not Started",
    FullyPaid => "Fully Paid",
});

// ---------------------------------------------------------------------------
// Form values and persisted state
// ---------------------------------------------------------------------------

/// Values submitted from the milestone form for a create or edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub assigned_to: AssigneeSet,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub payment_request_stage: Option<PaymentRequestStage>,
    #[serde(default)]
    pub payment_trigger_type: Option<TriggerType>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub payment_trigger_value: Option<f64>,
    /// The "mark as completed" toggle. Ignored for unconditional payments.
    #[serde(default)]
    pub mark_as_completed: bool,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    /// Opt-in flag that enables rescheduling this milestone.
    #[serde(default)]
    pub reset_due_on_fail: bool,
    #[serde(default)]
    pub progress: Option<i16>,
}

impl MilestoneForm {
    /// An empty conditional form, as shown when the create modal opens.
    pub fn blank() -> Self {
        Self {
            title: String::new(),
            description: None,
            due_date: None,
            assigned_to: AssigneeSet::new(),
            payment_type: PaymentType::Conditional,
            payment_request_stage: Some(PaymentRequestStage::DuringProgress),
            payment_trigger_type: Some(TriggerType::Percentage),
            payment_trigger_value: None,
            mark_as_completed: false,
            payment_status: Some(PaymentStatus::NotStarted),
            reset_due_on_fail: false,
            progress: None,
        }
    }
}

/// The last-known persisted state of a milestone.
///
/// Used as the "initial values" when editing and as the base for a
/// reschedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneState {
    pub id: DbId,
    pub due_date: NaiveDate,
    pub payment_type: PaymentType,
    pub payment_trigger_type: Option<TriggerType>,
    pub payment_trigger_value: Option<f64>,
    pub status: MilestoneStatus,
    pub payment_status: PaymentStatus,
    pub progress: i16,
    pub reschedule_count: i32,
    pub reset_due_on_fail: bool,
}

/// A reschedule request: a new due date and the reason for moving it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RescheduleRequest {
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub reschedule_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Lenient amounts
// ---------------------------------------------------------------------------

/// Read a numeric amount from a JSON value.
///
/// Numbers and numeric strings are accepted; anything else (including
/// non-finite values) yields `None`.
pub fn amount_from_value(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    amount.filter(|v| v.is_finite())
}

/// Serde adapter for amount fields that may arrive as numbers, numeric
/// strings, or garbage.
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(amount_from_value))
}
