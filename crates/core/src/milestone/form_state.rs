//! Milestone form state: which modal is open, and the payment-type reducer.

use super::{MilestoneForm, PaymentRequestStage, PaymentStatus, PaymentType, TriggerType};

/// What an open milestone modal is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
    Reschedule,
}

/// Visibility of the milestone modal.
///
/// At most one modal is open at a time, and an edit or reschedule modal always
/// carries the milestone it operates on.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalState<T> {
    Closed,
    Open { mode: FormMode, data: Option<T> },
}

impl<T> Default for ModalState<T> {
    fn default() -> Self {
        Self::Closed
    }
}

impl<T> ModalState<T> {
    pub fn open_create() -> Self {
        Self::Open {
            mode: FormMode::Create,
            data: None,
        }
    }

    pub fn open_edit(data: T) -> Self {
        Self::Open {
            mode: FormMode::Edit,
            data: Some(data),
        }
    }

    pub fn open_reschedule(data: T) -> Self {
        Self::Open {
            mode: FormMode::Reschedule,
            data: Some(data),
        }
    }

    /// Close the modal, returning the data it held.
    pub fn close(&mut self) -> Option<T> {
        match std::mem::replace(self, Self::Closed) {
            Self::Open { data, .. } => data,
            Self::Closed => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn mode(&self) -> Option<FormMode> {
        match self {
            Self::Open { mode, .. } => Some(*mode),
            Self::Closed => None,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Open { data, .. } => data.as_ref(),
            Self::Closed => None,
        }
    }
}

/// Apply a change of payment type to the form, with its couplings.
///
/// Unconditional payments are complete and fully paid with no request stage.
/// Switching back to conditional reopens the milestone and defaults the
/// request stage. The trigger type is kept, defaulting to a percentage.
pub fn apply_payment_type_change(mut state: MilestoneForm, new_type: PaymentType) -> MilestoneForm {
    state.payment_type = new_type;
    state.payment_trigger_type.get_or_insert(TriggerType::Percentage);

    match new_type {
        PaymentType::Unconditional => {
            state.mark_as_completed = true;
            state.payment_status = Some(PaymentStatus::FullyPaid);
            state.payment_request_stage = None;
        }
        PaymentType::Conditional => {
            state.mark_as_completed = false;
            state.payment_status = Some(PaymentStatus::NotStarted);
            state
                .payment_request_stage
                .get_or_insert(PaymentRequestStage::DuringProgress);
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modal_starts_closed() {
        let modal: ModalState<i64> = ModalState::default();
        assert!(!modal.is_open());
        assert_eq!(modal.mode(), None);
    }

    #[test]
    fn edit_modal_carries_its_milestone() {
        let modal = ModalState::open_edit(42_i64);
        assert_eq!(modal.mode(), Some(FormMode::Edit));
        assert_eq!(modal.data(), Some(&42));
    }

    #[test]
    fn opening_another_modal_replaces_the_first() {
        let mut modal = ModalState::open_edit(1_i64);
        assert_eq!(modal.mode(), Some(FormMode::Edit));
        modal = ModalState::open_reschedule(2);
        assert_eq!(modal.mode(), Some(FormMode::Reschedule));
        assert_eq!(modal.data(), Some(&2));
    }

    #[test]
    fn close_returns_data_and_resets() {
        let mut modal = ModalState::open_reschedule("m-7".to_string());
        assert_eq!(modal.close().as_deref(), Some("m-7"));
        assert_eq!(modal, ModalState::Closed);
        assert_eq!(modal.close(), None);
    }

    #[test]
    fn create_modal_has_no_data() {
        let modal: ModalState<i64> = ModalState::open_create();
        assert!(modal.is_open());
        assert_eq!(modal.data(), None);
    }

    #[test]
    fn switching_to_unconditional_completes_the_form() {
        let form = MilestoneForm::blank();
        let next = apply_payment_type_change(form, PaymentType::Unconditional);

        assert_eq!(next.payment_type, PaymentType::Unconditional);
        assert!(next.mark_as_completed);
        assert_eq!(next.payment_status, Some(PaymentStatus::FullyPaid));
        assert_eq!(next.payment_request_stage, None);
        assert_eq!(next.payment_trigger_type, Some(TriggerType::Percentage));
    }

    #[test]
    fn switching_back_to_conditional_reopens() {
        let mut form = MilestoneForm::blank();
        form.payment_trigger_type = Some(TriggerType::FixedAmount);
        let form = apply_payment_type_change(form, PaymentType::Unconditional);
        let next = apply_payment_type_change(form, PaymentType::Conditional);

        assert!(!next.mark_as_completed);
        assert_eq!(next.payment_status, Some(PaymentStatus::NotStarted));
        assert_eq!(
            next.payment_request_stage,
            Some(PaymentRequestStage::DuringProgress)
        );
        assert_eq!(next.payment_trigger_type, Some(TriggerType::FixedAmount));
    }

    #[test]
    fn missing_trigger_type_defaults_to_percentage() {
        let mut form = MilestoneForm::blank();
        form.payment_trigger_type = None;
        let next = apply_payment_type_change(form, PaymentType::Conditional);
        assert_eq!(next.payment_trigger_type, Some(TriggerType::Percentage));
    }
}
