use crate::milestone::validation::{BudgetExceeded, FieldViolation};
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// One or more form fields failed validation. Each violation names the
    /// offending field so the caller can highlight it.
    #[error("Validation failed for {} field(s)", .0.len())]
    FieldValidation(Vec<FieldViolation>),

    /// A milestone's payment allocation does not fit in the project's
    /// remaining budget.
    #[error("{0}")]
    BudgetExceeded(BudgetExceeded),
}
