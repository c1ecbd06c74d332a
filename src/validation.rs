// src/validation.rs
use crate::models::Userprofile;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field \"userId\" is missing")]
    MissingUserId,
    #[error("Field \"email\" is missing")]
    MissingEmail,
    #[error("Field \"expectedReturn\" is missing")]
    MissingExpectedReturn,
    #[error("Field \"defaultExpectation\" is missing")]
    MissingDefaultExpectation,
    #[error("Field \"stock\" from \"expectations\" is missing")]
    MissingStock,
    #[error("Field \"expectedRaise\" from \"expectations\" is missing")]
    MissingExpectedRaise,
}

/// Checks the required fields of `up` in order and returns the first one
/// that is missing.
pub fn validate_fields(up: &Userprofile) -> Result<(), ValidationError> {
    if is_empty(&up.user_id) {
        return Err(ValidationError::MissingUserId);
    }
    if is_empty(&up.email) {
        return Err(ValidationError::MissingEmail);
    }
    if up.expected_return.is_none() {
        return Err(ValidationError::MissingExpectedReturn);
    }
    if up.default_expectation.is_none() {
        return Err(ValidationError::MissingDefaultExpectation);
    }

    for exp in &up.expectations {
        if is_empty(&exp.stock) {
            return Err(ValidationError::MissingStock);
        }
        if exp.expected_raise.is_none() {
            return Err(ValidationError::MissingExpectedRaise);
        }
    }

    Ok(())
}

// A lone space counts as empty.
fn is_empty(s: &str) -> bool {
    s.is_empty() || s == " "
}
