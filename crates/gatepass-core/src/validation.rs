//! Validation utilities.

use crate::{FieldError, GatepassError};
use validator::{Validate, ValidationErrors};

/// Extension trait for validation.
pub trait ValidateExt: Validate {
    /// Validates the struct and returns a `GatepassError` on failure.
    fn validate_request(&self) -> Result<(), GatepassError> {
        self.validate().map_err(validation_errors_to_gatepass_error)
    }
}

impl<T: Validate> ValidateExt for T {}

/// Flattens `validator::ValidationErrors` into field errors.
#[must_use]
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: (*field).to_string(),
                message: error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string),
                code: error.code.to_string(),
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

/// Converts `validator::ValidationErrors` to `GatepassError`.
#[must_use]
pub fn validation_errors_to_gatepass_error(errors: ValidationErrors) -> GatepassError {
    let message = field_errors(&errors)
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ");

    GatepassError::Validation(message)
}

/// Common validation functions.
pub mod rules {
    use validator::ValidationError;

    /// Validates that a string is not blank (not empty after trimming).
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("not_blank"));
        }
        Ok(())
    }

    /// Validates a phone number: digits with an optional leading `+`.
    pub fn valid_phone(phone: &str) -> Result<(), ValidationError> {
        let digits = phone.strip_prefix('+').unwrap_or(phone);
        if digits.is_empty() || digits.len() > 20 {
            return Err(ValidationError::new("phone_length"));
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::new("phone_invalid_characters"));
        }
        Ok(())
    }

    /// Validates an externally assigned user id.
    pub fn valid_user_id(id: &str) -> Result<(), ValidationError> {
        if id.is_empty() || id.len() > 64 {
            return Err(ValidationError::new("user_id_length"));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::new("user_id_invalid_characters"));
        }
        Ok(())
    }
}
