use crate::error::ValidationError;
use crate::ids::ObjectId;

/// Minimum length of a course review, in characters.
pub const MIN_REVIEW_CHARS: usize = 15;

/// Input validation shared by every coordinator. Runs before any store access.
pub struct Validator;

impl Validator {
    /// Parse a catalog identifier.
    pub fn validate_id(id: &str) -> Result<ObjectId, ValidationError> {
        ObjectId::parse(id)
    }

    /// Rating must lie in [0, 5].
    pub fn validate_rating(value: f64) -> Result<(), ValidationError> {
        if value.is_nan() || !(0.0..=5.0).contains(&value) {
            return Err(ValidationError::RatingOutOfRange(value));
        }
        Ok(())
    }

    pub fn validate_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyField(field));
        }
        Ok(())
    }

    /// Minimal shape check: something on both sides of a single '@', no key separators
    /// and no control characters.
    pub fn validate_email(email: &str) -> Result<(), ValidationError> {
        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };
        if !valid || email.chars().any(|c| c.is_whitespace() || c.is_control() || c == ':') {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }
        Ok(())
    }

    pub fn validate_review(text: &str) -> Result<(), ValidationError> {
        let len = text.trim().chars().count();
        if len < MIN_REVIEW_CHARS {
            return Err(ValidationError::ReviewTooShort(len));
        }
        Ok(())
    }
}
