//! Raw input validation.

use crate::errors::ValidationError;

/// Raw input that can be checked before a pipeline run starts.
///
/// A run whose input fails validation is suppressed: no token is minted,
/// the state is untouched and no resolver is invoked.
pub trait Validate {
    /// Checks that the input is present and well-formed.
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for String {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.trim().is_empty() {
            return Err(ValidationError::empty("input"));
        }
        Ok(())
    }
}
