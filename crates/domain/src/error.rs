//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`RuleHubError`] via `#[from]`.

/// Top-level domain error.
#[derive(Debug, thiserror::Error)]
pub enum RuleHubError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),
}

/// A domain invariant was violated while constructing a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("identifier must not be empty")]
    EmptyId,

    #[error("name must not be empty")]
    EmptyName,

    #[error("device {device_id} does not accept commands")]
    NotCommandable { device_id: String },

    #[error("unsupported command payload: {0}")]
    InvalidCommand(String),
}

/// A referenced item does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_rulehub_error() {
        let err: RuleHubError = ValidationError::EmptyName.into();
        assert!(matches!(
            err,
            RuleHubError::Validation(ValidationError::EmptyName)
        ));
    }

    #[test]
    fn should_display_not_found_error_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Device",
            id: "light-1".to_string(),
        };
        assert_eq!(err.to_string(), "Device light-1 not found");
    }
}
