//! Crate-level error type.
//!
//! Each layer reports its own error enum; [`Error`] wraps them so the
//! [`Planner`](crate::planner::Planner) facade can return a single type.

use crate::config::ConfigError;
use crate::models::AvailabilityError;
use crate::repository::RepositoryError;
use crate::solver::ImportError;
use crate::timeslots::DiscretizeError;
use crate::validation::ValidationError;

/// Result alias used by the facade.
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure of a planning operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Interval algebra precondition broken.
    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    /// Timeslot discretization failed.
    #[error(transparent)]
    Discretize(#[from] DiscretizeError),

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Solver result rejected.
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Planning data failed integrity checks.
    #[error("planning data is invalid: {}", summarize(.0))]
    Validation(Vec<ValidationError>),

    /// Document (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Vec<ValidationError>> for Error {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_validation_message_joins_errors() {
        let err = Error::from(vec![
            ValidationError::new(ValidationErrorKind::DanglingReference, "slot 1: unknown AK 9"),
            ValidationError::new(ValidationErrorKind::CyclicPrerequisite, "cycle through AK 2"),
        ]);
        assert_eq!(
            err.to_string(),
            "planning data is invalid: slot 1: unknown AK 9; cycle through AK 2"
        );
    }

    #[test]
    fn test_repository_error_is_transparent() {
        let err: Error = RepositoryError::not_found("slot", 3).into();
        assert_eq!(err.to_string(), "slot 3 not found");
    }
}
