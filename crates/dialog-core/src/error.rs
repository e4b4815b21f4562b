//! Service error types.

use dialog_apply::ApplyError;
use dialog_model::DialogError;
use dialog_updates::UpdateError;
use thiserror::Error;

/// Failure of a dialog service request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Dialog(#[from] DialogError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// No field is declared under the given scope.
    #[error("No setting with scope \"{scope}\"")]
    UnknownScope { scope: String },
}

impl ServiceError {
    /// The underlying configuration error, if any.
    pub fn dialog_error(&self) -> Option<&DialogError> {
        match self {
            Self::Dialog(error) | Self::Update(UpdateError::Build(error)) => Some(error),
            Self::Apply(ApplyError::Build(error)) => Some(error),
            _ => None,
        }
    }
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
