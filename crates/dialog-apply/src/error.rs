//! Apply error types.
//!
//! Every variant aborts the apply: nothing is persisted and the node keeps
//! its previous executed state.

use dialog_common::DocumentError;
use dialog_model::DialogError;
use thiserror::Error;

/// Fatal apply failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// A submitted value fails validation and no flow variable overrides it.
    #[error("Invalid value for \"{path}\": {reason}")]
    InvalidValue { path: String, reason: String },

    /// Submitted data contains a settings type the dialog does not have.
    #[error("Unknown settings type \"{key}\"")]
    UnknownSettingsType { key: String },

    /// A flow-variable setting addresses no setting.
    #[error("Flow variable settings refer to unknown setting \"{path}\"")]
    UnknownFlowVariablePath { path: String },

    /// Submitted data does not have the shape of the settings.
    #[error("Malformed settings data: {0}")]
    Document(#[from] DocumentError),

    /// The settings tree itself is misconfigured.
    #[error(transparent)]
    Build(#[from] DialogError),
}

impl ApplyError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidValue { path, reason } => {
                format!("The setting \"{path}\" has an invalid value: {reason}. Settings were not applied.")
            }
            other => format!("{other}. Settings were not applied."),
        }
    }
}

/// Result type alias for apply operations.
pub type Result<T> = std::result::Result<T, ApplyError>;

/// Raised by a [`LegacyLoader`](crate::LegacyLoader) that cannot read stored settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct MigrationFailure {
    pub message: String,
}

impl MigrationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
