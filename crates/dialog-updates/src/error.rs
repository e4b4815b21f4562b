//! Error types for update computation.

use dialog_model::DialogError;
use thiserror::Error;

/// Errors raised while building or invoking updates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// The settings tree is misconfigured.
    #[error(transparent)]
    Build(#[from] DialogError),

    /// An invocation names a trigger that has no registered update.
    #[error("no update is registered for trigger {trigger}")]
    UnknownTrigger { trigger: String },
}

/// Result type alias for update operations.
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Errors raised by [`DeferredChoices`](crate::DeferredChoices).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeferredError {
    #[error("choices for '{key}' are already scheduled")]
    AlreadyScheduled { key: String },

    /// The result was taken before; each result can be read once.
    #[error("choices for '{key}' were already taken")]
    AlreadyConsumed { key: String },

    #[error("no choices scheduled for '{key}'")]
    UnknownKey { key: String },

    /// The worker ended without sending a result.
    #[error("computation of choices for '{key}' stopped without a result")]
    Disconnected { key: String },

    #[error("choices for '{key}' were not ready in time")]
    Timeout { key: String },
}
