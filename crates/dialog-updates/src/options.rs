//! Configuration options for update computation.

use serde::{Deserialize, Serialize};

/// Options controlling how updates are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Drop the before-open trigger of every provider when the dialog is built
    /// without a node context.
    ///
    /// Default: true. Providers usually need the context to compute an initial
    /// value; those that don't can still check it themselves.
    pub skip_before_open_without_context: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            skip_before_open_without_context: true,
        }
    }
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_skip_before_open_without_context(mut self, skip: bool) -> Self {
        self.skip_before_open_without_context = skip;
        self
    }
}
