//! Configuration options for applying settings.

use serde::{Deserialize, Serialize};

/// Options controlling reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOptions {
    /// Ignore flow-variable settings whose path addresses no setting.
    /// Default: true. When false, such paths fail the apply.
    pub ignore_unknown_variable_paths: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            ignore_unknown_variable_paths: true,
        }
    }
}

impl ApplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ignore_unknown_variable_paths(mut self, ignore: bool) -> Self {
        self.ignore_unknown_variable_paths = ignore;
        self
    }
}
