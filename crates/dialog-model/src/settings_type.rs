use std::fmt;

use serde::{Deserialize, Serialize};

/// The settings sections a dialog edits.
///
/// Declaration order is significant: model settings are walked (and their
/// updates emitted) before view settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsType {
    Model,
    View,
}

impl SettingsType {
    pub const ALL: [SettingsType; 2] = [SettingsType::Model, SettingsType::View];

    /// Key of this section in dialog data and persisted settings.
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::View => "view",
        }
    }

    /// Key of the parallel flow-variable tree in persisted settings.
    pub fn variables_key(&self) -> &'static str {
        match self {
            Self::Model => "variables",
            Self::View => "view_variables",
        }
    }

    pub fn from_config_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.config_key() == key)
    }
}

impl fmt::Display for SettingsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}
