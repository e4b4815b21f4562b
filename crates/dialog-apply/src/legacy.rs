//! Loading of settings stored in a deprecated layout.

use dialog_model::SettingsType;
use serde_json::Value;

use crate::error::MigrationFailure;

/// Converts previously stored settings of an older layout into the current one.
///
/// The reconciler consults the loader before using stored settings as the
/// previous state. A failing load is not fatal: leaves without a controlling
/// flow variable take the submitted values as usual, and flawed overrides fall
/// back to whatever valid value the raw stored layout still holds at their path.
pub trait LegacyLoader: Send + Sync {
    /// Whether `stored` is in a layout that needs converting.
    fn needs_migration(&self, settings_type: SettingsType, stored: &Value) -> bool;

    /// Convert `stored` into the current layout.
    fn load(&self, settings_type: SettingsType, stored: &Value) -> Result<Value, MigrationFailure>;
}
