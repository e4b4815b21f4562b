//! Applying dialog submissions to node settings.
//!
//! - **reconciler**: decides every leaf value from the submission, flow
//!   variables and the previously stored settings
//! - **store**: [`NodeSettingsStore`], persisting accepted settings and
//!   tracking whether the node must be re-executed
//! - **legacy**: hook for settings stored in a deprecated layout

pub mod error;
pub mod legacy;
pub mod options;
pub mod reconciler;
pub mod settings;
pub mod store;

pub use error::{ApplyError, MigrationFailure, Result};
pub use legacy::LegacyLoader;
pub use options::ApplyOptions;
pub use reconciler::{ApplyResult, LeafResolution, Reconciler, ValueSource};
pub use settings::{ApplyRequest, FlowVariableSetting, PersistedSettings, VariableEntry};
pub use store::{ApplyResponse, NodeSettingsStore};
