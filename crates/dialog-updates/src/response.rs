//! Update protocol documents.
//!
//! ```json
//! {
//!   "initialUpdates": [
//!     { "scope": "#/properties/model/properties/out", "values": [{ "value": "x" }] }
//!   ],
//!   "globalUpdates": [
//!     { "trigger": { "scope": "#/properties/model/properties/first" },
//!       "dependencies": ["#/properties/model/properties/first"] },
//!     { "trigger": { "id": "after-open-dialog" }, "dependencies": [], "triggerInitially": true }
//!   ]
//! }
//! ```
//!
//! Both sections are omitted when empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::evaluate::ComputationFailure;

/// Trigger id of the after-open-dialog event.
pub const AFTER_OPEN_DIALOG_ID: &str = "after-open-dialog";

/// One computed value, with element indices when inside arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<usize>,
    pub value: Value,
}

/// Literal values of one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueUpdate {
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided_option_name: Option<String>,
    pub values: Vec<IndexedValue>,
}

/// Identifies a trigger: a field scope for value changes, an id otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerRef {
    Scope { scope: String },
    Id { id: String },
}

impl TriggerRef {
    pub fn scope(scope: impl Into<String>) -> Self {
        Self::Scope {
            scope: scope.into(),
        }
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id { id: id.into() }
    }
}

impl std::fmt::Display for TriggerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scope { scope } => write!(f, "scope '{scope}'"),
            Self::Id { id } => write!(f, "id '{id}'"),
        }
    }
}

/// Registered trigger for later recomputation by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalUpdate {
    pub trigger: TriggerRef,
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_initially: Option<bool>,
}

/// The `initialUpdates` / `globalUpdates` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_updates: Option<Vec<ValueUpdate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_updates: Option<Vec<GlobalUpdate>>,
}

impl UpdateResponse {
    pub fn new(initial: Vec<ValueUpdate>, global: Vec<GlobalUpdate>) -> Self {
        Self {
            initial_updates: (!initial.is_empty()).then_some(initial),
            global_updates: (!global.is_empty()).then_some(global),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.initial_updates.is_none() && self.global_updates.is_none()
    }

    pub fn initial(&self) -> &[ValueUpdate] {
        self.initial_updates.as_deref().unwrap_or_default()
    }

    pub fn global(&self) -> &[GlobalUpdate] {
        self.global_updates.as_deref().unwrap_or_default()
    }
}

/// Follow-up request sent by the front end when a global trigger fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerInvocation {
    pub trigger: TriggerRef,
    /// Element indices of the triggering field, outermost first.
    #[serde(default)]
    pub indices: Vec<usize>,
    /// Current dialog data.
    pub data: Value,
}

/// Result of a trigger invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerResult {
    pub updates: Vec<ValueUpdate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ComputationFailure>,
}

/// Initial response together with failures of the eager computations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateReport {
    #[serde(flatten)]
    pub response: UpdateResponse,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ComputationFailure>,
}
