//! Node-level settings store.

use std::sync::Arc;

use dialog_model::{FlowVariables, NodeContext, SettingsTree};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::legacy::LegacyLoader;
use crate::options::ApplyOptions;
use crate::reconciler::Reconciler;
use crate::settings::{ApplyRequest, PersistedSettings};

/// Answer returned to the dialog after an apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warning_messages: Vec<String>,
}

impl ApplyResponse {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Persisted settings of one node and whether its output is current.
#[derive(Clone, Default)]
pub struct NodeSettingsStore {
    persisted: PersistedSettings,
    executed: bool,
    options: ApplyOptions,
    loader: Option<Arc<dyn LegacyLoader>>,
}

impl NodeSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from settings stored earlier.
    pub fn from_persisted(persisted: PersistedSettings) -> Self {
        Self {
            persisted,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ApplyOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn LegacyLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn persisted(&self) -> &PersistedSettings {
        &self.persisted
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn mark_executed(&mut self) {
        self.executed = true;
    }

    /// Reconcile and persist a submission.
    ///
    /// A failed apply leaves both the stored settings and the executed state
    /// untouched. A successful one resets the node when the settings changed
    /// or could not be applied as submitted.
    pub fn apply(
        &mut self,
        tree: &SettingsTree,
        request: &ApplyRequest,
        context: Option<&NodeContext>,
    ) -> ApplyResponse {
        let _span = info_span!("apply_settings").entered();
        let empty = FlowVariables::new();
        let variables = context.map_or(&empty, |ctx| &ctx.flow_variables);
        let reconciler = Reconciler::new(tree)
            .with_options(self.options.clone())
            .with_loader(self.loader.clone());

        match reconciler.reconcile(&self.persisted, request, variables) {
            Ok(result) => {
                if result.reset_required {
                    self.executed = false;
                }
                self.persisted = result.settings;
                info!(
                    reset = result.reset_required,
                    warnings = result.warnings.len(),
                    "applied settings"
                );
                ApplyResponse {
                    error: None,
                    warning_messages: result.warnings,
                }
            }
            Err(error) => {
                info!(%error, "rejected settings");
                ApplyResponse {
                    error: Some(error.user_message()),
                    warning_messages: Vec::new(),
                }
            }
        }
    }
}

impl std::fmt::Debug for NodeSettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSettingsStore")
            .field("persisted", &self.persisted)
            .field("executed", &self.executed)
            .field("options", &self.options)
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}
