//! Dialog service.
//!
//! Every request builds a fresh field index, dependency graph and schedule
//! from the settings tree and the context of that request. Nothing computed
//! for one request is reused by another.

use std::collections::BTreeMap;

use dialog_apply::{
    ApplyOptions, ApplyRequest, ApplyResponse, ApplyResult, FlowVariableSetting, NodeSettingsStore,
    PersistedSettings, Reconciler,
};
use dialog_effects::{ConditionCompiler, PredicateEvaluator, UiSchemaBuilder, UsageSite};
use dialog_model::{
    EffectKind, FieldIndex, FlowVariables, NodeContext, Predicate, PredicateInitializer,
    ProviderRegistry, ReferenceResolver, SettingsTree, TreeDescriptor,
};
use dialog_updates::{TriggerInvocation, TriggerResult, UpdateEngine, UpdateOptions, UpdateReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info_span};

use crate::error::{Result, ServiceError};

/// Everything a front end needs to render a dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogDescription {
    pub data: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flow_variable_settings: BTreeMap<String, FlowVariableSetting>,
    #[serde(rename = "ui_schema")]
    pub ui_schema: Value,
    #[serde(flatten)]
    pub updates: UpdateReport,
}

/// Evaluated effect of one field (or one array element's field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectState {
    /// Dotted data path of the affected setting.
    pub path: String,
    pub effect: EffectKind,
    /// Whether the effect's condition holds on the evaluated data.
    pub active: bool,
}

/// Dialog backend for one settings tree.
#[derive(Debug, Clone)]
pub struct DialogService {
    tree: SettingsTree,
    update_options: UpdateOptions,
    apply_options: ApplyOptions,
}

impl DialogService {
    pub fn new(tree: SettingsTree) -> Self {
        Self {
            tree,
            update_options: UpdateOptions::default(),
            apply_options: ApplyOptions::default(),
        }
    }

    /// Build the tree of a descriptor with the providers of `registry`.
    pub fn from_descriptor(descriptor: &TreeDescriptor, registry: &ProviderRegistry) -> Result<Self> {
        Ok(Self::new(descriptor.build(registry)?))
    }

    #[must_use]
    pub fn with_update_options(mut self, options: UpdateOptions) -> Self {
        self.update_options = options;
        self
    }

    #[must_use]
    pub fn with_apply_options(mut self, options: ApplyOptions) -> Self {
        self.apply_options = options;
        self
    }

    pub fn tree(&self) -> &SettingsTree {
        &self.tree
    }

    /// Dialog data for stored settings; settings types without stored data
    /// start from their defaults.
    pub fn initial_data(&self, persisted: &PersistedSettings) -> Value {
        let mut data = self.tree.default_data();
        if let Value::Object(map) = &mut data {
            for settings_type in self.tree.settings_types() {
                if let Some(stored) = persisted.settings(settings_type) {
                    map.insert(settings_type.config_key().to_string(), stored.clone());
                }
            }
        }
        data
    }

    /// Describe the dialog: data, layout, initial and global updates.
    pub fn describe(
        &self,
        persisted: &PersistedSettings,
        context: Option<&NodeContext>,
    ) -> Result<DialogDescription> {
        let _span = info_span!("describe_dialog").entered();
        let data = self.initial_data(persisted);
        let engine = UpdateEngine::build(&self.tree, context, &self.update_options)?;
        let ui_schema = UiSchemaBuilder::new(engine.index(), engine.resolver(), context).build()?;
        let updates = engine.initial_response(&data);
        debug!(
            initial = updates.response.initial().len(),
            global = updates.response.global().len(),
            failures = updates.failures.len(),
            "described dialog"
        );
        Ok(DialogDescription {
            data,
            flow_variable_settings: persisted.flow_variable_settings(),
            ui_schema,
            updates,
        })
    }

    /// Answer a global-update trigger sent by the front end.
    pub fn invoke_trigger(
        &self,
        invocation: &TriggerInvocation,
        context: Option<&NodeContext>,
    ) -> Result<TriggerResult> {
        let engine = UpdateEngine::build(&self.tree, context, &self.update_options)?;
        Ok(engine.invoke(invocation)?)
    }

    /// Settings store configured with this service's apply options.
    pub fn store(&self, persisted: PersistedSettings) -> NodeSettingsStore {
        NodeSettingsStore::from_persisted(persisted).with_options(self.apply_options.clone())
    }

    /// Apply a submission to `store`.
    pub fn apply(
        &self,
        store: &mut NodeSettingsStore,
        request: &ApplyRequest,
        context: Option<&NodeContext>,
    ) -> ApplyResponse {
        store.apply(&self.tree, request, context)
    }

    /// Reconcile a submission without persisting it, keeping the per-leaf decisions.
    pub fn reconcile(
        &self,
        previous: &PersistedSettings,
        request: &ApplyRequest,
        variables: &FlowVariables,
    ) -> Result<ApplyResult> {
        Ok(Reconciler::new(&self.tree)
            .with_options(self.apply_options.clone())
            .reconcile(previous, request, variables)?)
    }

    /// Compile `predicate` as if it were declared on the field with `scope`.
    pub fn condition(&self, predicate: &Predicate, scope: &str) -> Result<Value> {
        let index = FieldIndex::build(&self.tree);
        let resolver = ReferenceResolver::new(&index);
        let entry = index.by_scope(scope).ok_or_else(|| ServiceError::UnknownScope {
            scope: scope.to_string(),
        })?;
        Ok(ConditionCompiler::new(&index, &resolver).compile(predicate, UsageSite::of(entry))?)
    }

    /// Evaluate every field effect on `data`, once per array element.
    pub fn effect_states(&self, data: &Value, context: Option<&NodeContext>) -> Result<Vec<EffectState>> {
        let index = FieldIndex::build(&self.tree);
        let resolver = ReferenceResolver::new(&index);
        let evaluator = PredicateEvaluator::new(&index, &resolver);
        let initializer = PredicateInitializer::new(&resolver, context);
        let mut states = Vec::new();
        for entry in index.entries() {
            let Some(effect) = &entry.node.effect else {
                continue;
            };
            let predicate = effect.provider.init(&initializer);
            for tuple in index.index_tuples(entry.id, &[], data) {
                let Some(path) = index.data_path(entry.id, &tuple) else {
                    continue;
                };
                states.push(EffectState {
                    path: path.to_dotted(),
                    effect: effect.kind,
                    active: evaluator.evaluate(&predicate, data, UsageSite::of(entry), &tuple)?,
                });
            }
        }
        Ok(states)
    }
}
