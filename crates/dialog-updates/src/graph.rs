//! Dependency graph construction.
//!
//! Every state provider of the tree is initialized against a recording
//! initializer that notes its triggers and dependencies without computing
//! anything. The graph then links value providers to the providers that
//! react to the field they write, and orders all providers topologically.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use dialog_model::{
    DialogError, FieldId, FieldIndex, NodeContext, ProviderTarget, Reference, ReferenceResolver,
    StateProvider, StateProviderInitializer,
};
use tracing::{debug, warn};

use crate::error::Result;
use crate::options::UpdateOptions;

/// Position of a provider in the graph; providers are numbered in tree order.
pub type ProviderId = usize;

/// When a provider (re)computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Trigger {
    BeforeOpenDialog,
    AfterOpenDialog,
    ValueChange(FieldId),
    ButtonClick(FieldId),
}

/// How a dependency value is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyMode {
    /// Read at trigger time; a change also re-triggers the provider.
    ComputeFromValueSupplier,
    /// Read lazily; changes do not re-trigger.
    GetValueSupplier,
}

/// A value read by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub field: FieldId,
    pub reference: Reference,
    pub mode: SupplyMode,
}

/// A provider with its recorded declarations.
#[derive(Clone)]
pub struct ProviderNode {
    pub id: ProviderId,
    /// Field carrying the provider.
    pub field: FieldId,
    pub target: ProviderTarget,
    pub provider: Arc<dyn StateProvider>,
    pub triggers: Vec<Trigger>,
    pub dependencies: Vec<Dependency>,
}

impl std::fmt::Debug for ProviderNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderNode")
            .field("id", &self.id)
            .field("field", &self.field)
            .field("target", &self.target)
            .field("provider", &self.provider.name())
            .field("triggers", &self.triggers)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

impl ProviderNode {
    pub fn writes_value(&self) -> bool {
        self.target == ProviderTarget::Value
    }

    pub fn is_before_open(&self) -> bool {
        self.triggers.contains(&Trigger::BeforeOpenDialog)
    }
}

struct RecordingInitializer<'a, 't> {
    index: &'a FieldIndex<'t>,
    resolver: &'a ReferenceResolver,
    context: Option<&'a NodeContext>,
    usage_site: String,
    triggers: Vec<Trigger>,
    dependencies: Vec<Dependency>,
    error: Option<DialogError>,
}

impl RecordingInitializer<'_, '_> {
    fn resolve(&mut self, reference: &Reference) -> Option<FieldId> {
        if self.error.is_some() {
            return None;
        }
        match self.resolver.resolve(reference, &self.usage_site) {
            Ok(field) => Some(field),
            Err(error) => {
                self.error = Some(error);
                None
            }
        }
    }

    fn trigger(&mut self, trigger: Trigger) {
        if !self.triggers.contains(&trigger) {
            self.triggers.push(trigger);
        }
    }

    fn dependency(&mut self, field: FieldId, reference: &Reference, mode: SupplyMode) {
        match self.dependencies.iter_mut().find(|d| d.field == field) {
            Some(existing) => {
                if mode == SupplyMode::ComputeFromValueSupplier {
                    existing.mode = mode;
                }
            }
            None => self.dependencies.push(Dependency {
                field,
                reference: reference.clone(),
                mode,
            }),
        }
    }
}

impl StateProviderInitializer for RecordingInitializer<'_, '_> {
    fn compute_before_open_dialog(&mut self) {
        self.trigger(Trigger::BeforeOpenDialog);
    }

    fn compute_after_open_dialog(&mut self) {
        self.trigger(Trigger::AfterOpenDialog);
    }

    fn compute_on_value_change(&mut self, reference: &Reference) {
        if let Some(field) = self.resolve(reference) {
            self.trigger(Trigger::ValueChange(field));
        }
    }

    fn compute_on_button_click(&mut self, reference: &Reference) {
        if let Some(field) = self.resolve(reference) {
            let is_button = self.index.get(field).is_some_and(|e| e.node.is_button());
            if is_button {
                self.trigger(Trigger::ButtonClick(field));
            } else {
                self.error = Some(DialogError::TypeMismatch {
                    reference: reference.to_string(),
                    expected: "Button".to_string(),
                    actual: reference.value_type.to_string(),
                    usage_site: self.usage_site.clone(),
                });
            }
        }
    }

    fn get_value_supplier(&mut self, reference: &Reference) {
        if let Some(field) = self.resolve(reference) {
            self.dependency(field, reference, SupplyMode::GetValueSupplier);
        }
    }

    fn compute_from_value_supplier(&mut self, reference: &Reference) {
        if let Some(field) = self.resolve(reference) {
            self.dependency(field, reference, SupplyMode::ComputeFromValueSupplier);
            self.trigger(Trigger::ValueChange(field));
        }
    }

    fn context(&self) -> Option<&NodeContext> {
        self.context
    }
}

/// Providers of a settings tree with their triggers, dependencies and order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    providers: Vec<ProviderNode>,
    /// Providers re-triggered when the value written by a provider changes.
    downstream: Vec<Vec<ProviderId>>,
    order: Vec<ProviderId>,
}

impl DependencyGraph {
    pub fn build(
        index: &FieldIndex<'_>,
        resolver: &ReferenceResolver,
        context: Option<&NodeContext>,
        options: &UpdateOptions,
    ) -> Result<Self> {
        let mut providers = Vec::new();
        for entry in index.entries() {
            for binding in &entry.node.providers {
                let usage_site = entry.display_path();
                let mut recorder = RecordingInitializer {
                    index,
                    resolver,
                    context,
                    usage_site: usage_site.clone(),
                    triggers: Vec::new(),
                    dependencies: Vec::new(),
                    error: None,
                };
                binding.provider.init(&mut recorder);
                if let Some(error) = recorder.error {
                    return Err(error.into());
                }

                if binding.target == ProviderTarget::Value
                    && let Some(output) = binding.provider.output_type()
                    && output != entry.value_type()
                {
                    return Err(DialogError::ProviderOutputMismatch {
                        provider: binding.provider.name().to_string(),
                        expected: entry.value_type().to_string(),
                        actual: output.to_string(),
                        usage_site,
                    }
                    .into());
                }

                let mut triggers = recorder.triggers;
                if context.is_none() && options.skip_before_open_without_context {
                    triggers.retain(|t| *t != Trigger::BeforeOpenDialog);
                }
                if triggers.is_empty() {
                    warn!(
                        provider = binding.provider.name(),
                        field = %usage_site,
                        "state provider declares no trigger and is never computed"
                    );
                    continue;
                }

                debug!(
                    provider = binding.provider.name(),
                    field = %usage_site,
                    triggers = ?triggers,
                    dependencies = recorder.dependencies.len(),
                    "registered state provider"
                );
                providers.push(ProviderNode {
                    id: providers.len(),
                    field: entry.id,
                    target: binding.target.clone(),
                    provider: Arc::clone(&binding.provider),
                    triggers,
                    dependencies: recorder.dependencies,
                });
            }
        }

        let downstream = link(&providers);
        let order = topological_order(&providers, &downstream, index)?;
        Ok(Self {
            providers,
            downstream,
            order,
        })
    }

    pub fn providers(&self) -> &[ProviderNode] {
        &self.providers
    }

    pub fn provider(&self, id: ProviderId) -> Option<&ProviderNode> {
        self.providers.get(id)
    }

    pub fn downstream(&self, id: ProviderId) -> &[ProviderId] {
        self.downstream.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// All providers in dependency order, ties broken by tree order.
    pub fn order(&self) -> &[ProviderId] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// `seeds` plus every provider reachable from them, in dependency order.
    pub fn closure(&self, seeds: impl IntoIterator<Item = ProviderId>) -> Vec<ProviderId> {
        let mut reached = BTreeSet::new();
        let mut stack: Vec<ProviderId> = seeds.into_iter().collect();
        while let Some(id) = stack.pop() {
            if reached.insert(id) {
                stack.extend(self.downstream(id).iter().copied());
            }
        }
        self.order
            .iter()
            .copied()
            .filter(|id| reached.contains(id))
            .collect()
    }

    /// Providers reacting directly to `trigger`, in tree order.
    pub fn triggered_by(&self, trigger: Trigger) -> Vec<ProviderId> {
        self.providers
            .iter()
            .filter(|p| p.triggers.contains(&trigger))
            .map(|p| p.id)
            .collect()
    }
}

fn link(providers: &[ProviderNode]) -> Vec<Vec<ProviderId>> {
    let mut writers: HashMap<FieldId, Vec<ProviderId>> = HashMap::new();
    for provider in providers.iter().filter(|p| p.writes_value()) {
        writers.entry(provider.field).or_default().push(provider.id);
    }
    let mut downstream = vec![Vec::new(); providers.len()];
    for provider in providers {
        for trigger in &provider.triggers {
            if let Trigger::ValueChange(field) = trigger
                && let Some(sources) = writers.get(field)
            {
                for source in sources {
                    if !downstream[*source].contains(&provider.id) {
                        downstream[*source].push(provider.id);
                    }
                }
            }
        }
    }
    downstream
}

/// Kahn's algorithm; ready providers are taken lowest id first.
fn topological_order(
    providers: &[ProviderNode],
    downstream: &[Vec<ProviderId>],
    index: &FieldIndex<'_>,
) -> Result<Vec<ProviderId>> {
    let mut incoming = vec![0usize; providers.len()];
    for targets in downstream {
        for target in targets {
            incoming[*target] += 1;
        }
    }
    let mut ready: BTreeSet<ProviderId> = (0..providers.len()).filter(|id| incoming[*id] == 0).collect();
    let mut order = Vec::with_capacity(providers.len());
    while let Some(id) = ready.pop_first() {
        order.push(id);
        for target in &downstream[id] {
            incoming[*target] -= 1;
            if incoming[*target] == 0 {
                ready.insert(*target);
            }
        }
    }
    if order.len() < providers.len() {
        let scopes: Vec<String> = providers
            .iter()
            .filter(|p| incoming[p.id] > 0)
            .filter_map(|p| index.get(p.field).map(|e| e.display_path()))
            .collect();
        return Err(DialogError::CyclicDependency {
            scopes: scopes.join(" -> "),
        }
        .into());
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use dialog_model::{
        SettingsGroup, SettingsNode, SettingsTree, SettingsType, StateComputationFailure,
        StateInputs, ValueType, state_provider,
    };
    use serde_json::Value;

    use super::*;

    const A: Reference = Reference::new("a", ValueType::String);
    const B: Reference = Reference::new("b", ValueType::String);

    fn copy_from(reference: Reference) -> Arc<dyn StateProvider> {
        let read = reference.clone();
        state_provider(
            format!("copy {}", reference.id()),
            move |init| init.compute_from_value_supplier(&reference),
            move |inputs| Ok(inputs.value(&read).cloned().unwrap_or(Value::Null)),
        )
    }

    fn build(tree: &SettingsTree) -> Result<DependencyGraph> {
        let index = FieldIndex::build(tree);
        let resolver = ReferenceResolver::new(&index);
        DependencyGraph::build(&index, &resolver, None, &UpdateOptions::default())
    }

    #[test]
    fn value_providers_form_chains() {
        let tree = SettingsTree::new().with(
            SettingsType::Model,
            SettingsGroup::new("S")
                .with_field(
                    SettingsNode::leaf("c", ValueType::String)
                        .with_value_provider(copy_from(B)),
                )
                .with_field(SettingsNode::leaf("a", ValueType::String).with_reference(A))
                .with_field(
                    SettingsNode::leaf("b", ValueType::String)
                        .with_reference(B)
                        .with_value_provider(copy_from(A)),
                ),
        );
        let graph = build(&tree).unwrap();
        assert_eq!(graph.providers().len(), 2);
        // provider 1 writes `b`, which provider 0 reads
        assert_eq!(graph.downstream(1), &[0]);
        assert_eq!(graph.order(), &[1, 0]);
        assert_eq!(graph.closure([1]), vec![1, 0]);
    }

    #[test]
    fn cycles_are_rejected() {
        let tree = SettingsTree::new().with(
            SettingsType::Model,
            SettingsGroup::new("S")
                .with_field(
                    SettingsNode::leaf("a", ValueType::String)
                        .with_reference(A)
                        .with_value_provider(copy_from(B)),
                )
                .with_field(
                    SettingsNode::leaf("b", ValueType::String)
                        .with_reference(B)
                        .with_value_provider(copy_from(A)),
                ),
        );
        let err = build(&tree).unwrap_err();
        assert_eq!(
            err,
            crate::UpdateError::Build(DialogError::CyclicDependency {
                scopes: "model.a -> model.b".to_string()
            })
        );
    }

    #[test]
    fn providers_without_triggers_are_dropped() {
        let lazy = state_provider(
            "lazy",
            |init| init.get_value_supplier(&A),
            |_| Ok(Value::Null),
        );
        let tree = SettingsTree::new().with(
            SettingsType::Model,
            SettingsGroup::new("S")
                .with_field(SettingsNode::leaf("a", ValueType::String).with_reference(A))
                .with_field(SettingsNode::leaf("b", ValueType::String).with_value_provider(lazy)),
        );
        assert!(build(&tree).unwrap().is_empty());
    }

    struct Fixed(ValueType);

    impl StateProvider for Fixed {
        fn init(&self, initializer: &mut dyn StateProviderInitializer) {
            initializer.compute_after_open_dialog();
        }

        fn compute(&self, _inputs: &StateInputs<'_>) -> std::result::Result<Value, StateComputationFailure> {
            Ok(Value::Null)
        }

        fn output_type(&self) -> Option<ValueType> {
            Some(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn provider_output_must_match_the_field_type() {
        let tree = SettingsTree::new().with(
            SettingsType::Model,
            SettingsGroup::new("S").with_field(
                SettingsNode::leaf("name", ValueType::String)
                    .with_value_provider(Arc::new(Fixed(ValueType::Boolean))),
            ),
        );
        assert_eq!(
            build(&tree).unwrap_err(),
            crate::UpdateError::Build(DialogError::ProviderOutputMismatch {
                provider: "fixed".to_string(),
                expected: "String".to_string(),
                actual: "Boolean".to_string(),
                usage_site: "model.name".to_string(),
            })
        );

        let matching = SettingsTree::new().with(
            SettingsType::Model,
            SettingsGroup::new("S").with_field(
                SettingsNode::leaf("name", ValueType::String)
                    .with_value_provider(Arc::new(Fixed(ValueType::String))),
            ),
        );
        assert_eq!(build(&matching).unwrap().providers().len(), 1);
    }

    #[test]
    fn button_triggers_need_buttons() {
        let clicker = state_provider(
            "clicker",
            |init| init.compute_on_button_click(&A),
            |_| Ok(Value::Null),
        );
        let tree = SettingsTree::new().with(
            SettingsType::Model,
            SettingsGroup::new("S")
                .with_field(SettingsNode::leaf("a", ValueType::String).with_reference(A))
                .with_field(SettingsNode::leaf("b", ValueType::String).with_value_provider(clicker)),
        );
        assert!(matches!(
            build(&tree),
            Err(crate::UpdateError::Build(DialogError::TypeMismatch { .. }))
        ));
    }
}
