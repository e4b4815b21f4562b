//! Classification of providers into initial and global updates.
//!
//! - **initial**: providers triggered before the dialog opens, plus everything
//!   downstream of their values. Computed now; the results ship as literals.
//! - **global**: one entry per remaining trigger (after open, value change,
//!   button click). The front end calls back when the trigger fires, sending
//!   the values listed as dependencies.

use dialog_model::{FieldId, FieldIndex};

use crate::graph::{DependencyGraph, ProviderId, Trigger};

/// A registered trigger with the providers it recomputes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalEntry {
    pub trigger: Trigger,
    /// Directly triggered providers and their downstream closure, in dependency order.
    pub providers: Vec<ProviderId>,
    /// Fields whose values the front end must send, in first-declared order.
    pub dependencies: Vec<FieldId>,
}

impl GlobalEntry {
    /// The front end fires this trigger once right after opening.
    pub fn trigger_initially(&self) -> bool {
        self.trigger == Trigger::AfterOpenDialog
    }
}

/// Initial and global partitions of a dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub initial: Vec<ProviderId>,
    pub global: Vec<GlobalEntry>,
}

impl Schedule {
    pub fn build(graph: &DependencyGraph, index: &FieldIndex<'_>) -> Self {
        let initial = graph.closure(graph.triggered_by(Trigger::BeforeOpenDialog));

        let mut triggers = Vec::new();
        for provider in graph.providers() {
            for trigger in &provider.triggers {
                if *trigger != Trigger::BeforeOpenDialog && !triggers.contains(trigger) {
                    triggers.push(*trigger);
                }
            }
        }

        let global = triggers
            .into_iter()
            .map(|trigger| {
                let providers = graph.closure(graph.triggered_by(trigger));
                let mut dependencies = Vec::new();
                for id in &providers {
                    let Some(provider) = graph.provider(*id) else {
                        continue;
                    };
                    for dependency in &provider.dependencies {
                        let is_button = index
                            .get(dependency.field)
                            .is_some_and(|e| e.node.is_button());
                        if !is_button && !dependencies.contains(&dependency.field) {
                            dependencies.push(dependency.field);
                        }
                    }
                }
                GlobalEntry {
                    trigger,
                    providers,
                    dependencies,
                }
            })
            .collect();

        Self { initial, global }
    }

    pub fn global_for(&self, trigger: Trigger) -> Option<&GlobalEntry> {
        self.global.iter().find(|entry| entry.trigger == trigger)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dialog_model::{
        NodeContext, Reference, ReferenceResolver, SettingsGroup, SettingsNode, SettingsTree,
        SettingsType, StateProvider, ValueType, state_provider,
    };
    use serde_json::Value;

    use super::*;
    use crate::options::UpdateOptions;

    const FIRST: Reference = Reference::new("first", ValueType::String);
    const SECOND: Reference = Reference::new("second", ValueType::String);
    const GO: Reference = Reference::new("go", ValueType::Button);

    fn provider<I>(init: I) -> Arc<dyn StateProvider>
    where
        I: Fn(&mut dyn dialog_model::StateProviderInitializer) + Send + Sync + 'static,
    {
        state_provider("test", init, |_| Ok(Value::Null))
    }

    #[test]
    fn partitions_by_trigger() {
        let tree = SettingsTree::new().with(
            SettingsType::Model,
            SettingsGroup::new("S")
                .with_field(SettingsNode::leaf("first", ValueType::String).with_reference(FIRST))
                .with_field(SettingsNode::leaf("second", ValueType::String).with_reference(SECOND))
                .with_field(SettingsNode::button("go").with_reference(GO))
                .with_field(
                    SettingsNode::leaf("out", ValueType::String)
                        .with_value_provider(provider(|init| init.compute_before_open_dialog()))
                        .with_value_provider(provider(|init| {
                            init.compute_on_button_click(&GO);
                            init.get_value_supplier(&SECOND);
                            init.compute_from_value_supplier(&FIRST);
                        })),
                ),
        );
        let index = FieldIndex::build(&tree);
        let resolver = ReferenceResolver::new(&index);
        let context = NodeContext::new();
        let graph =
            DependencyGraph::build(&index, &resolver, Some(&context), &UpdateOptions::default()).unwrap();
        let schedule = Schedule::build(&graph, &index);

        assert_eq!(schedule.initial, vec![0]);
        let triggers: Vec<_> = schedule.global.iter().map(|g| g.trigger).collect();
        assert_eq!(triggers, vec![Trigger::ButtonClick(2), Trigger::ValueChange(0)]);
        let click = schedule.global_for(Trigger::ButtonClick(2)).unwrap();
        assert_eq!(click.dependencies, vec![1, 0]);
        assert!(!click.trigger_initially());
    }
}
