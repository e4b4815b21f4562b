//! Request-scoped update engine.
//!
//! Built fresh for every request from a settings tree and the current
//! context; holds the field index, the resolved dependency graph and its
//! schedule. Nothing is shared between engines.

use dialog_model::{FieldIndex, NodeContext, ReferenceResolver, SettingsTree};
use serde_json::Value;
use tracing::{debug, info_span};

use crate::error::{Result, UpdateError};
use crate::evaluate::{BatchEvaluator, BatchOutcome};
use crate::graph::{DependencyGraph, Trigger};
use crate::options::UpdateOptions;
use crate::response::{
    AFTER_OPEN_DIALOG_ID, GlobalUpdate, IndexedValue, TriggerInvocation, TriggerRef, TriggerResult,
    UpdateReport, UpdateResponse, ValueUpdate,
};
use crate::scheduler::Schedule;

/// Dependency graph and schedule of one settings tree.
#[derive(Debug)]
pub struct UpdateEngine<'t> {
    index: FieldIndex<'t>,
    resolver: ReferenceResolver,
    graph: DependencyGraph,
    schedule: Schedule,
    context: Option<&'t NodeContext>,
}

impl<'t> UpdateEngine<'t> {
    /// Index the tree, resolve all provider declarations and classify them.
    ///
    /// Fails on the first configuration error; no partial engine is returned.
    pub fn build(
        tree: &'t SettingsTree,
        context: Option<&'t NodeContext>,
        options: &UpdateOptions,
    ) -> Result<Self> {
        let _span = info_span!("build_updates", has_context = context.is_some()).entered();
        let index = FieldIndex::build(tree);
        let resolver = ReferenceResolver::new(&index);
        let graph = DependencyGraph::build(&index, &resolver, context, options)?;
        let schedule = Schedule::build(&graph, &index);
        debug!(
            providers = graph.providers().len(),
            initial = schedule.initial.len(),
            global = schedule.global.len(),
            "built update schedule"
        );
        Ok(Self {
            index,
            resolver,
            graph,
            schedule,
            context,
        })
    }

    pub fn index(&self) -> &FieldIndex<'t> {
        &self.index
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    fn evaluator(&self) -> BatchEvaluator<'_, 't> {
        BatchEvaluator {
            index: &self.index,
            graph: &self.graph,
            context: self.context,
        }
    }

    /// Compute the initial updates against `data` and list the global ones.
    pub fn initial_response(&self, data: &Value) -> UpdateReport {
        let _span = info_span!("initial_updates").entered();
        let mut working = data.clone();
        let outcome = self
            .evaluator()
            .run(&self.schedule.initial, &mut working, |_| Vec::new());
        let failures = outcome.failures.clone();
        UpdateReport {
            response: UpdateResponse::new(self.value_updates(outcome), self.global_updates()),
            failures,
        }
    }

    /// The global update descriptors, in first-trigger order.
    pub fn global_updates(&self) -> Vec<GlobalUpdate> {
        self.schedule
            .global
            .iter()
            .map(|entry| GlobalUpdate {
                trigger: self.trigger_ref(entry.trigger),
                dependencies: entry
                    .dependencies
                    .iter()
                    .filter_map(|field| self.index.get(*field))
                    .map(|field| field.scope.to_string())
                    .collect(),
                trigger_initially: entry.trigger_initially().then_some(true),
            })
            .collect()
    }

    /// Re-run the providers registered for the invoked trigger.
    pub fn invoke(&self, invocation: &TriggerInvocation) -> Result<TriggerResult> {
        let _span = info_span!("invoke_trigger", trigger = %invocation.trigger).entered();
        let trigger = self.trigger_of(&invocation.trigger)?;
        let entry = self
            .schedule
            .global_for(trigger)
            .ok_or_else(|| UpdateError::UnknownTrigger {
                trigger: invocation.trigger.to_string(),
            })?;
        let source = match trigger {
            Trigger::ValueChange(field) | Trigger::ButtonClick(field) => Some(field),
            Trigger::BeforeOpenDialog | Trigger::AfterOpenDialog => None,
        };
        let mut working = invocation.data.clone();
        let outcome = self.evaluator().run(&entry.providers, &mut working, |provider| {
            let Some(source) = source else {
                return Vec::new();
            };
            let depth = self.index.common_depth(source, provider.field);
            invocation.indices[..depth.min(invocation.indices.len())].to_vec()
        });
        let failures = outcome.failures.clone();
        Ok(TriggerResult {
            updates: self.value_updates(outcome),
            failures,
        })
    }

    fn trigger_of(&self, trigger: &TriggerRef) -> Result<Trigger> {
        let unknown = || UpdateError::UnknownTrigger {
            trigger: trigger.to_string(),
        };
        match trigger {
            TriggerRef::Scope { scope } => {
                let field = self.index.by_scope(scope).ok_or_else(unknown)?.id;
                [Trigger::ValueChange(field), Trigger::ButtonClick(field)]
                    .into_iter()
                    .find(|t| self.schedule.global_for(*t).is_some())
                    .ok_or_else(unknown)
            }
            TriggerRef::Id { id } if id == AFTER_OPEN_DIALOG_ID => Ok(Trigger::AfterOpenDialog),
            TriggerRef::Id { id } => self
                .schedule
                .global
                .iter()
                .map(|entry| entry.trigger)
                .find(|t| match t {
                    Trigger::ButtonClick(field) => self
                        .index
                        .get(*field)
                        .and_then(|e| e.node.reference.as_ref())
                        .is_some_and(|r| r.id() == id),
                    _ => false,
                })
                .ok_or_else(unknown),
        }
    }

    fn trigger_ref(&self, trigger: Trigger) -> TriggerRef {
        match trigger {
            Trigger::ValueChange(field) => TriggerRef::scope(
                self.index
                    .get(field)
                    .map(|e| e.scope.to_string())
                    .unwrap_or_default(),
            ),
            Trigger::ButtonClick(field) => match self.index.get(field) {
                Some(entry) => match &entry.node.reference {
                    Some(reference) => TriggerRef::id(reference.id()),
                    None => TriggerRef::scope(entry.scope.to_string()),
                },
                None => TriggerRef::id(String::new()),
            },
            Trigger::AfterOpenDialog => TriggerRef::id(AFTER_OPEN_DIALOG_ID),
            Trigger::BeforeOpenDialog => TriggerRef::id("before-open-dialog"),
        }
    }

    fn value_updates(&self, outcome: BatchOutcome) -> Vec<ValueUpdate> {
        outcome
            .updates
            .into_iter()
            .filter_map(|update| {
                let provider = self.graph.provider(update.provider)?;
                let entry = self.index.get(provider.field)?;
                Some(ValueUpdate {
                    scope: entry.scope.to_string(),
                    provided_option_name: provider.target.option_name().map(str::to_string),
                    values: update
                        .values
                        .into_iter()
                        .map(|(indices, value)| IndexedValue { indices, value })
                        .collect(),
                })
            })
            .collect()
    }
}
