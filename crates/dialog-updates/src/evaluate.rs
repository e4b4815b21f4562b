//! Batch evaluation of state providers.
//!
//! Providers inside arrays run once per element. The element index tuples
//! come from the data itself, so an empty array yields no computation at all.
//! A dependency read from a provider inside an array is taken from the same
//! element when both share that array; a dependency nested in arrays the
//! provider is not part of is supplied as nested lists over those elements.

use dialog_common::{array_len, get_at, set_at};
use dialog_model::{FieldId, FieldIndex, NodeContext, StateInputs};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{trace, warn};

use crate::graph::{DependencyGraph, ProviderId, ProviderNode};

/// A provider computation that failed. The rest of the batch is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputationFailure {
    pub scope: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<usize>,
    pub message: String,
}

/// Results of one provider across all element index tuples.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedUpdate {
    pub provider: ProviderId,
    pub values: Vec<(Vec<usize>, Value)>,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub updates: Vec<ComputedUpdate>,
    pub failures: Vec<ComputationFailure>,
}

pub(crate) struct BatchEvaluator<'a, 't> {
    pub index: &'a FieldIndex<'t>,
    pub graph: &'a DependencyGraph,
    pub context: Option<&'a NodeContext>,
}

impl BatchEvaluator<'_, '_> {
    /// Run `providers` in the given order against `data`, writing value
    /// results back so later providers see them. `prefix` gives the fixed
    /// leading element indices for each provider.
    pub fn run<F>(&self, providers: &[ProviderId], data: &mut Value, prefix: F) -> BatchOutcome
    where
        F: Fn(&ProviderNode) -> Vec<usize>,
    {
        let mut outcome = BatchOutcome::default();
        for id in providers {
            let Some(provider) = self.graph.provider(*id) else {
                continue;
            };
            let Some(entry) = self.index.get(provider.field) else {
                continue;
            };
            let mut values = Vec::new();
            for tuple in self.index.index_tuples(provider.field, &prefix(provider), data) {
                let mut inputs = StateInputs::new(self.context).with_indices(tuple.clone());
                let common = |field: FieldId| self.index.common_depth(provider.field, field);
                for dependency in &provider.dependencies {
                    let depth = common(dependency.field).min(tuple.len());
                    if let Some(value) = self.gather(dependency.field, &tuple[..depth], data) {
                        inputs.insert(dependency.reference.clone(), value);
                    }
                }
                match provider.provider.compute(&inputs) {
                    Ok(value) => {
                        trace!(provider = provider.provider.name(), indices = ?tuple, "computed");
                        if provider.writes_value() {
                            self.write(provider.field, &tuple, data, value.clone());
                        }
                        values.push((tuple, value));
                    }
                    Err(failure) => {
                        warn!(
                            provider = provider.provider.name(),
                            field = %entry.display_path(),
                            indices = ?tuple,
                            %failure,
                            "state computation failed"
                        );
                        outcome.failures.push(ComputationFailure {
                            scope: entry.scope.to_string(),
                            provider: provider.provider.name().to_string(),
                            indices: tuple,
                            message: failure.message,
                        });
                    }
                }
            }
            if !values.is_empty() {
                outcome.updates.push(ComputedUpdate {
                    provider: *id,
                    values,
                });
            }
        }
        outcome
    }

    /// Value of `field` below the element addressed by `prefix`; deeper
    /// array levels become nested lists.
    fn gather(&self, field: FieldId, prefix: &[usize], data: &Value) -> Option<Value> {
        let entry = self.index.get(field)?;
        let depth = entry.array_depth();
        if prefix.len() >= depth {
            let path = self.index.data_path(field, &prefix[..depth])?;
            return get_at(data, &path).cloned();
        }
        let container = entry.array_chain[prefix.len()];
        let len = self
            .index
            .data_path(container, prefix)
            .map_or(0, |path| array_len(data, &path));
        let items = (0..len)
            .map(|i| {
                let mut next = prefix.to_vec();
                next.push(i);
                self.gather(field, &next, data).unwrap_or(Value::Null)
            })
            .collect();
        Some(Value::Array(items))
    }

    fn write(&self, field: FieldId, tuple: &[usize], data: &mut Value, value: Value) {
        let Some(path) = self.index.data_path(field, tuple) else {
            return;
        };
        if let Err(error) = set_at(data, &path, value) {
            warn!(path = %path, %error, "could not store computed value");
        }
    }
}
