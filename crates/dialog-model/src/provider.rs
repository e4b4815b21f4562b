//! State providers: computations that fill a field value or a UI option.
//!
//! A provider first describes itself to a [`StateProviderInitializer`]
//! (when it should run and which values it reads) and is later asked to
//! [`compute`](StateProvider::compute) with those values at hand. The
//! initializer only records declarations; nothing is computed during `init`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::NodeContext;
use crate::error::StateComputationFailure;
use crate::reference::Reference;
use crate::value::ValueType;

/// Where the result of a provider goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "camelCase")]
pub enum ProviderTarget {
    /// The value of the field carrying the provider.
    Value,
    /// A named UI option of the field, e.g. `possibleValues`.
    UiOption(String),
}

impl ProviderTarget {
    pub fn option_name(&self) -> Option<&str> {
        match self {
            Self::Value => None,
            Self::UiOption(name) => Some(name),
        }
    }
}

/// Capability object handed to [`StateProvider::init`].
pub trait StateProviderInitializer {
    /// Compute once, eagerly, while building the dialog.
    fn compute_before_open_dialog(&mut self);

    /// Compute once in the front end right after the dialog opened.
    fn compute_after_open_dialog(&mut self);

    /// Recompute whenever the referenced value changes. Does not make the value readable.
    fn compute_on_value_change(&mut self, reference: &Reference);

    /// Recompute when the referenced button is clicked.
    fn compute_on_button_click(&mut self, reference: &Reference);

    /// Read the referenced value during computation without reacting to its changes.
    fn get_value_supplier(&mut self, reference: &Reference);

    /// Read the referenced value and recompute whenever it changes.
    fn compute_from_value_supplier(&mut self, reference: &Reference);

    /// Ambient context; `None` when the dialog is built without one.
    fn context(&self) -> Option<&NodeContext>;
}

/// Values and context available to one computation.
#[derive(Debug, Clone, Default)]
pub struct StateInputs<'a> {
    values: HashMap<Reference, Value>,
    context: Option<&'a NodeContext>,
    indices: Vec<usize>,
}

impl<'a> StateInputs<'a> {
    pub fn new(context: Option<&'a NodeContext>) -> Self {
        Self {
            values: HashMap::new(),
            context,
            indices: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_indices(mut self, indices: Vec<usize>) -> Self {
        self.indices = indices;
        self
    }

    #[must_use]
    pub fn with_value(mut self, reference: Reference, value: Value) -> Self {
        self.insert(reference, value);
        self
    }

    pub fn insert(&mut self, reference: Reference, value: Value) {
        self.values.insert(reference, value);
    }

    /// Value of a declared dependency.
    pub fn value(&self, reference: &Reference) -> Option<&Value> {
        self.values.get(reference)
    }

    /// Value of a declared dependency, failing the computation when absent.
    pub fn require(&self, reference: &Reference) -> Result<&Value, StateComputationFailure> {
        self.value(reference)
            .ok_or_else(|| StateComputationFailure::missing_value(reference.id()))
    }

    pub fn string(&self, reference: &Reference) -> Option<&str> {
        self.value(reference).and_then(Value::as_str)
    }

    pub fn boolean(&self, reference: &Reference) -> Option<bool> {
        self.value(reference).and_then(Value::as_bool)
    }

    pub fn context(&self) -> Option<&'a NodeContext> {
        self.context
    }

    /// Element indices when the provider sits inside array elements, outermost first.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

/// Computation attached to a field.
pub trait StateProvider: Send + Sync {
    /// Declare triggers and dependencies.
    fn init(&self, initializer: &mut dyn StateProviderInitializer);

    /// Produce the new state.
    fn compute(&self, inputs: &StateInputs<'_>) -> Result<Value, StateComputationFailure>;

    /// Declared result type; checked against the target field for value providers.
    fn output_type(&self) -> Option<ValueType> {
        None
    }

    /// Name used in logs and error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Provider built from two closures.
pub struct FnStateProvider<I, C> {
    name: String,
    init: I,
    compute: C,
}

impl<I, C> StateProvider for FnStateProvider<I, C>
where
    I: Fn(&mut dyn StateProviderInitializer) + Send + Sync,
    C: Fn(&StateInputs<'_>) -> Result<Value, StateComputationFailure> + Send + Sync,
{
    fn init(&self, initializer: &mut dyn StateProviderInitializer) {
        (self.init)(initializer);
    }

    fn compute(&self, inputs: &StateInputs<'_>) -> Result<Value, StateComputationFailure> {
        (self.compute)(inputs)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build a provider from an `init` and a `compute` closure.
pub fn state_provider<I, C>(name: impl Into<String>, init: I, compute: C) -> Arc<dyn StateProvider>
where
    I: Fn(&mut dyn StateProviderInitializer) + Send + Sync + 'static,
    C: Fn(&StateInputs<'_>) -> Result<Value, StateComputationFailure> + Send + Sync + 'static,
{
    Arc::new(FnStateProvider {
        name: name.into(),
        init,
        compute,
    })
}

/// A provider attached to a field together with its target.
#[derive(Clone)]
pub struct ProviderBinding {
    pub target: ProviderTarget,
    pub provider: Arc<dyn StateProvider>,
}

impl ProviderBinding {
    /// Provider of the field value.
    pub fn value(provider: Arc<dyn StateProvider>) -> Self {
        Self {
            target: ProviderTarget::Value,
            provider,
        }
    }

    /// Provider of a named UI option.
    pub fn ui_option(name: impl Into<String>, provider: Arc<dyn StateProvider>) -> Self {
        Self {
            target: ProviderTarget::UiOption(name.into()),
            provider,
        }
    }
}

impl fmt::Debug for ProviderBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBinding")
            .field("target", &self.target)
            .field("provider", &self.provider.name())
            .finish()
    }
}
