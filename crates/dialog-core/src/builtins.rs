//! Built-in state providers.
//!
//! | Name             | Params                              | Computes                               |
//! |------------------|-------------------------------------|----------------------------------------|
//! | `constant`       | `value`, `when` (`beforeOpen`/`afterOpen`) | a fixed value                   |
//! | `copy`           | `from` (reference)                  | the current value of another field     |
//! | `column_choices` | `port` (default 0), `columnType`    | column names of an input table         |
//!
//! [`builtin_registry`] returns a registry with all of them; callers add their
//! own factories on top.

use std::sync::Arc;

use dialog_model::{
    ProviderRegistry, Reference, Result, StateComputationFailure, StateInputs, StateProvider,
    StateProviderInitializer, ValueType, invalid_params,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Registry with the `constant`, `copy` and `column_choices` providers.
pub fn builtin_registry() -> ProviderRegistry {
    ProviderRegistry::new()
        .with("constant", |params| Ok(Arc::new(Constant::from_params(params)?) as Arc<dyn StateProvider>))
        .with("copy", |params| Ok(Arc::new(CopyValue::from_params(params)?) as Arc<dyn StateProvider>))
        .with("column_choices", |params| {
            Ok(Arc::new(ColumnChoices::from_params(params)?) as Arc<dyn StateProvider>)
        })
}

fn parse<T: DeserializeOwned>(params: &Value) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params.clone()
    };
    serde_json::from_value(params).map_err(|error| invalid_params(error.to_string()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum OpenPhase {
    #[default]
    BeforeOpen,
    AfterOpen,
}

/// Fixed value, computed when the dialog opens.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    value: Value,
    phase: OpenPhase,
}

impl Constant {
    pub fn before_open(value: Value) -> Self {
        Self {
            value,
            phase: OpenPhase::BeforeOpen,
        }
    }

    pub fn after_open(value: Value) -> Self {
        Self {
            value,
            phase: OpenPhase::AfterOpen,
        }
    }

    fn from_params(params: &Value) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Params {
            value: Value,
            #[serde(default)]
            when: OpenPhase,
        }
        let Params { value, when } = parse(params)?;
        Ok(Self { value, phase: when })
    }
}

impl StateProvider for Constant {
    fn init(&self, initializer: &mut dyn StateProviderInitializer) {
        match self.phase {
            OpenPhase::BeforeOpen => initializer.compute_before_open_dialog(),
            OpenPhase::AfterOpen => initializer.compute_after_open_dialog(),
        }
    }

    fn compute(&self, _inputs: &StateInputs<'_>) -> std::result::Result<Value, StateComputationFailure> {
        Ok(self.value.clone())
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Mirrors another field whenever it changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyValue {
    from: Reference,
}

impl CopyValue {
    pub fn new(from: Reference) -> Self {
        Self { from }
    }

    fn from_params(params: &Value) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Params {
            from: Reference,
        }
        let Params { from } = parse(params)?;
        Ok(Self { from })
    }
}

impl StateProvider for CopyValue {
    fn init(&self, initializer: &mut dyn StateProviderInitializer) {
        initializer.compute_from_value_supplier(&self.from);
    }

    fn compute(&self, inputs: &StateInputs<'_>) -> std::result::Result<Value, StateComputationFailure> {
        inputs.require(&self.from).cloned()
    }

    fn output_type(&self) -> Option<ValueType> {
        Some(self.from.value_type.clone())
    }

    fn name(&self) -> &str {
        "copy"
    }
}

/// Names of the columns of an input table, optionally of one column type.
///
/// Computed before the dialog opens; without a node context there is nothing
/// to read, so the provider then declares no trigger and is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChoices {
    port: usize,
    column_type: Option<String>,
}

impl ColumnChoices {
    pub fn new(port: usize) -> Self {
        Self {
            port,
            column_type: None,
        }
    }

    #[must_use]
    pub fn with_column_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    fn from_params(params: &Value) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase", deny_unknown_fields)]
        struct Params {
            #[serde(default)]
            port: usize,
            #[serde(default)]
            column_type: Option<String>,
        }
        let Params { port, column_type } = parse(params)?;
        Ok(Self { port, column_type })
    }
}

impl StateProvider for ColumnChoices {
    fn init(&self, initializer: &mut dyn StateProviderInitializer) {
        if initializer.context().is_some() {
            initializer.compute_before_open_dialog();
        }
    }

    fn compute(&self, inputs: &StateInputs<'_>) -> std::result::Result<Value, StateComputationFailure> {
        let spec = inputs
            .context()
            .and_then(|ctx| ctx.input_spec(self.port))
            .ok_or_else(|| StateComputationFailure::new(format!("input port {} is not available", self.port)))?;
        let columns = spec.columns.as_ref().ok_or_else(|| {
            StateComputationFailure::new(format!("input port '{}' is not connected", spec.name))
        })?;
        let names: Vec<Value> = columns
            .iter()
            .filter(|column| {
                self.column_type
                    .as_deref()
                    .is_none_or(|wanted| column.column_type == wanted)
            })
            .map(|column| Value::String(column.name.clone()))
            .collect();
        Ok(Value::Array(names))
    }

    fn output_type(&self) -> Option<ValueType> {
        Some(ValueType::StringArray)
    }

    fn name(&self) -> &str {
        "column_choices"
    }
}
