//! Ambient inputs available to providers: input ports, flow variables and
//! credentials.
//!
//! A dialog may be opened before the node is connected or configured, so the
//! context is always handled as `Option<&NodeContext>`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column of a table port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

/// Specification of one input port. `None` columns means the port is not connected
/// or its spec is not known yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    #[serde(default)]
    pub columns: Option<Vec<ColumnSpec>>,
}

/// Typed value of a flow variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FlowValue {
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    StringArray(Vec<String>),
}

impl FlowValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::from(*i),
            Self::Double(d) => Value::from(*d),
            Self::Boolean(b) => Value::Bool(*b),
            Self::StringArray(items) => Value::from(items.clone()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Integer(_) => "Integer",
            Self::Double(_) => "Double",
            Self::Boolean(_) => "Boolean",
            Self::StringArray(_) => "String[]",
        }
    }
}

/// A named flow variable currently visible to the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowVariable {
    pub name: String,
    #[serde(flatten)]
    pub value: FlowValue,
}

impl FlowVariable {
    pub fn new(name: impl Into<String>, value: FlowValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Flow variables by name.
pub type FlowVariables = BTreeMap<String, FlowVariable>;

/// Collect flow variables into a name-keyed map.
pub fn flow_variables<I>(variables: I) -> FlowVariables
where
    I: IntoIterator<Item = FlowVariable>,
{
    variables
        .into_iter()
        .map(|variable| (variable.name.clone(), variable))
        .collect()
}

/// Snapshot of the node environment at the time of a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeContext {
    #[serde(default)]
    pub input_specs: Option<Vec<PortSpec>>,
    #[serde(default)]
    pub flow_variables: FlowVariables,
    #[serde(default)]
    pub credential_names: Vec<String>,
}

impl NodeContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_input_specs(mut self, specs: Vec<PortSpec>) -> Self {
        self.input_specs = Some(specs);
        self
    }

    #[must_use]
    pub fn with_flow_variable(mut self, variable: FlowVariable) -> Self {
        self.flow_variables.insert(variable.name.clone(), variable);
        self
    }

    /// Spec of the input port at `index`, if known.
    pub fn input_spec(&self, index: usize) -> Option<&PortSpec> {
        self.input_specs.as_ref().and_then(|specs| specs.get(index))
    }

    pub fn flow_variable(&self, name: &str) -> Option<&FlowVariable> {
        self.flow_variables.get(name)
    }
}
