//! Apply request and persisted settings documents.

use std::collections::BTreeMap;

use dialog_model::SettingsType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flow-variable annotations of one setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowVariableSetting {
    /// Variable whose value replaces the setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controlling_flow_variable_name: Option<String>,
    /// Variable the setting's value is published as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_flow_variable_name: Option<String>,
}

impl FlowVariableSetting {
    pub fn controlled_by(name: impl Into<String>) -> Self {
        Self {
            controlling_flow_variable_name: Some(name.into()),
            exposed_flow_variable_name: None,
        }
    }

    pub fn exposed_as(name: impl Into<String>) -> Self {
        Self {
            controlling_flow_variable_name: None,
            exposed_flow_variable_name: Some(name.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.controlling_flow_variable_name.is_none() && self.exposed_flow_variable_name.is_none()
    }
}

/// Data submitted by the dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    /// Settings keyed by settings type.
    pub data: Value,
    /// Flow-variable annotations keyed by dotted path, e.g. `model.rows.0.name`.
    #[serde(default)]
    pub flow_variable_settings: BTreeMap<String, FlowVariableSetting>,
}

impl ApplyRequest {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            flow_variable_settings: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_flow_variable(mut self, path: impl Into<String>, setting: FlowVariableSetting) -> Self {
        self.flow_variable_settings.insert(path.into(), setting);
        self
    }
}

/// Entry of a variables tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub used_variable: Option<String>,
    pub exposed_variable: Option<String>,
}

/// Settings as stored for a node.
///
/// The variables trees mirror the settings shape; array elements appear as
/// object members keyed by their index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_variables: Option<Value>,
}

impl PersistedSettings {
    pub fn settings(&self, settings_type: SettingsType) -> Option<&Value> {
        match settings_type {
            SettingsType::Model => self.model.as_ref(),
            SettingsType::View => self.view.as_ref(),
        }
    }

    pub fn set_settings(&mut self, settings_type: SettingsType, value: Option<Value>) {
        match settings_type {
            SettingsType::Model => self.model = value,
            SettingsType::View => self.view = value,
        }
    }

    pub fn variables(&self, settings_type: SettingsType) -> Option<&Value> {
        match settings_type {
            SettingsType::Model => self.variables.as_ref(),
            SettingsType::View => self.view_variables.as_ref(),
        }
    }

    pub fn set_variables(&mut self, settings_type: SettingsType, value: Option<Value>) {
        match settings_type {
            SettingsType::Model => self.variables = value,
            SettingsType::View => self.view_variables = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.view.is_none()
    }

    /// Settings data in the shape the dialog submits: `{"model": ..., "view": ...}`.
    pub fn data(&self) -> Value {
        let mut data = serde_json::Map::new();
        for settings_type in SettingsType::ALL {
            if let Some(value) = self.settings(settings_type) {
                data.insert(settings_type.config_key().to_string(), value.clone());
            }
        }
        Value::Object(data)
    }

    /// Flow-variable settings recorded in the variables trees, keyed by dotted path.
    pub fn flow_variable_settings(&self) -> BTreeMap<String, FlowVariableSetting> {
        let mut out = BTreeMap::new();
        for settings_type in SettingsType::ALL {
            if let Some(tree) = self.variables(settings_type) {
                collect_variable_settings(tree, settings_type.config_key().to_string(), &mut out);
            }
        }
        out
    }
}

fn collect_variable_settings(
    value: &Value,
    path: String,
    out: &mut BTreeMap<String, FlowVariableSetting>,
) {
    let Value::Object(map) = value else {
        return;
    };
    if map.contains_key("used_variable") || map.contains_key("exposed_variable") {
        let name = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
        let setting = FlowVariableSetting {
            controlling_flow_variable_name: name("used_variable"),
            exposed_flow_variable_name: name("exposed_variable"),
        };
        if !setting.is_empty() {
            out.insert(path, setting);
        }
        return;
    }
    for (key, child) in map {
        collect_variable_settings(child, format!("{path}.{key}"), out);
    }
}
