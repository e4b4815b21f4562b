//! JSON description of a settings tree.
//!
//! Lets a settings tree be loaded from a file instead of built in code.
//! Providers are named and instantiated through a [`ProviderRegistry`];
//! predicates and validations are plain data.
//!
//! ```json
//! {
//!   "settings": [
//!     {
//!       "type": "model",
//!       "class": "Settings",
//!       "fields": [
//!         { "name": "first", "type": "string", "ref": "first" },
//!         { "name": "copy", "type": "string",
//!           "providers": [{ "provider": "copy", "params": { "from": { "id": "first", "type": "string" } } }] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DialogError, Result};
use crate::node::{SettingsGroup, SettingsNode, SettingsTree};
use crate::predicate::{EffectKind, EffectSpec, Predicate};
use crate::provider::ProviderTarget;
use crate::reference::Reference;
use crate::registry::ProviderRegistry;
use crate::settings_type::SettingsType;
use crate::validation::Validation;
use crate::value::ValueType;

/// Top-level descriptor: settings groups in composition order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDescriptor {
    pub settings: Vec<RootDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootDescriptor {
    #[serde(rename = "type")]
    pub settings_type: SettingsType,
    #[serde(flatten)]
    pub group: GroupDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDescriptor {
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<EffectDescriptor>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array: Option<GroupDescriptor>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub button: bool,
    /// Reference identity declared by this field; its type is the field's type.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<EffectDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Validation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// UI option filled by the provider; the field value when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    pub provider: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    pub effect: EffectKind,
    pub predicate: Predicate,
}

impl EffectDescriptor {
    fn build(&self) -> EffectSpec {
        EffectSpec::when(self.effect, self.predicate.clone())
    }
}

impl TreeDescriptor {
    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input)
            .map_err(|error| DialogError::invalid_descriptor("descriptor", error.to_string()))
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|error| DialogError::invalid_descriptor("descriptor", error.to_string()))
    }

    /// Instantiate the settings tree, creating providers through `registry`.
    pub fn build(&self, registry: &ProviderRegistry) -> Result<SettingsTree> {
        let mut seen = HashSet::new();
        let mut tree = SettingsTree::new();
        for root in &self.settings {
            let key = root.settings_type.config_key();
            if !seen.insert(root.settings_type) {
                return Err(DialogError::invalid_descriptor(
                    key,
                    "settings type is declared more than once",
                ));
            }
            let group = root.group.build(registry, key)?;
            tree = tree.with(root.settings_type, group);
        }
        Ok(tree)
    }
}

impl GroupDescriptor {
    fn build(&self, registry: &ProviderRegistry, location: &str) -> Result<SettingsGroup> {
        let mut group = SettingsGroup::new(&self.class);
        group.section = self.section.clone();
        group.effect = self.effect.as_ref().map(EffectDescriptor::build);
        let mut names = HashSet::new();
        for field in &self.fields {
            let field_location = format!("{location}.{}", field.name);
            if !names.insert(field.name.as_str()) {
                return Err(DialogError::invalid_descriptor(
                    field_location,
                    "field name is declared more than once",
                ));
            }
            group.fields.push(field.build(registry, &field_location)?);
        }
        Ok(group)
    }
}

impl FieldDescriptor {
    fn build(&self, registry: &ProviderRegistry, location: &str) -> Result<SettingsNode> {
        let mut node = match (&self.value_type, &self.group, &self.array, self.button) {
            (Some(value_type), None, None, false) => SettingsNode::leaf(&self.name, value_type.clone()),
            (None, Some(group), None, false) => {
                SettingsNode::group(&self.name, group.build(registry, location)?)
            }
            (None, None, Some(element), false) => {
                SettingsNode::array(&self.name, element.build(registry, &format!("{location}[]"))?)
            }
            (None, None, None, true) => SettingsNode::button(&self.name),
            _ => {
                return Err(DialogError::invalid_descriptor(
                    location,
                    "a field needs exactly one of 'type', 'group', 'array' or 'button'",
                ));
            }
        };
        if let Some(id) = &self.reference {
            node.reference = Some(Reference::owned(id.clone(), node.value_type()));
        }
        for provider in &self.providers {
            let target = match &provider.option {
                Some(name) => ProviderTarget::UiOption(name.clone()),
                None => ProviderTarget::Value,
            };
            let created = registry.create(&provider.provider, &provider.params, location)?;
            node = node.with_provider(target, created);
        }
        node.effect = self.effect.as_ref().map(EffectDescriptor::build);
        node.validations = self.validations.clone();
        node.default = self.default.clone();
        node.title = self.title.clone();
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn builds_nested_tree() {
        let descriptor = TreeDescriptor::from_value(json!({
            "settings": [{
                "type": "model",
                "class": "Settings",
                "section": "General",
                "fields": [
                    {"name": "flag", "type": "boolean", "ref": "flag"},
                    {"name": "rows", "array": {"class": "Row", "fields": [
                        {"name": "name", "type": "string", "validations": [{"kind": "notBlank"}]}
                    ]}},
                    {"name": "go", "button": true, "ref": "go",
                     "effect": {"effect": "SHOW", "predicate": {"type": "always"}}}
                ]
            }]
        }))
        .unwrap();
        let tree = descriptor.build(&ProviderRegistry::new()).unwrap();
        let group = tree.get(SettingsType::Model).unwrap();
        assert_eq!(group.section.as_deref(), Some("General"));
        assert_eq!(
            group.field("flag").and_then(|f| f.reference.clone()),
            Some(Reference::owned("flag", ValueType::Boolean))
        );
        let NodeKind::Array(element) = &group.fields[1].kind else {
            panic!("rows should be an array");
        };
        assert_eq!(element.fields[0].validations, vec![Validation::NotBlank]);
        assert_eq!(group.fields[2].value_type(), ValueType::Button);
        assert!(group.fields[2].effect.is_some());
    }

    #[test]
    fn rejects_fields_without_a_single_shape() {
        let descriptor = TreeDescriptor::from_value(json!({
            "settings": [{"type": "view", "class": "View", "fields": [
                {"name": "odd", "type": "string", "button": true}
            ]}]
        }))
        .unwrap();
        let err = descriptor.build(&ProviderRegistry::new()).unwrap_err();
        assert!(matches!(err, DialogError::InvalidDescriptor { location, .. } if location == "view.odd"));
    }

    #[test]
    fn unknown_providers_fail_the_build() {
        let descriptor = TreeDescriptor::from_value(json!({
            "settings": [{"type": "model", "class": "S", "fields": [
                {"name": "x", "type": "string", "providers": [{"provider": "nope"}]}
            ]}]
        }))
        .unwrap();
        let err = descriptor.build(&ProviderRegistry::new()).unwrap_err();
        assert!(matches!(err, DialogError::UnknownProvider { name, .. } if name == "nope"));
    }
}
