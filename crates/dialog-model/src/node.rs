//! Settings tree.
//!
//! The tree is built explicitly: each settings group lists its fields, and
//! every field carries its own reference, providers, effect and validations.
//! A [`SettingsTree`] composes one top-level group per [`SettingsType`]; the
//! composition order is the walk order used everywhere else.

use std::sync::Arc;

use serde_json::Value;

use crate::predicate::EffectSpec;
use crate::provider::{ProviderBinding, ProviderTarget, StateProvider};
use crate::reference::Reference;
use crate::settings_type::SettingsType;
use crate::validation::Validation;
use crate::value::ValueType;

/// Shape of a settings node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Scalar or list-valued leaf.
    Leaf(ValueType),
    /// Nested settings group stored as an object.
    Group(SettingsGroup),
    /// Repeated settings group stored as an array of objects.
    Array(SettingsGroup),
    /// Button; has no stored value but can trigger providers.
    Button,
}

/// One field of a settings group.
#[derive(Debug, Clone)]
pub struct SettingsNode {
    pub name: String,
    pub kind: NodeKind,
    pub reference: Option<Reference>,
    pub providers: Vec<ProviderBinding>,
    pub effect: Option<EffectSpec>,
    pub validations: Vec<Validation>,
    pub default: Option<Value>,
    pub title: Option<String>,
}

impl SettingsNode {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            reference: None,
            providers: Vec::new(),
            effect: None,
            validations: Vec::new(),
            default: None,
            title: None,
        }
    }

    pub fn leaf(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, NodeKind::Leaf(value_type))
    }

    pub fn group(name: impl Into<String>, group: SettingsGroup) -> Self {
        Self::new(name, NodeKind::Group(group))
    }

    pub fn array(name: impl Into<String>, element: SettingsGroup) -> Self {
        Self::new(name, NodeKind::Array(element))
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Button)
    }

    #[must_use]
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    #[must_use]
    pub fn with_provider(mut self, target: ProviderTarget, provider: Arc<dyn StateProvider>) -> Self {
        self.providers.push(ProviderBinding { target, provider });
        self
    }

    /// Shorthand for a [`ProviderTarget::Value`] provider.
    #[must_use]
    pub fn with_value_provider(self, provider: Arc<dyn StateProvider>) -> Self {
        self.with_provider(ProviderTarget::Value, provider)
    }

    #[must_use]
    pub fn with_effect(mut self, effect: EffectSpec) -> Self {
        self.effect = Some(effect);
        self
    }

    #[must_use]
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validations.push(validation);
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Type of the value stored for this node.
    pub fn value_type(&self) -> ValueType {
        match &self.kind {
            NodeKind::Leaf(value_type) => value_type.clone(),
            NodeKind::Group(_) => ValueType::Object,
            NodeKind::Array(_) => ValueType::Array,
            NodeKind::Button => ValueType::Button,
        }
    }

    /// Nested group for group and array nodes.
    pub fn children(&self) -> Option<&SettingsGroup> {
        match &self.kind {
            NodeKind::Group(group) | NodeKind::Array(group) => Some(group),
            NodeKind::Leaf(_) | NodeKind::Button => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, NodeKind::Array(_))
    }

    pub fn is_button(&self) -> bool {
        matches!(self.kind, NodeKind::Button)
    }

    /// Label shown in the dialog; falls back to the field name.
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    /// Default value stored when nothing was supplied.
    ///
    /// Groups default to an object built from their fields' defaults, arrays
    /// to an empty list.
    pub fn default_value(&self) -> Value {
        if let Some(value) = &self.default {
            return value.clone();
        }
        match &self.kind {
            NodeKind::Leaf(ValueType::Boolean) => Value::Bool(false),
            NodeKind::Leaf(ValueType::StringArray | ValueType::Array) => Value::Array(Vec::new()),
            NodeKind::Leaf(_) | NodeKind::Button => Value::Null,
            NodeKind::Group(group) => group.default_value(),
            NodeKind::Array(_) => Value::Array(Vec::new()),
        }
    }
}

/// An ordered list of fields, optionally rendered as a titled section.
#[derive(Debug, Clone, Default)]
pub struct SettingsGroup {
    pub class_name: String,
    pub fields: Vec<SettingsNode>,
    pub section: Option<String>,
    pub effect: Option<EffectSpec>,
}

impl SettingsGroup {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: SettingsNode) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_section(mut self, title: impl Into<String>) -> Self {
        self.section = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_effect(mut self, effect: EffectSpec) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn field(&self, name: &str) -> Option<&SettingsNode> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Object holding every field's default value.
    pub fn default_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .filter(|field| !field.is_button())
                .map(|field| (field.name.clone(), field.default_value()))
                .collect(),
        )
    }
}

/// Composition of top-level settings groups, one per settings type.
#[derive(Debug, Clone, Default)]
pub struct SettingsTree {
    roots: Vec<(SettingsType, SettingsGroup)>,
}

impl SettingsTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the group for `settings_type`. A replaced group keeps its position.
    #[must_use]
    pub fn with(mut self, settings_type: SettingsType, group: SettingsGroup) -> Self {
        match self.roots.iter_mut().find(|(kind, _)| *kind == settings_type) {
            Some(slot) => slot.1 = group,
            None => self.roots.push((settings_type, group)),
        }
        self
    }

    pub fn roots(&self) -> &[(SettingsType, SettingsGroup)] {
        &self.roots
    }

    pub fn get(&self, settings_type: SettingsType) -> Option<&SettingsGroup> {
        self.roots
            .iter()
            .find(|(kind, _)| *kind == settings_type)
            .map(|(_, group)| group)
    }

    pub fn settings_types(&self) -> impl Iterator<Item = SettingsType> + '_ {
        self.roots.iter().map(|(kind, _)| *kind)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Data document holding every field's default value, keyed by settings type.
    pub fn default_data(&self) -> Value {
        Value::Object(
            self.roots
                .iter()
                .map(|(kind, group)| (kind.config_key().to_string(), group.default_value()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_follow_the_tree_shape() {
        let tree = SettingsTree::new().with(
            SettingsType::Model,
            SettingsGroup::new("Settings")
                .with_field(SettingsNode::leaf("flag", ValueType::Boolean))
                .with_field(SettingsNode::leaf("name", ValueType::String).with_default(json!("n")))
                .with_field(SettingsNode::array(
                    "rows",
                    SettingsGroup::new("Row").with_field(SettingsNode::leaf("x", ValueType::Integer)),
                ))
                .with_field(SettingsNode::button("refresh")),
        );
        assert_eq!(
            tree.default_data(),
            json!({"model": {"flag": false, "name": "n", "rows": []}})
        );
    }

    #[test]
    fn replacing_a_root_keeps_its_position() {
        let tree = SettingsTree::new()
            .with(SettingsType::View, SettingsGroup::new("A"))
            .with(SettingsType::Model, SettingsGroup::new("B"))
            .with(SettingsType::View, SettingsGroup::new("C"));
        let order: Vec<_> = tree.settings_types().collect();
        assert_eq!(order, vec![SettingsType::View, SettingsType::Model]);
        assert_eq!(tree.get(SettingsType::View).map(|g| g.class_name.as_str()), Some("C"));
    }
}
