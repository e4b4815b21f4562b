//! UI schema emission.
//!
//! Produces the layout part of a dialog description:
//!
//! - one `Control` per leaf, array and button, in tree order
//! - one `Section` per titled group; untitled groups are elided and their
//!   fields flow into the enclosing layout
//! - array controls list their element layout under `options.detail`, using
//!   element-relative scopes
//! - every element with an effect carries `rule: {effect, condition}`
//! - a group field whose class also has an effect keeps both: the class rule
//!   moves to an inner `VerticalLayout`

use dialog_model::{FieldEntry, FieldId, FieldIndex, NodeContext, ReferenceResolver, Result};
use serde_json::{Map, Value, json};

use crate::compiler::{ConditionCompiler, UsageSite};

/// Builds the `{"elements": [...]}` UI schema of a settings tree.
#[derive(Debug, Clone, Copy)]
pub struct UiSchemaBuilder<'a, 't> {
    index: &'a FieldIndex<'t>,
    compiler: ConditionCompiler<'a, 't>,
    context: Option<&'a NodeContext>,
}

impl<'a, 't> UiSchemaBuilder<'a, 't> {
    pub fn new(
        index: &'a FieldIndex<'t>,
        resolver: &'a ReferenceResolver,
        context: Option<&'a NodeContext>,
    ) -> Self {
        Self {
            index,
            compiler: ConditionCompiler::new(index, resolver),
            context,
        }
    }

    pub fn build(&self) -> Result<Value> {
        let mut elements = Vec::new();
        for root in self.index.roots() {
            let scope = format!("#/properties/{}", root.settings_type.config_key());
            let site = UsageSite::top_level(&scope);
            let rule = match &root.group.effect {
                Some(effect) => Some(self.compiler.compile_effect(effect, site, self.context)?),
                None => None,
            };
            let children = self.elements(&root.fields)?;
            push_group(&mut elements, root.group.section.as_deref(), rule, children);
        }
        Ok(json!({ "elements": elements }))
    }

    fn elements(&self, ids: &[FieldId]) -> Result<Vec<Value>> {
        let mut elements = Vec::new();
        for id in ids {
            let Some(entry) = self.index.get(*id) else {
                continue;
            };
            self.element(entry, &mut elements)?;
        }
        Ok(elements)
    }

    fn element(&self, entry: &FieldEntry<'_>, out: &mut Vec<Value>) -> Result<()> {
        let rule = match &entry.node.effect {
            Some(effect) => Some(
                self.compiler
                    .compile_effect(effect, UsageSite::of(entry), self.context)?,
            ),
            None => None,
        };

        if let Some(group) = entry.node.children().filter(|_| !entry.node.is_array()) {
            let nested_rule = match &group.effect {
                Some(effect) => Some(
                    self.compiler
                        .compile_effect(effect, UsageSite::of(entry), self.context)?,
                ),
                None => None,
            };
            let children = self.elements(&entry.children)?;
            let title = group.section.as_deref().or(entry.node.title.as_deref());
            match (rule, nested_rule) {
                // The group's own rule goes on an inner layout so both effects apply.
                (Some(rule), Some(nested_rule)) => {
                    let mut inner = Vec::new();
                    push_group(&mut inner, None, Some(nested_rule), children);
                    push_group(out, title, Some(rule), inner);
                }
                (rule, nested_rule) => push_group(out, title, rule.or(nested_rule), children),
            }
            return Ok(());
        }

        let mut control = Map::new();
        control.insert("type".into(), json!("Control"));
        control.insert("scope".into(), json!(entry.emitted_scope().as_str()));
        control.insert("label".into(), json!(entry.node.label()));
        if entry.node.is_button() {
            control.insert("options".into(), json!({ "format": "button" }));
        } else if entry.node.is_array() {
            let detail = self.elements(&entry.children)?;
            control.insert("options".into(), json!({ "detail": detail }));
        }
        if let Some(rule) = rule {
            control.insert("rule".into(), rule);
        }
        out.push(Value::Object(control));
        Ok(())
    }
}

/// Add a group's elements: as a `Section` when titled, inline otherwise.
///
/// An untitled group with an effect still needs an element to carry the rule
/// and becomes a `VerticalLayout`.
fn push_group(out: &mut Vec<Value>, title: Option<&str>, rule: Option<Value>, children: Vec<Value>) {
    let layout = match (title, rule) {
        (Some(title), rule) => {
            let mut section = json!({ "type": "Section", "label": title, "elements": children });
            if let (Some(rule), Some(map)) = (rule, section.as_object_mut()) {
                map.insert("rule".into(), rule);
            }
            section
        }
        (None, Some(rule)) => json!({ "type": "VerticalLayout", "elements": children, "rule": rule }),
        (None, None) => {
            out.extend(children);
            return;
        }
    };
    out.push(layout);
}
