//! Pre-order index of a settings tree.
//!
//! Every field, group and array node gets a [`FieldId`] in walk order:
//! settings types in composition order, fields in declaration order, nested
//! fields right after their container. All later stages (resolution,
//! scheduling, UI emission) refer to fields by id and rely on id order being
//! tree order.

use std::collections::HashMap;

use dialog_common::{DocPath, Scope, array_len};
use serde_json::Value;

use crate::node::{SettingsGroup, SettingsNode, SettingsTree};
use crate::settings_type::SettingsType;
use crate::value::ValueType;

/// Position of a field in the [`FieldIndex`].
pub type FieldId = usize;

/// One indexed field.
#[derive(Debug, Clone)]
pub struct FieldEntry<'t> {
    pub id: FieldId,
    pub settings_type: SettingsType,
    pub node: &'t SettingsNode,
    /// Enclosing group or array field; `None` for fields of a root group.
    pub parent: Option<FieldId>,
    pub children: Vec<FieldId>,
    /// Property names from the innermost enclosing array element, or from the
    /// settings-type root when not inside an array.
    pub local_path: Vec<String>,
    /// Enclosing array fields, outermost first.
    pub array_chain: Vec<FieldId>,
    /// Class names of all enclosing groups, outermost first.
    pub enclosing_classes: Vec<String>,
    /// Absolute JSON-Forms scope.
    pub scope: Scope,
    /// Scope relative to the innermost enclosing array element.
    pub relative_scope: Scope,
}

impl FieldEntry<'_> {
    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn value_type(&self) -> ValueType {
        self.node.value_type()
    }

    /// Number of enclosing arrays.
    pub fn array_depth(&self) -> usize {
        self.array_chain.len()
    }

    /// Element-relative scope, for fields inside arrays.
    pub fn element_scope(&self) -> Option<&Scope> {
        (!self.array_chain.is_empty()).then_some(&self.relative_scope)
    }

    /// Scope emitted to the front end: absolute at depth 0, element-relative otherwise.
    pub fn emitted_scope(&self) -> &Scope {
        if self.array_chain.is_empty() {
            &self.scope
        } else {
            &self.relative_scope
        }
    }

    /// Dotted location for messages, e.g. `model.rows[].name`.
    pub fn display_path(&self) -> String {
        self.scope
            .as_str()
            .trim_start_matches("#/properties/")
            .replace("/items/properties/", "[].")
            .replace("/properties/", ".")
    }
}

/// A root group of the tree with its top-level field ids.
#[derive(Debug, Clone)]
pub struct IndexedRoot<'t> {
    pub settings_type: SettingsType,
    pub group: &'t SettingsGroup,
    pub fields: Vec<FieldId>,
}

/// Flat, pre-ordered view of a settings tree.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex<'t> {
    entries: Vec<FieldEntry<'t>>,
    roots: Vec<IndexedRoot<'t>>,
    by_scope: HashMap<String, FieldId>,
}

#[derive(Clone)]
struct Frame {
    settings_type: SettingsType,
    parent: Option<FieldId>,
    local_path: Vec<String>,
    array_chain: Vec<FieldId>,
    classes: Vec<String>,
    scope: Scope,
    relative_scope: Scope,
}

impl<'t> FieldIndex<'t> {
    pub fn build(tree: &'t SettingsTree) -> Self {
        let mut index = Self::default();
        for (settings_type, group) in tree.roots() {
            let frame = Frame {
                settings_type: *settings_type,
                parent: None,
                local_path: Vec::new(),
                array_chain: Vec::new(),
                classes: vec![group.class_name.clone()],
                scope: Scope::root().property(settings_type.config_key()),
                relative_scope: Scope::root(),
            };
            let fields = index.walk(group, &frame);
            index.roots.push(IndexedRoot {
                settings_type: *settings_type,
                group,
                fields,
            });
        }
        tracing::trace!(fields = index.entries.len(), "indexed settings tree");
        index
    }

    fn walk(&mut self, group: &'t SettingsGroup, frame: &Frame) -> Vec<FieldId> {
        let mut ids = Vec::with_capacity(group.fields.len());
        for node in &group.fields {
            let id = self.entries.len();
            let mut local_path = frame.local_path.clone();
            local_path.push(node.name.clone());
            let scope = frame.scope.clone().property(&node.name);
            let relative_scope = frame.relative_scope.clone().property(&node.name);
            self.by_scope.insert(scope.as_str().to_string(), id);
            self.entries.push(FieldEntry {
                id,
                settings_type: frame.settings_type,
                node,
                parent: frame.parent,
                children: Vec::new(),
                local_path: local_path.clone(),
                array_chain: frame.array_chain.clone(),
                enclosing_classes: frame.classes.clone(),
                scope: scope.clone(),
                relative_scope: relative_scope.clone(),
            });
            ids.push(id);

            if let Some(children) = node.children() {
                let mut classes = frame.classes.clone();
                classes.push(children.class_name.clone());
                let nested = if node.is_array() {
                    let mut array_chain = frame.array_chain.clone();
                    array_chain.push(id);
                    Frame {
                        settings_type: frame.settings_type,
                        parent: Some(id),
                        local_path: Vec::new(),
                        array_chain,
                        classes,
                        scope: scope.items(),
                        relative_scope: Scope::root(),
                    }
                } else {
                    Frame {
                        settings_type: frame.settings_type,
                        parent: Some(id),
                        local_path,
                        array_chain: frame.array_chain.clone(),
                        classes,
                        scope,
                        relative_scope,
                    }
                };
                let child_ids = self.walk(children, &nested);
                self.entries[id].children = child_ids;
            }
        }
        ids
    }

    pub fn entries(&self) -> &[FieldEntry<'t>] {
        &self.entries
    }

    pub fn roots(&self) -> &[IndexedRoot<'t>] {
        &self.roots
    }

    pub fn get(&self, id: FieldId) -> Option<&FieldEntry<'t>> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Field with the given absolute scope.
    pub fn by_scope(&self, scope: &str) -> Option<&FieldEntry<'t>> {
        self.by_scope.get(scope).map(|id| &self.entries[*id])
    }

    /// Number of arrays enclosing both fields.
    pub fn common_depth(&self, a: FieldId, b: FieldId) -> usize {
        let (Some(a), Some(b)) = (self.get(a), self.get(b)) else {
            return 0;
        };
        a.array_chain
            .iter()
            .zip(&b.array_chain)
            .take_while(|(x, y)| x == y)
            .count()
    }

    /// Data path of a field for one tuple of element indices.
    ///
    /// `indices` must hold one index per enclosing array, outermost first;
    /// returns `None` when too few are given.
    pub fn data_path(&self, id: FieldId, indices: &[usize]) -> Option<DocPath> {
        let entry = self.get(id)?;
        if indices.len() < entry.array_chain.len() {
            return None;
        }
        let mut path = DocPath::root().key(entry.settings_type.config_key());
        for (container, index) in entry.array_chain.iter().zip(indices) {
            for segment in &self.get(*container)?.local_path {
                path.push_key(segment.clone());
            }
            path.push_index(*index);
        }
        for segment in &entry.local_path {
            path.push_key(segment.clone());
        }
        Some(path)
    }

    /// Element index tuples of a field present in `data`, extending `prefix`.
    ///
    /// A prefix longer than the field's array depth is truncated. Fields
    /// outside arrays have exactly one (empty) tuple; fields in an empty array
    /// have none.
    pub fn index_tuples(&self, id: FieldId, prefix: &[usize], data: &Value) -> Vec<Vec<usize>> {
        let Some(entry) = self.get(id) else {
            return Vec::new();
        };
        let chain = &entry.array_chain;
        let start = prefix.len().min(chain.len());
        let mut tuples = vec![prefix[..start].to_vec()];
        for container in &chain[start..] {
            tuples = tuples
                .into_iter()
                .flat_map(|tuple| {
                    let len = self
                        .data_path(*container, &tuple)
                        .map_or(0, |path| array_len(data, &path));
                    (0..len).map(move |i| {
                        let mut next = tuple.clone();
                        next.push(i);
                        next
                    })
                })
                .collect();
        }
        tuples
    }

    /// Leaf fields (not groups, arrays or buttons) in walk order.
    pub fn leaves(&self) -> impl Iterator<Item = &FieldEntry<'t>> {
        self.entries
            .iter()
            .filter(|entry| entry.node.children().is_none() && !entry.node.is_button())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> SettingsTree {
        SettingsTree::new()
            .with(
                SettingsType::Model,
                SettingsGroup::new("Settings")
                    .with_field(SettingsNode::leaf("first", ValueType::String))
                    .with_field(SettingsNode::array(
                        "rows",
                        SettingsGroup::new("Row").with_field(SettingsNode::group(
                            "inner",
                            SettingsGroup::new("Inner")
                                .with_field(SettingsNode::leaf("name", ValueType::String)),
                        )),
                    )),
            )
            .with(
                SettingsType::View,
                SettingsGroup::new("View").with_field(SettingsNode::leaf("flag", ValueType::Boolean)),
            )
    }

    #[test]
    fn entries_are_in_pre_order() {
        let tree = tree();
        let index = FieldIndex::build(&tree);
        let names: Vec<_> = index.entries().iter().map(FieldEntry::display_path).collect();
        assert_eq!(
            names,
            vec!["model.first", "model.rows", "model.rows[].inner", "model.rows[].inner.name", "view.flag"]
        );
    }

    #[test]
    fn scopes_inside_arrays() {
        let tree = tree();
        let index = FieldIndex::build(&tree);
        let name = index.get(3).unwrap();
        assert_eq!(
            name.scope.as_str(),
            "#/properties/model/properties/rows/items/properties/inner/properties/name"
        );
        assert_eq!(name.relative_scope.as_str(), "#/properties/inner/properties/name");
        assert_eq!(name.array_chain, vec![1]);
        assert_eq!(name.enclosing_classes, vec!["Settings", "Row", "Inner"]);
        assert_eq!(index.by_scope(name.scope.as_str()).map(|e| e.id), Some(3));
        assert!(index.get(0).unwrap().element_scope().is_none());
    }

    #[test]
    fn data_paths_interleave_indices() {
        let tree = tree();
        let index = FieldIndex::build(&tree);
        assert_eq!(
            index.data_path(3, &[1]).unwrap().to_dotted(),
            "model.rows.1.inner.name"
        );
        assert_eq!(index.data_path(3, &[]), None);
        assert_eq!(index.data_path(4, &[]).unwrap().to_dotted(), "view.flag");
        assert_eq!(index.common_depth(3, 2), 1);
        assert_eq!(index.common_depth(3, 0), 0);
    }

    #[test]
    fn index_tuples_follow_the_data() {
        let tree = tree();
        let index = FieldIndex::build(&tree);
        let data = serde_json::json!({"model": {"rows": [{}, {}, {}]}});
        assert_eq!(index.index_tuples(3, &[], &data), vec![vec![0], vec![1], vec![2]]);
        assert_eq!(index.index_tuples(3, &[1, 4], &data), vec![vec![1]]);
        assert_eq!(index.index_tuples(0, &[], &data), vec![Vec::<usize>::new()]);
        let empty = serde_json::json!({"model": {"rows": []}});
        assert!(index.index_tuples(3, &[], &empty).is_empty());
    }
}
