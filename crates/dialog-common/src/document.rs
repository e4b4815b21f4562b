//! Path-addressed access to JSON settings documents.
//!
//! These helpers operate on plain [`serde_json::Value`] trees and know nothing
//! about any particular settings shape. Writes create missing intermediate
//! objects; array indices may address an existing element or append at the
//! end.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::path::{DocPath, Segment};

/// Errors raised while writing into a document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("cannot descend into {found} at '{path}'")]
    NotAContainer { path: String, found: &'static str },

    #[error("index {index} out of bounds at '{path}' (length {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("cannot replace the document root")]
    RootWrite,
}

pub type Result<T> = std::result::Result<T, DocumentError>;

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read the value at `path`.
pub fn get_at<'a>(doc: &'a Value, path: &DocPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(doc, |current, segment| match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key),
            (Segment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        })
}

/// Mutable access to an existing value at `path`.
pub fn get_at_mut<'a>(doc: &'a mut Value, path: &DocPath) -> Option<&'a mut Value> {
    let mut current = doc;
    for segment in path.segments() {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get_mut(key)?,
            (Segment::Index(index), Value::Array(items)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Length of the array at `path`, or zero when absent or not an array.
pub fn array_len(doc: &Value, path: &DocPath) -> usize {
    match get_at(doc, path) {
        Some(Value::Array(items)) => items.len(),
        _ => 0,
    }
}

/// Return the slot at `path`, creating `null` placeholders along the way.
fn slot_at<'a>(doc: &'a mut Value, path: &DocPath) -> Result<&'a mut Value> {
    let mut current = doc;
    let mut walked = DocPath::root();
    for segment in path.segments() {
        if current.is_null() {
            *current = match segment {
                Segment::Key(_) => Value::Object(Map::new()),
                Segment::Index(_) => Value::Array(Vec::new()),
            };
        }
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.entry(key.clone()).or_insert(Value::Null),
            (Segment::Index(index), Value::Array(items)) => {
                let len = items.len();
                if *index == len {
                    items.push(Value::Null);
                } else if *index > len {
                    return Err(DocumentError::IndexOutOfBounds {
                        path: walked.to_dotted(),
                        index: *index,
                        len,
                    });
                }
                &mut items[*index]
            }
            (_, other) => {
                return Err(DocumentError::NotAContainer {
                    path: walked.to_dotted(),
                    found: kind_name(other),
                });
            }
        };
        match segment {
            Segment::Key(key) => walked.push_key(key.clone()),
            Segment::Index(index) => walked.push_index(*index),
        }
    }
    Ok(current)
}

/// Write `value` at `path`, creating intermediate objects as needed.
pub fn set_at(doc: &mut Value, path: &DocPath, value: Value) -> Result<()> {
    if path.is_empty() {
        return Err(DocumentError::RootWrite);
    }
    *slot_at(doc, path)? = value;
    Ok(())
}

/// Apply `f` to the slot at `path`; a missing slot is presented as `null`.
pub fn modify_at<F>(doc: &mut Value, path: &DocPath, f: F) -> Result<()>
where
    F: FnOnce(&mut Value),
{
    f(slot_at(doc, path)?);
    Ok(())
}

/// Remove and return the value at `path`. Array elements are removed, not nulled.
pub fn remove_at(doc: &mut Value, path: &DocPath) -> Option<Value> {
    let parent = path.parent()?;
    let container = get_at_mut(doc, &parent)?;
    match (path.last()?, container) {
        (Segment::Key(key), Value::Object(map)) => map.remove(key),
        (Segment::Index(index), Value::Array(items)) if *index < items.len() => {
            Some(items.remove(*index))
        }
        _ => None,
    }
}

/// All scalar (and empty container) values with their paths, in document order.
pub fn leaves(doc: &Value) -> Vec<(DocPath, &Value)> {
    let mut out = Vec::new();
    collect_leaves(doc, DocPath::root(), &mut out);
    out
}

fn collect_leaves<'a>(value: &'a Value, path: DocPath, out: &mut Vec<(DocPath, &'a Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                collect_leaves(child, path.clone().key(key.clone()), out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                collect_leaves(child, path.clone().index(index), out);
            }
        }
        _ => out.push((path, value)),
    }
}

enum PatchOp {
    Set(Value),
    Remove,
    Modify(Box<dyn Fn(&mut Value)>),
}

/// A recorded sequence of path-addressed edits.
///
/// ```
/// use dialog_common::DocumentPatch;
/// use serde_json::json;
///
/// let mut doc = json!({"model": {"first": "a"}});
/// DocumentPatch::new()
///     .set("model.first", json!("b"))
///     .set("view.flag", json!(true))
///     .apply(&mut doc)
///     .unwrap();
/// assert_eq!(doc, json!({"model": {"first": "b"}, "view": {"flag": true}}));
/// ```
#[derive(Default)]
pub struct DocumentPatch {
    ops: Vec<(DocPath, PatchOp)>,
}

impl DocumentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, path: impl Into<DocPath>, value: Value) -> Self {
        self.ops.push((path.into(), PatchOp::Set(value)));
        self
    }

    #[must_use]
    pub fn remove(mut self, path: impl Into<DocPath>) -> Self {
        self.ops.push((path.into(), PatchOp::Remove));
        self
    }

    #[must_use]
    pub fn modify<F>(mut self, path: impl Into<DocPath>, f: F) -> Self
    where
        F: Fn(&mut Value) + 'static,
    {
        self.ops.push((path.into(), PatchOp::Modify(Box::new(f))));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply all edits in recording order.
    pub fn apply(&self, doc: &mut Value) -> Result<()> {
        for (path, op) in &self.ops {
            match op {
                PatchOp::Set(value) => set_at(doc, path, value.clone())?,
                PatchOp::Remove => {
                    remove_at(doc, path);
                }
                PatchOp::Modify(f) => modify_at(doc, path, |slot| f(slot))?,
            }
        }
        Ok(())
    }

    /// Apply to a copy of `doc`.
    pub fn applied_to(&self, doc: &Value) -> Result<Value> {
        let mut copy = doc.clone();
        self.apply(&mut copy)?;
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn get_reads_nested_values() {
        let doc = json!({"model": {"rows": [{"name": "foo"}, {"name": "bar"}]}});
        let path = DocPath::parse_dotted("model.rows.1.name");
        assert_eq!(get_at(&doc, &path), Some(&json!("bar")));
        assert_eq!(get_at(&doc, &DocPath::parse_dotted("model.rows.2.name")), None);
        assert_eq!(array_len(&doc, &DocPath::parse_dotted("model.rows")), 2);
        assert_eq!(array_len(&doc, &DocPath::parse_dotted("model.missing")), 0);
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut doc = json!({});
        set_at(&mut doc, &DocPath::parse_dotted("model.group.flag"), json!(true)).unwrap();
        assert_eq!(doc, json!({"model": {"group": {"flag": true}}}));
    }

    #[test]
    fn set_appends_at_array_end_only() {
        let mut doc = json!({"rows": []});
        set_at(&mut doc, &DocPath::parse_dotted("rows.0"), json!(1)).unwrap();
        let err = set_at(&mut doc, &DocPath::parse_dotted("rows.5"), json!(2)).unwrap_err();
        assert_eq!(
            err,
            DocumentError::IndexOutOfBounds {
                path: "rows".to_string(),
                index: 5,
                len: 1
            }
        );
    }

    #[test]
    fn set_refuses_to_descend_into_scalars() {
        let mut doc = json!({"model": {"first": "a"}});
        let err = set_at(&mut doc, &DocPath::parse_dotted("model.first.x"), json!(1)).unwrap_err();
        assert!(matches!(err, DocumentError::NotAContainer { found: "string", .. }));
    }

    #[test]
    fn remove_drops_array_elements() {
        let mut doc = json!({"rows": [1, 2, 3]});
        assert_eq!(remove_at(&mut doc, &DocPath::parse_dotted("rows.1")), Some(json!(2)));
        assert_eq!(doc, json!({"rows": [1, 3]}));
    }

    #[test]
    fn leaves_are_listed_in_document_order() {
        let doc = json!({"a": {"b": 1, "c": []}, "d": ["x"]});
        let listed: Vec<String> = leaves(&doc).into_iter().map(|(p, _)| p.to_dotted()).collect();
        assert_eq!(listed, vec!["a.b", "a.c", "d.0"]);
    }

    #[test]
    fn patch_applies_edits_in_order() {
        let doc = json!({"model": {"count": 1, "name": "n"}});
        let patched = DocumentPatch::new()
            .modify("model.count", |v| *v = json!(v.as_i64().unwrap_or(0) + 1))
            .remove("model.name")
            .set("view.x", json!("y"))
            .applied_to(&doc)
            .unwrap();
        insta::assert_json_snapshot!(patched, @r#"
        {
          "model": {
            "count": 2
          },
          "view": {
            "x": "y"
          }
        }
        "#);
    }
}
