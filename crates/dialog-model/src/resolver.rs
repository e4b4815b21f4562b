//! Reference resolution.
//!
//! Maps every declared [`Reference`] identity to the field that declares it.
//! Resolution fails when nothing declares the identity, when several fields
//! declare it and the usage does not name a declaring class, or when the
//! declared value type disagrees with the field.

use std::collections::HashMap;

use crate::error::{DialogError, Result};
use crate::index::{FieldId, FieldIndex};
use crate::predicate::ReferenceLookup;
use crate::reference::{RefId, Reference};
use crate::value::ValueType;

/// Lookup from reference identity to declaring field.
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    declared: HashMap<RefId, Vec<FieldId>>,
    /// Enclosing class names per candidate field.
    classes: HashMap<FieldId, Vec<String>>,
    types: HashMap<FieldId, ValueType>,
}

impl ReferenceResolver {
    pub fn new(index: &FieldIndex<'_>) -> Self {
        let mut resolver = Self::default();
        for entry in index.entries() {
            let Some(reference) = &entry.node.reference else {
                continue;
            };
            resolver
                .declared
                .entry(reference.id.clone())
                .or_default()
                .push(entry.id);
            resolver
                .classes
                .insert(entry.id, entry.enclosing_classes.clone());
            resolver.types.insert(entry.id, entry.value_type());
        }
        resolver
    }

    fn candidates(&self, reference: &Reference) -> Vec<FieldId> {
        let Some(fields) = self.declared.get(&reference.id) else {
            return Vec::new();
        };
        match reference.declaring_class() {
            None => fields.clone(),
            Some(class_name) => fields
                .iter()
                .copied()
                .filter(|id| {
                    self.classes
                        .get(id)
                        .is_some_and(|classes| classes.iter().any(|c| c == class_name))
                })
                .collect(),
        }
    }

    /// Field bound to `reference`. `usage_site` names the consumer for error messages.
    pub fn resolve(&self, reference: &Reference, usage_site: &str) -> Result<FieldId> {
        let candidates = self.candidates(reference);
        let id = match candidates.as_slice() {
            [] => {
                return Err(DialogError::UnboundReference {
                    reference: reference.to_string(),
                    usage_site: usage_site.to_string(),
                });
            }
            [id] => *id,
            many => {
                return Err(DialogError::AmbiguousReference {
                    reference: reference.to_string(),
                    usage_site: usage_site.to_string(),
                    candidates: many.len(),
                });
            }
        };
        let actual = &self.types[&id];
        if *actual != reference.value_type {
            return Err(DialogError::TypeMismatch {
                reference: reference.to_string(),
                expected: reference.value_type.to_string(),
                actual: actual.to_string(),
                usage_site: usage_site.to_string(),
            });
        }
        Ok(id)
    }
}

impl ReferenceLookup for ReferenceResolver {
    fn is_bound(&self, reference: &Reference) -> bool {
        !self.candidates(reference).is_empty()
    }
}
