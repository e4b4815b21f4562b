//! Predicate evaluation against dialog data.
//!
//! Mirrors what a front end does with a compiled condition, so the active
//! state of an effect can be checked without one.

use dialog_common::get_at;
use dialog_model::{
    DialogError, FieldEntry, FieldId, FieldIndex, FieldTest, Predicate, Reference,
    ReferenceResolver, Result,
};
use regex::Regex;
use serde_json::Value;

use crate::compiler::UsageSite;

/// Evaluates predicates over data documents keyed by settings type.
#[derive(Debug, Clone, Copy)]
pub struct PredicateEvaluator<'a, 't> {
    index: &'a FieldIndex<'t>,
    resolver: &'a ReferenceResolver,
}

impl<'a, 't> PredicateEvaluator<'a, 't> {
    pub fn new(index: &'a FieldIndex<'t>, resolver: &'a ReferenceResolver) -> Self {
        Self { index, resolver }
    }

    /// Evaluate `predicate` on `data` for an effect used at `site`. `indices`
    /// locate the array element the site sits in; fields of the arrays
    /// enclosing the site are read from that element. Fields inside other
    /// arrays are out of reach, as they are for the compiled condition.
    pub fn evaluate(
        &self,
        predicate: &Predicate,
        data: &Value,
        site: UsageSite<'_>,
        indices: &[usize],
    ) -> Result<bool> {
        match predicate {
            Predicate::Always => Ok(true),
            Predicate::Never => Ok(false),
            Predicate::Not { predicate } => Ok(!self.evaluate(predicate, data, site, indices)?),
            Predicate::And { predicates } => {
                for p in predicates {
                    if !self.evaluate(p, data, site, indices)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or { predicates } => {
                for p in predicates {
                    if self.evaluate(p, data, site, indices)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Field { reference, test } => {
                let entry = self.field(reference, site)?;
                if !entry.array_chain.is_empty() && entry.array_chain != site.array_chain {
                    return Err(DialogError::ScopeOutOfReach {
                        reference: reference.to_string(),
                        usage_site: site.scope.to_string(),
                    });
                }
                let value = self
                    .index
                    .data_path(entry.id, indices)
                    .and_then(|path| get_at(data, &path))
                    .unwrap_or(&Value::Null);
                self.test(test, value, entry.id, site)
            }
        }
    }

    fn field(&self, reference: &Reference, site: UsageSite<'_>) -> Result<&'a FieldEntry<'t>> {
        let id = self.resolver.resolve(reference, site.scope)?;
        self.index.get(id).ok_or_else(|| DialogError::UnboundReference {
            reference: reference.to_string(),
            usage_site: site.scope.to_string(),
        })
    }

    fn test(&self, test: &FieldTest, value: &Value, field: FieldId, site: UsageSite<'_>) -> Result<bool> {
        Ok(match test {
            FieldTest::IsTrue => value == &Value::Bool(true),
            FieldTest::IsFalse => value == &Value::Bool(false),
            FieldTest::Equals { value: expected } => values_equal(value, expected),
            FieldTest::MatchesPattern { pattern } => match (value.as_str(), Regex::new(pattern)) {
                (Some(text), Ok(regex)) => regex.is_match(text),
                (_, Err(error)) => {
                    tracing::warn!(%pattern, %error, "invalid pattern in predicate");
                    false
                }
                (None, _) => false,
            },
            FieldTest::IsOneOf { values } => values.iter().any(|v| values_equal(value, v)),
            FieldTest::HasMultipleItems => value.as_array().is_some_and(|items| items.len() > 1),
            FieldTest::IsGreaterThan { bound, inclusive } => value
                .as_f64()
                .is_some_and(|n| if *inclusive { n >= *bound } else { n > *bound }),
            FieldTest::IsLessThan { bound, inclusive } => value
                .as_f64()
                .is_some_and(|n| if *inclusive { n <= *bound } else { n < *bound }),
            FieldTest::ContainsElementSatisfying { predicate } => {
                let Some(items) = value.as_array() else {
                    return Ok(false);
                };
                for element in items {
                    if self.evaluate_element(predicate, element, field, site)? {
                        return Ok(true);
                    }
                }
                false
            }
        })
    }

    /// Evaluate an element predicate of `array` with paths relative to `element`.
    fn evaluate_element(
        &self,
        predicate: &Predicate,
        element: &Value,
        array: FieldId,
        site: UsageSite<'_>,
    ) -> Result<bool> {
        match predicate {
            Predicate::Always => Ok(true),
            Predicate::Never => Ok(false),
            Predicate::Not { predicate } => Ok(!self.evaluate_element(predicate, element, array, site)?),
            Predicate::And { predicates } => {
                for p in predicates {
                    if !self.evaluate_element(p, element, array, site)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or { predicates } => {
                for p in predicates {
                    if self.evaluate_element(p, element, array, site)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Field { reference, test } => {
                let entry = self.field(reference, site)?;
                if entry.array_chain.last() != Some(&array) {
                    return Err(DialogError::ScopeOutOfReach {
                        reference: reference.to_string(),
                        usage_site: site.scope.to_string(),
                    });
                }
                let value = local_value(entry, element);
                tracing::trace!(reference = %reference, ?value, "element predicate");
                self.test(test, value, entry.id, site)
            }
        }
    }
}

fn local_value<'v>(entry: &FieldEntry<'_>, element: &'v Value) -> &'v Value {
    entry
        .local_path
        .iter()
        .try_fold(element, |current, key| current.get(key))
        .unwrap_or(&Value::Null)
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) if actual.is_number() && expected.is_number() => a == b,
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use dialog_model::{SettingsGroup, SettingsNode, SettingsTree, SettingsType, ValueType};
    use serde_json::json;

    use super::*;

    const ROWS: Reference = Reference::new("rows", ValueType::Array);
    const ROW_NAME: Reference = Reference::new("rowName", ValueType::String);
    const LIMIT: Reference = Reference::new("limit", ValueType::Double);

    fn tree() -> SettingsTree {
        SettingsTree::new().with(
            SettingsType::Model,
            SettingsGroup::new("Settings")
                .with_field(SettingsNode::leaf("limit", ValueType::Double).with_reference(LIMIT))
                .with_field(
                    SettingsNode::array(
                        "rows",
                        SettingsGroup::new("Row").with_field(
                            SettingsNode::leaf("name", ValueType::String).with_reference(ROW_NAME),
                        ),
                    )
                    .with_reference(ROWS),
                ),
        )
    }

    const SITE: UsageSite<'static> = UsageSite {
        scope: "#/properties/model/properties/limit",
        array_chain: &[],
    };

    #[test]
    fn evaluates_combinators_and_numbers() {
        let tree = tree();
        let index = FieldIndex::build(&tree);
        let resolver = ReferenceResolver::new(&index);
        let evaluator = PredicateEvaluator::new(&index, &resolver);
        let data = json!({"model": {"limit": 3, "rows": []}});

        assert!(evaluator.evaluate(&LIMIT.is_greater_than(2.5), &data, SITE, &[]).unwrap());
        assert!(evaluator.evaluate(&LIMIT.is_equal_to(3.0), &data, SITE, &[]).unwrap());
        assert!(!evaluator
            .evaluate(&Predicate::and([LIMIT.is_less_than(3.0), Predicate::always()]), &data, SITE, &[])
            .unwrap());
    }

    #[test]
    fn quantifies_over_array_elements() {
        let tree = tree();
        let index = FieldIndex::build(&tree);
        let resolver = ReferenceResolver::new(&index);
        let evaluator = PredicateEvaluator::new(&index, &resolver);
        let data = json!({"model": {"limit": 0, "rows": [{"name": "a"}, {"name": "bee"}]}});

        let long_name = ROWS.contains_element_satisfying(ROW_NAME.matches_pattern("^.{3}$"));
        assert!(evaluator.evaluate(&long_name, &data, SITE, &[]).unwrap());

        let row_name = index
            .entries()
            .iter()
            .find(|entry| entry.name() == "name")
            .unwrap();
        let in_row = UsageSite::of(row_name);
        assert!(evaluator.evaluate(&ROW_NAME.is_equal_to("bee"), &data, in_row, &[1]).unwrap());
        assert!(!evaluator.evaluate(&ROW_NAME.is_equal_to("bee"), &data, in_row, &[0]).unwrap());
    }

    #[test]
    fn array_fields_outside_the_usage_site_are_out_of_reach() {
        let tree = tree();
        let index = FieldIndex::build(&tree);
        let resolver = ReferenceResolver::new(&index);
        let evaluator = PredicateEvaluator::new(&index, &resolver);
        let data = json!({"model": {"limit": 0, "rows": [{"name": "bee"}]}});

        let err = evaluator
            .evaluate(&ROW_NAME.is_equal_to("bee"), &data, SITE, &[])
            .unwrap_err();
        assert_eq!(
            err,
            DialogError::ScopeOutOfReach {
                reference: "rowName".to_string(),
                usage_site: SITE.scope.to_string(),
            }
        );

        let stray = ROWS.contains_element_satisfying(LIMIT.is_greater_than(1.0));
        assert!(matches!(
            evaluator.evaluate(&stray, &data, SITE, &[]),
            Err(DialogError::ScopeOutOfReach { .. })
        ));
    }
}
