//! Predicate compilation into JSON-Forms rule conditions.
//!
//! Output shapes:
//!
//! - field test: `{"scope": "...", "schema": {...}}`
//! - constants: `{"schema": {}}` (always) and `{"schema": {"not": {}}}` (never)
//! - combinators: `{"type": "AND" | "OR", "conditions": [...]}`
//!
//! Negation is pushed down to the field tests (De Morgan), so a compiled
//! condition never contains a negated compound.

use dialog_model::{
    DialogError, EffectSpec, FieldEntry, FieldId, FieldIndex, FieldTest, NodeContext, Predicate,
    PredicateInitializer, Reference, ReferenceResolver, Result, ValueType,
};
use serde_json::{Map, Value, json};

/// Where a compiled condition is used: the scope of the element carrying the
/// effect and the arrays enclosing it.
#[derive(Debug, Clone, Copy)]
pub struct UsageSite<'a> {
    pub scope: &'a str,
    pub array_chain: &'a [FieldId],
}

impl<'a> UsageSite<'a> {
    /// Usage site of an indexed field.
    pub fn of(entry: &'a FieldEntry<'_>) -> Self {
        Self {
            scope: entry.scope.as_str(),
            array_chain: &entry.array_chain,
        }
    }

    /// Usage site outside any array.
    pub fn top_level(scope: &'a str) -> Self {
        Self {
            scope,
            array_chain: &[],
        }
    }
}

/// Compiles predicates against one settings tree.
#[derive(Debug, Clone, Copy)]
pub struct ConditionCompiler<'a, 't> {
    index: &'a FieldIndex<'t>,
    resolver: &'a ReferenceResolver,
}

impl<'a, 't> ConditionCompiler<'a, 't> {
    pub fn new(index: &'a FieldIndex<'t>, resolver: &'a ReferenceResolver) -> Self {
        Self { index, resolver }
    }

    /// Compile `predicate` into a rule condition.
    pub fn compile(&self, predicate: &Predicate, site: UsageSite<'_>) -> Result<Value> {
        self.condition(predicate, false, site)
    }

    /// Compile an effect into a `{"effect", "condition"}` rule.
    pub fn compile_effect(
        &self,
        effect: &EffectSpec,
        site: UsageSite<'_>,
        context: Option<&NodeContext>,
    ) -> Result<Value> {
        let initializer = PredicateInitializer::new(self.resolver, context);
        let predicate = effect.provider.init(&initializer);
        let condition = self.compile(&predicate, site)?;
        Ok(json!({ "effect": effect.kind, "condition": condition }))
    }

    fn condition(&self, predicate: &Predicate, negated: bool, site: UsageSite<'_>) -> Result<Value> {
        match predicate {
            Predicate::Always => Ok(constant(!negated)),
            Predicate::Never => Ok(constant(negated)),
            Predicate::Not { predicate } => self.condition(predicate, !negated, site),
            Predicate::And { predicates } => self.junction(predicates, true, negated, site),
            Predicate::Or { predicates } => self.junction(predicates, false, negated, site),
            Predicate::Field { reference, test } => {
                let entry = self.field(reference, site)?;
                let scope = self.reachable_scope(entry, reference, site)?;
                let schema = self.test_schema(entry, reference, test, site)?;
                Ok(json!({ "scope": scope, "schema": negate_schema(schema, negated) }))
            }
        }
    }

    fn junction(
        &self,
        predicates: &[Predicate],
        conjunction: bool,
        negated: bool,
        site: UsageSite<'_>,
    ) -> Result<Value> {
        match predicates {
            [] => Ok(constant(conjunction != negated)),
            [single] => self.condition(single, negated, site),
            many => {
                let conditions = many
                    .iter()
                    .map(|p| self.condition(p, negated, site))
                    .collect::<Result<Vec<_>>>()?;
                let kind = if conjunction != negated { "AND" } else { "OR" };
                Ok(json!({ "type": kind, "conditions": conditions }))
            }
        }
    }

    fn field(&self, reference: &Reference, site: UsageSite<'_>) -> Result<&'a FieldEntry<'t>> {
        let id = self.resolver.resolve(reference, site.scope)?;
        self.index
            .get(id)
            .ok_or_else(|| DialogError::UnboundReference {
                reference: reference.to_string(),
                usage_site: site.scope.to_string(),
            })
    }

    fn reachable_scope(
        &self,
        entry: &FieldEntry<'_>,
        reference: &Reference,
        site: UsageSite<'_>,
    ) -> Result<String> {
        if entry.array_chain.is_empty() {
            Ok(entry.scope.to_string())
        } else if entry.array_chain == site.array_chain {
            Ok(entry.relative_scope.to_string())
        } else {
            Err(DialogError::ScopeOutOfReach {
                reference: reference.to_string(),
                usage_site: site.scope.to_string(),
            })
        }
    }

    fn test_schema(
        &self,
        entry: &FieldEntry<'_>,
        reference: &Reference,
        test: &FieldTest,
        site: UsageSite<'_>,
    ) -> Result<Value> {
        let value_type = entry.value_type();
        let unsupported = |required: &'static str| DialogError::UnsupportedCondition {
            condition: test.name(),
            reference: reference.to_string(),
            required,
            actual: value_type.to_string(),
            usage_site: site.scope.to_string(),
        };
        let schema = match test {
            FieldTest::IsTrue | FieldTest::IsFalse => {
                if value_type != ValueType::Boolean {
                    return Err(unsupported("a boolean field"));
                }
                json!({ "const": matches!(test, FieldTest::IsTrue) })
            }
            FieldTest::Equals { value } => {
                if value_type == ValueType::Button || !value_type.accepts(value) {
                    return Err(unsupported("a value of the field's type"));
                }
                json!({ "const": value })
            }
            FieldTest::MatchesPattern { pattern } => {
                if !matches!(value_type, ValueType::String | ValueType::Enum(_)) {
                    return Err(unsupported("a string field"));
                }
                if regex::Regex::new(pattern).is_err() {
                    return Err(unsupported("a valid regular expression"));
                }
                json!({ "pattern": pattern })
            }
            FieldTest::IsOneOf { values } => {
                if !(value_type.is_numeric() || matches!(value_type, ValueType::String | ValueType::Enum(_))) {
                    return Err(unsupported("a string, enum or number field"));
                }
                json!({ "enum": values })
            }
            FieldTest::HasMultipleItems => {
                if !value_type.is_array_like() {
                    return Err(unsupported("an array field"));
                }
                json!({ "minItems": 2 })
            }
            FieldTest::IsGreaterThan { bound, inclusive } => {
                if !value_type.is_numeric() {
                    return Err(unsupported("a numeric field"));
                }
                let key = if *inclusive { "minimum" } else { "exclusiveMinimum" };
                json!({ key: bound })
            }
            FieldTest::IsLessThan { bound, inclusive } => {
                if !value_type.is_numeric() {
                    return Err(unsupported("a numeric field"));
                }
                let key = if *inclusive { "maximum" } else { "exclusiveMaximum" };
                json!({ key: bound })
            }
            FieldTest::ContainsElementSatisfying { predicate } => {
                if !entry.node.is_array() {
                    return Err(unsupported("an array of settings groups"));
                }
                json!({ "contains": self.element_schema(predicate, entry.id, false, site)? })
            }
        };
        Ok(schema)
    }

    /// Schema an array element must satisfy for `predicate` to hold.
    fn element_schema(
        &self,
        predicate: &Predicate,
        array: FieldId,
        negated: bool,
        site: UsageSite<'_>,
    ) -> Result<Value> {
        match predicate {
            Predicate::Always => Ok(constant_schema(!negated)),
            Predicate::Never => Ok(constant_schema(negated)),
            Predicate::Not { predicate } => self.element_schema(predicate, array, !negated, site),
            Predicate::And { predicates } | Predicate::Or { predicates } => {
                let conjunction = matches!(predicate, Predicate::And { .. });
                match predicates.as_slice() {
                    [] => Ok(constant_schema(conjunction != negated)),
                    [single] => self.element_schema(single, array, negated, site),
                    many => {
                        let schemas = many
                            .iter()
                            .map(|p| self.element_schema(p, array, negated, site))
                            .collect::<Result<Vec<_>>>()?;
                        let key = if conjunction != negated { "allOf" } else { "anyOf" };
                        Ok(json!({ key: schemas }))
                    }
                }
            }
            Predicate::Field { reference, test } => {
                let entry = self.field(reference, site)?;
                if entry.array_chain.last() != Some(&array) {
                    return Err(DialogError::ScopeOutOfReach {
                        reference: reference.to_string(),
                        usage_site: site.scope.to_string(),
                    });
                }
                let schema = negate_schema(self.test_schema(entry, reference, test, site)?, negated);
                Ok(entry
                    .local_path
                    .iter()
                    .rev()
                    .fold(schema, |inner, name| {
                        let mut properties = Map::new();
                        properties.insert(name.clone(), inner);
                        json!({ "properties": properties })
                    }))
            }
        }
    }
}

fn constant_schema(holds: bool) -> Value {
    if holds { json!({}) } else { json!({ "not": {} }) }
}

fn constant(holds: bool) -> Value {
    json!({ "schema": constant_schema(holds) })
}

fn negate_schema(schema: Value, negated: bool) -> Value {
    if negated { json!({ "not": schema }) } else { schema }
}

#[cfg(test)]
mod tests {
    use dialog_model::{SettingsGroup, SettingsNode, SettingsTree, SettingsType};

    use super::*;

    const FLAG: Reference = Reference::new("flag", ValueType::Boolean);
    const NAME: Reference = Reference::new("name", ValueType::String);
    const COUNT: Reference = Reference::new("count", ValueType::Integer);

    fn tree() -> SettingsTree {
        SettingsTree::new().with(
            SettingsType::Model,
            SettingsGroup::new("Settings")
                .with_field(SettingsNode::leaf("flag", ValueType::Boolean).with_reference(FLAG))
                .with_field(SettingsNode::leaf("name", ValueType::String).with_reference(NAME))
                .with_field(SettingsNode::leaf("count", ValueType::Integer).with_reference(COUNT)),
        )
    }

    fn compile(predicate: &Predicate) -> Result<Value> {
        let tree = tree();
        let index = FieldIndex::build(&tree);
        let resolver = ReferenceResolver::new(&index);
        ConditionCompiler::new(&index, &resolver)
            .compile(predicate, UsageSite::top_level("#/properties/model/properties/target"))
    }

    #[test]
    fn boolean_leaf() {
        assert_eq!(
            compile(&FLAG.is_true()).unwrap(),
            json!({"scope": "#/properties/model/properties/flag", "schema": {"const": true}})
        );
    }

    #[test]
    fn constants_have_no_scope() {
        assert_eq!(compile(&Predicate::always()).unwrap(), json!({"schema": {}}));
        assert_eq!(compile(&!Predicate::always()).unwrap(), json!({"schema": {"not": {}}}));
        assert_eq!(compile(&!!Predicate::never()).unwrap(), json!({"schema": {"not": {}}}));
    }

    #[test]
    fn negated_conjunction_becomes_disjunction() {
        let compiled = compile(&!Predicate::and([FLAG.is_true(), NAME.matches_pattern("a.*")])).unwrap();
        insta::assert_json_snapshot!(compiled, @r##"
        {
          "conditions": [
            {
              "schema": {
                "not": {
                  "const": true
                }
              },
              "scope": "#/properties/model/properties/flag"
            },
            {
              "schema": {
                "not": {
                  "pattern": "a.*"
                }
              },
              "scope": "#/properties/model/properties/name"
            }
          ],
          "type": "OR"
        }
        "##);
    }

    #[test]
    fn numeric_bounds() {
        let predicate = Predicate::field(
            &COUNT,
            FieldTest::IsGreaterThan {
                bound: 2.0,
                inclusive: true,
            },
        );
        assert_eq!(
            compile(&predicate).unwrap()["schema"],
            json!({"minimum": 2.0})
        );
        assert_eq!(
            compile(&COUNT.is_less_than(5.0)).unwrap()["schema"],
            json!({"exclusiveMaximum": 5.0})
        );
    }

    #[test]
    fn unsupported_conditions() {
        let err = compile(&NAME.is_true()).unwrap_err();
        assert!(matches!(
            err,
            DialogError::UnsupportedCondition { condition: "isTrue", required: "a boolean field", .. }
        ));
        assert!(compile(&COUNT.is_equal_to("three")).is_err());
    }

    #[test]
    fn unbound_reference_names_the_target_scope() {
        let err = compile(&Reference::new("gone", ValueType::Boolean).is_true()).unwrap_err();
        assert_eq!(
            err,
            DialogError::UnboundReference {
                reference: "gone".to_string(),
                usage_site: "#/properties/model/properties/target".to_string(),
            }
        );
    }
}
