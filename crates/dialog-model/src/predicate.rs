//! Effect predicates.
//!
//! A [`Predicate`] is a boolean condition tree over referenced field values.
//! It decides whether an effect (show, hide, enable, disable) applies to a
//! UI element. Predicates are plain data; providers that need to look at the
//! dialog before choosing one implement [`PredicateProvider`].

use std::fmt;
use std::ops::Not;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::NodeContext;
use crate::reference::Reference;

/// Comparison applied to a single referenced value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldTest {
    IsTrue,
    IsFalse,
    Equals {
        value: Value,
    },
    MatchesPattern {
        pattern: String,
    },
    IsOneOf {
        values: Vec<Value>,
    },
    HasMultipleItems,
    IsGreaterThan {
        bound: f64,
        #[serde(default)]
        inclusive: bool,
    },
    IsLessThan {
        bound: f64,
        #[serde(default)]
        inclusive: bool,
    },
    /// Array quantifier: some element satisfies the element predicate.
    ContainsElementSatisfying {
        predicate: Box<Predicate>,
    },
}

impl FieldTest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::IsTrue => "isTrue",
            Self::IsFalse => "isFalse",
            Self::Equals { .. } => "equals",
            Self::MatchesPattern { .. } => "matchesPattern",
            Self::IsOneOf { .. } => "isOneOf",
            Self::HasMultipleItems => "hasMultipleItems",
            Self::IsGreaterThan { .. } => "isGreaterThan",
            Self::IsLessThan { .. } => "isLessThan",
            Self::ContainsElementSatisfying { .. } => "containsElementSatisfying",
        }
    }
}

/// Boolean condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Predicate {
    Always,
    Never,
    Field { reference: Reference, test: FieldTest },
    And { predicates: Vec<Predicate> },
    Or { predicates: Vec<Predicate> },
    Not { predicate: Box<Predicate> },
}

impl Predicate {
    pub fn always() -> Self {
        Self::Always
    }

    pub fn never() -> Self {
        Self::Never
    }

    pub fn field(reference: &Reference, test: FieldTest) -> Self {
        Self::Field {
            reference: reference.clone(),
            test,
        }
    }

    pub fn and<I>(predicates: I) -> Self
    where
        I: IntoIterator<Item = Predicate>,
    {
        Self::And {
            predicates: predicates.into_iter().collect(),
        }
    }

    pub fn or<I>(predicates: I) -> Self
    where
        I: IntoIterator<Item = Predicate>,
    {
        Self::Or {
            predicates: predicates.into_iter().collect(),
        }
    }

    /// Conjunction with `other`.
    #[must_use]
    pub fn and_also(self, other: Predicate) -> Self {
        Self::and([self, other])
    }

    /// Disjunction with `other`.
    #[must_use]
    pub fn or_else(self, other: Predicate) -> Self {
        Self::or([self, other])
    }

    /// References read by this predicate, in declaration order.
    ///
    /// References inside array element predicates are not included; they are
    /// resolved relative to the element.
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Self::Always | Self::Never => {}
            Self::Field { reference, .. } => out.push(reference),
            Self::And { predicates } | Self::Or { predicates } => {
                for predicate in predicates {
                    predicate.collect_references(out);
                }
            }
            Self::Not { predicate } => predicate.collect_references(out),
        }
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        Predicate::Not {
            predicate: Box::new(self),
        }
    }
}

impl Reference {
    pub fn is_true(&self) -> Predicate {
        Predicate::field(self, FieldTest::IsTrue)
    }

    pub fn is_false(&self) -> Predicate {
        Predicate::field(self, FieldTest::IsFalse)
    }

    pub fn is_equal_to(&self, value: impl Into<Value>) -> Predicate {
        Predicate::field(
            self,
            FieldTest::Equals {
                value: value.into(),
            },
        )
    }

    pub fn matches_pattern(&self, pattern: impl Into<String>) -> Predicate {
        Predicate::field(
            self,
            FieldTest::MatchesPattern {
                pattern: pattern.into(),
            },
        )
    }

    pub fn is_one_of<I, V>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::field(
            self,
            FieldTest::IsOneOf {
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn has_multiple_items(&self) -> Predicate {
        Predicate::field(self, FieldTest::HasMultipleItems)
    }

    pub fn is_greater_than(&self, bound: f64) -> Predicate {
        Predicate::field(
            self,
            FieldTest::IsGreaterThan {
                bound,
                inclusive: false,
            },
        )
    }

    pub fn is_less_than(&self, bound: f64) -> Predicate {
        Predicate::field(
            self,
            FieldTest::IsLessThan {
                bound,
                inclusive: false,
            },
        )
    }

    pub fn contains_element_satisfying(&self, element: Predicate) -> Predicate {
        Predicate::field(
            self,
            FieldTest::ContainsElementSatisfying {
                predicate: Box::new(element),
            },
        )
    }
}

/// Answers whether a reference is bound anywhere in the dialog.
pub trait ReferenceLookup {
    fn is_bound(&self, reference: &Reference) -> bool;
}

/// Capability object handed to [`PredicateProvider::init`].
pub struct PredicateInitializer<'a> {
    lookup: &'a dyn ReferenceLookup,
    context: Option<&'a NodeContext>,
}

impl<'a> PredicateInitializer<'a> {
    pub fn new(lookup: &'a dyn ReferenceLookup, context: Option<&'a NodeContext>) -> Self {
        Self { lookup, context }
    }

    /// True when no field declares `reference`. Lets a provider fall back to
    /// [`Predicate::always`] or [`Predicate::never`] instead of failing.
    pub fn is_missing(&self, reference: &Reference) -> bool {
        !self.lookup.is_bound(reference)
    }

    pub fn context(&self) -> Option<&'a NodeContext> {
        self.context
    }
}

/// Source of an effect predicate.
pub trait PredicateProvider: Send + Sync {
    fn init(&self, initializer: &PredicateInitializer<'_>) -> Predicate;
}

impl PredicateProvider for Predicate {
    fn init(&self, _initializer: &PredicateInitializer<'_>) -> Predicate {
        self.clone()
    }
}

struct PredicateFn<F>(F);

impl<F> PredicateProvider for PredicateFn<F>
where
    F: Fn(&PredicateInitializer<'_>) -> Predicate + Send + Sync,
{
    fn init(&self, initializer: &PredicateInitializer<'_>) -> Predicate {
        (self.0)(initializer)
    }
}

/// Wrap a closure as a predicate provider.
pub fn predicate_provider<F>(f: F) -> Arc<dyn PredicateProvider>
where
    F: Fn(&PredicateInitializer<'_>) -> Predicate + Send + Sync + 'static,
{
    Arc::new(PredicateFn(f))
}

/// What an effect does when its predicate holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectKind {
    Show,
    Hide,
    Enable,
    Disable,
}

/// Effect attached to a field or section.
#[derive(Clone)]
pub struct EffectSpec {
    pub kind: EffectKind,
    pub provider: Arc<dyn PredicateProvider>,
}

impl EffectSpec {
    pub fn new(kind: EffectKind, provider: Arc<dyn PredicateProvider>) -> Self {
        Self { kind, provider }
    }

    /// Effect with a fixed predicate.
    pub fn when(kind: EffectKind, predicate: Predicate) -> Self {
        Self {
            kind,
            provider: Arc::new(predicate),
        }
    }
}

impl fmt::Debug for EffectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectSpec")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::value::ValueType;

    const FLAG: Reference = Reference::new("flag", ValueType::Boolean);
    const NAME: Reference = Reference::new("name", ValueType::String);

    #[test]
    fn builders_compose() {
        let predicate = !(FLAG.is_true().and_also(NAME.is_equal_to("x")));
        let Predicate::Not { predicate: inner } = &predicate else {
            panic!("expected a negation");
        };
        assert!(matches!(inner.as_ref(), Predicate::And { predicates } if predicates.len() == 2));
        let ids: Vec<&str> = predicate.references().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["flag", "name"]);
    }

    #[test]
    fn predicates_load_from_json() {
        let predicate: Predicate = serde_json::from_value(json!({
            "type": "or",
            "predicates": [
                {"type": "field", "reference": {"id": "flag", "type": "boolean"}, "test": {"kind": "isTrue"}},
                {"type": "never"}
            ]
        }))
        .unwrap();
        assert_eq!(predicate, Predicate::or([FLAG.is_true(), Predicate::never()]));
    }
}
