//! Reference identities.
//!
//! A field declares a [`Reference`] to make its value available to state
//! providers and effect predicates elsewhere in the dialog, without those
//! consumers naming the field itself.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::ValueType;

/// Identity token of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(Cow<'static, str>);

impl RefId {
    pub const fn new(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RefId {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed reference to a field value.
///
/// References are usually declared as constants next to the settings they
/// belong to:
///
/// ```
/// use dialog_model::{Reference, ValueType};
///
/// pub const FIRST: Reference = Reference::new("first", ValueType::String);
/// ```
///
/// When the same settings group is embedded more than once, a usage names the
/// declaring class with [`Reference::qualified`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub id: RefId,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<Cow<'static, str>>,
}

impl Reference {
    pub const fn new(id: &'static str, value_type: ValueType) -> Self {
        Self {
            id: RefId::new(id),
            value_type,
            within: None,
        }
    }

    /// Reference restricted to fields enclosed by the group class `class_name`.
    pub const fn qualified(id: &'static str, value_type: ValueType, class_name: &'static str) -> Self {
        Self {
            id: RefId::new(id),
            value_type,
            within: Some(Cow::Borrowed(class_name)),
        }
    }

    pub fn owned(id: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id: RefId::from(id.into()),
            value_type,
            within: None,
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn declaring_class(&self) -> Option<&str> {
        self.within.as_deref()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.within {
            Some(class_name) => write!(f, "{class_name}::{}", self.id),
            None => write!(f, "{}", self.id),
        }
    }
}
