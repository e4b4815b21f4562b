//! JSON-Forms scope strings.
//!
//! Scopes address a property in the data schema: `#/properties/model/properties/first`.
//! Array element members go through `items`:
//! `#/properties/model/properties/rows/items/properties/name`.

use std::fmt;

const ROOT: &str = "#";

/// Incremental scope construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    raw: String,
}

impl Scope {
    /// The schema root, `#`.
    pub fn root() -> Self {
        Self {
            raw: ROOT.to_string(),
        }
    }

    #[must_use]
    pub fn property(mut self, name: &str) -> Self {
        self.raw.push_str("/properties/");
        self.raw.push_str(name);
        self
    }

    #[must_use]
    pub fn properties<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .fold(self, |scope, name| scope.property(name.as_ref()))
    }

    /// Step into the element schema of an array.
    #[must_use]
    pub fn items(mut self) -> Self {
        self.raw.push_str("/items");
        self
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_string(self) -> String {
        self.raw
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.raw
    }
}
