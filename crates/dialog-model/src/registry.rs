//! Named state-provider factories.
//!
//! Tree descriptors refer to providers by name. The registry maps those names
//! to factories; it is an ordinary value built with explicit `register` calls
//! and handed to whatever loads descriptors.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{DialogError, Result};
use crate::provider::StateProvider;

/// Builds a provider from the descriptor's `params` block.
pub type ProviderFactory = Arc<dyn Fn(&Value) -> Result<Arc<dyn StateProvider>> + Send + Sync>;

/// Registry of provider factories indexed by name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one under the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Value) -> Result<Arc<dyn StateProvider>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Arc<dyn StateProvider>> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate the provider registered as `name`.
    pub fn create(&self, name: &str, params: &Value, usage_site: &str) -> Result<Arc<dyn StateProvider>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| DialogError::UnknownProvider {
                name: name.to_string(),
                usage_site: usage_site.to_string(),
            })?;
        factory(params).map_err(|error| match error {
            DialogError::InvalidDescriptor { message, .. } => {
                DialogError::invalid_descriptor(usage_site, format!("provider '{name}': {message}"))
            }
            other => other,
        })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Parameter lookup error for provider factories.
pub fn invalid_params(message: impl Into<String>) -> DialogError {
    DialogError::invalid_descriptor("params", message)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::provider::state_provider;

    fn constant(params: &Value) -> Result<Arc<dyn StateProvider>> {
        let value = params
            .get("value")
            .cloned()
            .ok_or_else(|| invalid_params("missing 'value'"))?;
        Ok(state_provider(
            "constant",
            |init| init.compute_before_open_dialog(),
            move |_| Ok(value.clone()),
        ))
    }

    #[test]
    fn unknown_names_are_reported_with_their_usage_site() {
        let registry = ProviderRegistry::new().with("constant", constant);
        assert!(registry.contains("constant"));
        let err = registry.create("missing", &json!({}), "model.first").err().unwrap();
        assert_eq!(
            err,
            DialogError::UnknownProvider {
                name: "missing".to_string(),
                usage_site: "model.first".to_string(),
            }
        );
    }

    #[test]
    fn parameter_errors_name_the_provider() {
        let registry = ProviderRegistry::new().with("constant", constant);
        let err = registry.create("constant", &json!({}), "model.first").err().unwrap();
        assert_eq!(
            err.to_string(),
            "invalid settings descriptor at model.first: provider 'constant': missing 'value'"
        );
    }
}
