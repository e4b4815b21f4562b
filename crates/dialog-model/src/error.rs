//! Build-time error taxonomy.
//!
//! Every variant aborts the request that raised it: no partial dialog
//! description is ever produced for a malformed settings tree.

use thiserror::Error;

/// Configuration errors detected while building a dialog from a settings tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DialogError {
    /// A reference is used but no field declares it.
    #[error("reference '{reference}' used by {usage_site} is not bound to any field")]
    UnboundReference {
        reference: String,
        usage_site: String,
    },

    /// A reference is declared by several fields and the usage does not say which one.
    #[error(
        "reference '{reference}' used by {usage_site} is bound by {candidates} fields; \
         qualify it with its declaring class"
    )]
    AmbiguousReference {
        reference: String,
        usage_site: String,
        candidates: usize,
    },

    /// Declared and actual value types disagree.
    #[error("reference '{reference}' expects type {expected} but {usage_site} has type {actual}")]
    TypeMismatch {
        reference: String,
        expected: String,
        actual: String,
        usage_site: String,
    },

    /// A value provider declares a result type the target field cannot hold.
    #[error("state provider '{provider}' produces {actual} but {usage_site} has type {expected}")]
    ProviderOutputMismatch {
        provider: String,
        expected: String,
        actual: String,
        usage_site: String,
    },

    /// Value providers feed each other in a loop.
    #[error("state providers form a cycle through {scopes}")]
    CyclicDependency { scopes: String },

    /// A predicate test cannot be applied to the referenced field.
    #[error("condition '{condition}' on reference '{reference}' needs {required} but the field has type {actual} ({usage_site})")]
    UnsupportedCondition {
        condition: &'static str,
        reference: String,
        required: &'static str,
        actual: String,
        usage_site: String,
    },

    /// A predicate refers to a field that lives in array elements the usage site cannot see.
    #[error("reference '{reference}' lives inside an array not enclosing {usage_site}")]
    ScopeOutOfReach {
        reference: String,
        usage_site: String,
    },

    /// A tree descriptor names a provider that is not registered.
    #[error("no state provider registered under '{name}' (used by {usage_site})")]
    UnknownProvider { name: String, usage_site: String },

    /// A tree descriptor or provider parameter block is malformed.
    #[error("invalid settings descriptor at {location}: {message}")]
    InvalidDescriptor { location: String, message: String },
}

impl DialogError {
    pub(crate) fn invalid_descriptor(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            location: location.into(),
            message: message.into(),
        }
    }

    /// The offending reference identity, when the error is about one.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::UnboundReference { reference, .. }
            | Self::AmbiguousReference { reference, .. }
            | Self::TypeMismatch { reference, .. }
            | Self::UnsupportedCondition { reference, .. }
            | Self::ScopeOutOfReach { reference, .. } => Some(reference),
            Self::ProviderOutputMismatch { .. }
            | Self::CyclicDependency { .. }
            | Self::UnknownProvider { .. }
            | Self::InvalidDescriptor { .. } => None,
        }
    }

    /// True for errors caused by how the settings are declared, as opposed to
    /// malformed descriptor input.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::InvalidDescriptor { .. } | Self::UnknownProvider { .. })
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::UnboundReference { .. } => {
                Some("Declare the reference on exactly one field, or guard the usage with is_missing.")
            }
            Self::AmbiguousReference { .. } => {
                Some("Use Reference::qualified to name the class that declares the intended field.")
            }
            Self::TypeMismatch { .. } => {
                Some("Make the reference's value type match the type of the field that declares it.")
            }
            Self::ProviderOutputMismatch { .. } => {
                Some("Attach the provider to a field of its output type, or target a UI option instead.")
            }
            Self::CyclicDependency { .. } => {
                Some("Break the loop by reading one of the values with get_value_supplier instead.")
            }
            Self::UnsupportedCondition { .. } => None,
            Self::ScopeOutOfReach { .. } => {
                Some("Use contains_element_satisfying on the enclosing array reference.")
            }
            Self::UnknownProvider { .. } => Some("Register the provider factory before loading the tree."),
            Self::InvalidDescriptor { .. } => None,
        }
    }
}

/// Result type alias for dialog construction.
pub type Result<T> = std::result::Result<T, DialogError>;

/// Raised by a state provider when it cannot produce a value.
///
/// The update engine treats this per provider: the failing update is left out
/// and the rest of the batch is still computed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StateComputationFailure {
    pub message: String,
}

impl StateComputationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Failure for a dependency value that was not supplied.
    pub fn missing_value(reference: &str) -> Self {
        Self::new(format!("no value available for reference '{reference}'"))
    }
}
