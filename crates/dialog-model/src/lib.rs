//! Settings model for generated node dialogs.
//!
//! This crate defines what a dialog is built from:
//!
//! - **node**: the settings tree ([`SettingsTree`], [`SettingsGroup`], [`SettingsNode`])
//! - **index**: pre-order [`FieldIndex`] with scopes and data paths
//! - **reference** / **resolver**: typed value references and their resolution
//! - **provider**: the [`StateProvider`] declaration and computation API
//! - **predicate**: effect predicates and [`PredicateProvider`]
//! - **validation** / **value**: leaf value types and validators
//! - **context**: ambient [`NodeContext`] with port specs and flow variables
//! - **registry** / **descriptor**: JSON-loadable trees with named providers
//! - **error**: the build-time [`DialogError`] taxonomy

pub mod context;
pub mod descriptor;
pub mod error;
pub mod index;
pub mod node;
pub mod predicate;
pub mod provider;
pub mod reference;
pub mod registry;
pub mod resolver;
pub mod settings_type;
pub mod validation;
pub mod value;

pub use context::{
    ColumnSpec, FlowValue, FlowVariable, FlowVariables, NodeContext, PortSpec, flow_variables,
};
pub use descriptor::{
    EffectDescriptor, FieldDescriptor, GroupDescriptor, ProviderDescriptor, RootDescriptor,
    TreeDescriptor,
};
pub use error::{DialogError, Result, StateComputationFailure};
pub use index::{FieldEntry, FieldId, FieldIndex, IndexedRoot};
pub use node::{NodeKind, SettingsGroup, SettingsNode, SettingsTree};
pub use predicate::{
    EffectKind, EffectSpec, FieldTest, Predicate, PredicateInitializer, PredicateProvider,
    ReferenceLookup, predicate_provider,
};
pub use provider::{
    FnStateProvider, ProviderBinding, ProviderTarget, StateInputs, StateProvider,
    StateProviderInitializer, state_provider,
};
pub use reference::{RefId, Reference};
pub use registry::{ProviderFactory, ProviderRegistry, invalid_params};
pub use resolver::ReferenceResolver;
pub use settings_type::SettingsType;
pub use validation::{Validation, validate_value};
pub use value::ValueType;
