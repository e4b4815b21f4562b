//! Dialog backend: one service answering describe, trigger and apply
//! requests for a settings tree, plus the built-in state providers.

pub mod builtins;
pub mod error;
pub mod service;

pub use builtins::{ColumnChoices, Constant, CopyValue, builtin_registry};
pub use error::{Result, ServiceError};
pub use service::{DialogDescription, DialogService, EffectState};
