//! Effect handling for generated dialogs.
//!
//! - **compiler**: predicates to JSON-Forms rule conditions
//! - **evaluate**: predicates evaluated against dialog data
//! - **ui_schema**: layout emission with effect rules attached

pub mod compiler;
pub mod evaluate;
pub mod ui_schema;

pub use compiler::{ConditionCompiler, UsageSite};
pub use evaluate::PredicateEvaluator;
pub use ui_schema::UiSchemaBuilder;
