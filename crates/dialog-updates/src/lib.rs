//! Update engine for generated dialogs.
//!
//! - **graph**: records provider triggers and dependencies, orders providers
//! - **scheduler**: splits providers into initial and global updates
//! - **evaluate**: runs providers per array element, collecting failures
//! - **response**: the `initialUpdates` / `globalUpdates` protocol documents
//! - **engine**: [`UpdateEngine`], building all of the above per request and
//!   answering trigger invocations
//! - **deferred**: read-once background results for expensive choice lists

pub mod deferred;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod graph;
pub mod options;
pub mod response;
pub mod scheduler;

pub use deferred::DeferredChoices;
pub use engine::UpdateEngine;
pub use error::{DeferredError, Result, UpdateError};
pub use evaluate::{BatchOutcome, ComputationFailure, ComputedUpdate};
pub use graph::{Dependency, DependencyGraph, ProviderId, ProviderNode, SupplyMode, Trigger};
pub use options::UpdateOptions;
pub use response::{
    AFTER_OPEN_DIALOG_ID, GlobalUpdate, IndexedValue, TriggerInvocation, TriggerRef, TriggerResult,
    UpdateReport, UpdateResponse, ValueUpdate,
};
pub use scheduler::{GlobalEntry, Schedule};
