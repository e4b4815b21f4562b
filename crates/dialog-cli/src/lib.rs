//! CLI library components for the dialog backend.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
