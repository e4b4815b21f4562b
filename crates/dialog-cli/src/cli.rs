//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "dialog",
    version,
    about = "Dialog backend - describe, update and apply node settings dialogs",
    long_about = "Run the dialog backend against a JSON settings tree descriptor.\n\n\
                  Emits initial and global update descriptors, answers trigger\n\
                  invocations, reconciles submitted settings with flow variables\n\
                  and compiles effect predicates to rule conditions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print data, layout and update descriptors of a dialog.
    Describe(DescribeArgs),

    /// Answer a global-update trigger invocation.
    Trigger(TriggerArgs),

    /// Reconcile submitted settings with flow variables and stored settings.
    Apply(ApplyArgs),

    /// Compile an effect predicate as declared on one field.
    Effect(EffectArgs),
}

#[derive(Parser)]
pub struct DescribeArgs {
    /// Settings tree descriptor (JSON).
    #[arg(long = "tree", value_name = "FILE")]
    pub tree: PathBuf,

    /// Stored settings (JSON, `{"model", "view", "variables", ...}`).
    #[arg(long = "data", value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Node context (JSON): input specs and flow variables.
    #[arg(long = "context", value_name = "FILE")]
    pub context: Option<PathBuf>,
}

#[derive(Parser)]
pub struct TriggerArgs {
    /// Settings tree descriptor (JSON).
    #[arg(long = "tree", value_name = "FILE")]
    pub tree: PathBuf,

    /// Trigger invocation (JSON, `{"trigger", "indices", "data"}`).
    #[arg(long = "invocation", value_name = "FILE")]
    pub invocation: PathBuf,

    /// Node context (JSON).
    #[arg(long = "context", value_name = "FILE")]
    pub context: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Settings tree descriptor (JSON).
    #[arg(long = "tree", value_name = "FILE")]
    pub tree: PathBuf,

    /// Previously stored settings (JSON). Empty settings when omitted.
    #[arg(long = "previous", value_name = "FILE")]
    pub previous: Option<PathBuf>,

    /// Apply request (JSON, `{"data", "flowVariableSettings"}`).
    #[arg(long = "request", value_name = "FILE")]
    pub request: PathBuf,

    /// Available flow variables (JSON array of `{"name", "value"}`).
    #[arg(long = "variables", value_name = "FILE")]
    pub variables: Option<PathBuf>,

    /// Write the settings to store to this file instead of stdout.
    #[arg(long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Reject flow-variable settings that address no setting.
    #[arg(long = "strict-paths")]
    pub strict_paths: bool,

    /// Print a table of per-setting decisions.
    #[arg(long = "summary")]
    pub summary: bool,
}

#[derive(Parser)]
pub struct EffectArgs {
    /// Settings tree descriptor (JSON).
    #[arg(long = "tree", value_name = "FILE")]
    pub tree: PathBuf,

    /// Predicate (JSON).
    #[arg(long = "predicate", value_name = "FILE")]
    pub predicate: PathBuf,

    /// Scope of the field the effect is declared on.
    #[arg(long = "target", value_name = "SCOPE")]
    pub target: String,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
