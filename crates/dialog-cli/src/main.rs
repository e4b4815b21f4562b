//! Dialog backend CLI.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::{ColorChoice, Parser};
use dialog_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use dialog_cli::commands::{run_apply, run_describe, run_effect, run_trigger};
use dialog_cli::logging::{LogConfig, LogFormat, init_logging};
use dialog_cli::summary::print_apply_summary;
use serde::Serialize;
use tracing::level_filters::LevelFilter;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let outcome = match &cli.command {
        Command::Describe(args) => run_describe(args).and_then(|d| print_json(&d)),
        Command::Trigger(args) => run_trigger(args).and_then(|r| print_json(&r)),
        Command::Apply(args) => run_apply(args).and_then(|result| {
            if args.summary {
                print_apply_summary(&result);
            } else {
                for warning in &result.warnings {
                    eprintln!("warning: {warning}");
                }
            }
            if args.output.is_none() {
                print_json(&result.settings)?;
            }
            Ok(())
        }),
        Command::Effect(args) => run_effect(args).and_then(|c| print_json(&c)),
    };
    let exit_code = match outcome {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
