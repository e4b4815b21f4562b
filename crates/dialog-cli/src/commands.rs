//! Subcommand implementations.
//!
//! Every command reads its JSON inputs, builds a [`DialogService`] from the
//! tree descriptor with the built-in providers and returns its result for
//! `main` to print.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use dialog_apply::{ApplyOptions, ApplyRequest, ApplyResult, PersistedSettings};
use dialog_core::{DialogDescription, DialogService, ServiceError, builtin_registry};
use dialog_model::{FlowVariable, NodeContext, Predicate, TreeDescriptor, flow_variables};
use dialog_updates::{TriggerInvocation, TriggerResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, info_span};

use crate::cli::{ApplyArgs, DescribeArgs, EffectArgs, TriggerArgs};

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("read {what} {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {what} {}", path.display()))
}

fn read_optional<T: DeserializeOwned + Default>(path: Option<&Path>, what: &str) -> Result<T> {
    path.map_or_else(|| Ok(T::default()), |path| read_json(path, what))
}

fn load_service(path: &Path) -> Result<DialogService> {
    let descriptor: TreeDescriptor = read_json(path, "tree descriptor")?;
    DialogService::from_descriptor(&descriptor, &builtin_registry()).map_err(service_error)
}

fn load_context(path: Option<&Path>) -> Result<Option<NodeContext>> {
    path.map(|path| read_json(path, "node context")).transpose()
}

/// Attach the remediation hint of configuration errors.
fn service_error(error: ServiceError) -> anyhow::Error {
    if let ServiceError::Apply(apply) = &error {
        return anyhow!(apply.user_message());
    }
    match error.dialog_error().and_then(|dialog| dialog.suggestion()) {
        Some(hint) => anyhow!("{error}\nhint: {hint}"),
        None => anyhow!(error),
    }
}

pub fn run_describe(args: &DescribeArgs) -> Result<DialogDescription> {
    let _span = info_span!("describe", tree = %args.tree.display()).entered();
    let service = load_service(&args.tree)?;
    let persisted: PersistedSettings = read_optional(args.data.as_deref(), "settings")?;
    let context = load_context(args.context.as_deref())?;
    service
        .describe(&persisted, context.as_ref())
        .map_err(service_error)
}

pub fn run_trigger(args: &TriggerArgs) -> Result<TriggerResult> {
    let _span = info_span!("trigger", tree = %args.tree.display()).entered();
    let service = load_service(&args.tree)?;
    let invocation: TriggerInvocation = read_json(&args.invocation, "invocation")?;
    let context = load_context(args.context.as_deref())?;
    service
        .invoke_trigger(&invocation, context.as_ref())
        .map_err(service_error)
}

pub fn run_apply(args: &ApplyArgs) -> Result<ApplyResult> {
    let _span = info_span!("apply", tree = %args.tree.display()).entered();
    let service = load_service(&args.tree)?.with_apply_options(
        ApplyOptions::default().with_ignore_unknown_variable_paths(!args.strict_paths),
    );
    let previous: PersistedSettings = read_optional(args.previous.as_deref(), "previous settings")?;
    let request: ApplyRequest = read_json(&args.request, "apply request")?;
    let variables: Vec<FlowVariable> = read_optional(args.variables.as_deref(), "flow variables")?;
    let result = service
        .reconcile(&previous, &request, &flow_variables(variables))
        .map_err(service_error)?;

    if let Some(output) = &args.output {
        let text = serde_json::to_string_pretty(&result.settings)?;
        fs::write(output, text).with_context(|| format!("write {}", output.display()))?;
        info!(path = %output.display(), "wrote settings");
    }
    Ok(result)
}

pub fn run_effect(args: &EffectArgs) -> Result<Value> {
    let _span = info_span!("effect", target = %args.target).entered();
    let service = load_service(&args.tree)?;
    let predicate: Predicate = read_json(&args.predicate, "predicate")?;
    service
        .condition(&predicate, &args.target)
        .map_err(service_error)
}
