//! Integration tests for the subcommands, reading and writing real files.

use std::fs;
use std::path::{Path, PathBuf};

use dialog_apply::{PersistedSettings, ValueSource};
use dialog_cli::cli::{ApplyArgs, DescribeArgs, EffectArgs, TriggerArgs};
use dialog_cli::commands::{run_apply, run_describe, run_effect, run_trigger};
use dialog_cli::summary::apply_summary_table;
use serde_json::{Value, json};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn tree(dir: &Path) -> PathBuf {
    write(
        dir,
        "tree.json",
        &json!({
            "settings": [{
                "type": "model",
                "class": "Settings",
                "fields": [
                    {"name": "name", "type": "string", "ref": "name",
                     "validations": [{"kind": "notBlank"}]},
                    {"name": "greeting", "type": "string", "providers": [
                        {"provider": "copy", "params": {"from": {"id": "name", "type": "string"}}}
                    ]},
                    {"name": "limit", "type": "integer", "default": 10}
                ]
            }]
        }),
    )
}

#[test]
fn describe_defaults_without_stored_settings() {
    let dir = TempDir::new().unwrap();
    let args = DescribeArgs {
        tree: tree(dir.path()),
        data: None,
        context: None,
    };
    let description = run_describe(&args).unwrap();
    assert_eq!(
        description.data,
        json!({"model": {"name": null, "greeting": null, "limit": 10}})
    );
    assert_eq!(description.updates.response.global().len(), 1);
}

#[test]
fn trigger_reads_the_invocation_file() {
    let dir = TempDir::new().unwrap();
    let invocation = write(
        dir.path(),
        "invocation.json",
        &json!({
            "trigger": {"scope": "#/properties/model/properties/name"},
            "data": {"model": {"name": "Ada", "greeting": null, "limit": 10}}
        }),
    );
    let result = run_trigger(&TriggerArgs {
        tree: tree(dir.path()),
        invocation,
        context: None,
    })
    .unwrap();
    assert_eq!(result.updates.len(), 1);
    assert_eq!(result.updates[0].values[0].value, json!("Ada"));
}

#[test]
fn apply_writes_the_settings_to_store() {
    let dir = TempDir::new().unwrap();
    let previous = write(
        dir.path(),
        "previous.json",
        &json!({"model": {"name": "old", "greeting": "old", "limit": 10}}),
    );
    let request = write(
        dir.path(),
        "request.json",
        &json!({
            "data": {"model": {"name": "new", "greeting": "new", "limit": 5}},
            "flowVariableSettings": {"model.name": {"controllingFlowVariableName": "who"}}
        }),
    );
    let output = dir.path().join("stored.json");
    let args = ApplyArgs {
        tree: tree(dir.path()),
        previous: Some(previous),
        request,
        variables: None,
        output: Some(output.clone()),
        strict_paths: false,
        summary: true,
    };

    let result = run_apply(&args).unwrap();
    assert!(result.reset_required);
    assert_eq!(result.leaves[0].source, ValueSource::Previous);

    let stored: PersistedSettings =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(
        stored.model,
        Some(json!({"name": "old", "greeting": "new", "limit": 5}))
    );
    assert_eq!(
        stored.variables,
        Some(json!({"name": {"used_variable": "who", "exposed_variable": null}}))
    );

    let table = apply_summary_table(&result).to_string();
    assert!(table.contains("model.name"));
    assert!(table.contains("who"));
}

#[test]
fn apply_reports_invalid_values() {
    let dir = TempDir::new().unwrap();
    let request = write(
        dir.path(),
        "request.json",
        &json!({"data": {"model": {"name": "  ", "greeting": null, "limit": 1}}}),
    );
    let err = run_apply(&ApplyArgs {
        tree: tree(dir.path()),
        previous: None,
        request,
        variables: None,
        output: None,
        strict_paths: false,
        summary: false,
    })
    .unwrap_err();
    assert!(err.to_string().contains("model.name"), "{err}");
}

#[test]
fn effect_compiles_at_the_target() {
    let dir = TempDir::new().unwrap();
    let predicate = write(
        dir.path(),
        "predicate.json",
        &json!({"type": "not", "predicate": {
            "type": "field",
            "reference": {"id": "name", "type": "string"},
            "test": {"kind": "matchesPattern", "pattern": "^a"}
        }}),
    );
    let condition = run_effect(&EffectArgs {
        tree: tree(dir.path()),
        predicate,
        target: "#/properties/model/properties/limit".to_string(),
    })
    .unwrap();
    insta::assert_json_snapshot!(condition, @r##"
    {
      "schema": {
        "not": {
          "pattern": "^a"
        }
      },
      "scope": "#/properties/model/properties/name"
    }
    "##);
}

#[test]
fn unknown_providers_carry_a_hint() {
    let dir = TempDir::new().unwrap();
    let tree = write(
        dir.path(),
        "tree.json",
        &json!({"settings": [{"type": "model", "class": "S", "fields": [
            {"name": "x", "type": "string", "providers": [{"provider": "nope"}]}
        ]}]}),
    );
    let err = run_describe(&DescribeArgs {
        tree,
        data: None,
        context: None,
    })
    .unwrap_err();
    assert!(err.to_string().contains("nope"), "{err}");
}
