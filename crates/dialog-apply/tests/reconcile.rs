use std::sync::Arc;

use dialog_apply::{
    ApplyError, ApplyOptions, ApplyRequest, FlowVariableSetting, LegacyLoader, MigrationFailure,
    NodeSettingsStore, PersistedSettings, Reconciler, ValueSource,
};
use dialog_model::{
    FlowValue, FlowVariable, FlowVariables, NodeContext, SettingsGroup, SettingsNode, SettingsTree,
    SettingsType, Validation, ValueType, flow_variables,
};
use serde_json::{Value, json};

fn tree() -> SettingsTree {
    SettingsTree::new().with(
        SettingsType::Model,
        SettingsGroup::new("Settings")
            .with_field(SettingsNode::leaf("name", ValueType::String))
            .with_field(
                SettingsNode::leaf("count", ValueType::Integer)
                    .with_validation(Validation::Min {
                        value: 1.0,
                        exclusive: false,
                    })
                    .with_default(json!(1)),
            )
            .with_field(SettingsNode::array(
                "rows",
                SettingsGroup::new("Row").with_field(SettingsNode::leaf("label", ValueType::String)),
            )),
    )
}

fn applied(store: &mut NodeSettingsStore, name: &str) {
    let response = store.apply(
        &tree(),
        &ApplyRequest::new(json!({"model": {"name": name, "count": 2, "rows": []}})),
        None,
    );
    assert!(response.is_ok(), "{response:?}");
    store.mark_executed();
}

fn context(variables: &[(&str, FlowValue)]) -> NodeContext {
    variables
        .iter()
        .fold(NodeContext::new(), |ctx, (name, value)| {
            ctx.with_flow_variable(FlowVariable::new(*name, value.clone()))
        })
}

#[test]
fn missing_controlling_variable_keeps_previous_value() {
    let mut store = NodeSettingsStore::new();
    applied(&mut store, "old");

    let request = ApplyRequest::new(json!({"model": {"name": "new", "count": 2, "rows": []}}))
        .with_flow_variable("model.name", FlowVariableSetting::controlled_by("nameVar"));
    let response = store.apply(&tree(), &request, Some(&NodeContext::new()));

    assert!(response.is_ok());
    assert_eq!(store.persisted().model, Some(json!({"name": "old", "count": 2, "rows": []})));
    assert_eq!(response.warning_messages.len(), 1);
    let warning = &response.warning_messages[0];
    assert!(warning.contains("nameVar"), "{warning}");
    assert!(warning.contains("overridden"), "{warning}");
    assert!(warning.contains("not available"), "{warning}");
    assert!(!store.is_executed());
}

#[test]
fn valid_controlling_variable_wins() {
    let mut store = NodeSettingsStore::new();
    applied(&mut store, "old");

    let request = ApplyRequest::new(json!({"model": {"name": "manual", "count": 2, "rows": []}}))
        .with_flow_variable("model.name", FlowVariableSetting::controlled_by("nameVar"));
    let ctx = context(&[("nameVar", FlowValue::String("fromVar".into()))]);
    let response = store.apply(&tree(), &request, Some(&ctx));

    assert!(response.is_ok());
    assert!(response.warning_messages.is_empty());
    assert_eq!(
        store.persisted().model.as_ref().and_then(|m| m.get("name")),
        Some(&json!("fromVar"))
    );
    insta::assert_json_snapshot!(store.persisted().variables, @r#"
    {
      "name": {
        "exposed_variable": null,
        "used_variable": "nameVar"
      }
    }
    "#);
}

#[test]
fn invalid_manual_value_rejects_the_apply() {
    let mut store = NodeSettingsStore::new();
    applied(&mut store, "old");
    let before = store.persisted().clone();

    let request = ApplyRequest::new(json!({"model": {"name": "x", "count": 0, "rows": []}}));
    let response = store.apply(&tree(), &request, None);

    let error = response.error.expect("apply should fail");
    assert!(error.contains("model.count"), "{error}");
    assert!(error.contains("at least 1"), "{error}");
    assert_eq!(store.persisted(), &before);
    assert!(store.is_executed());
}

#[test]
fn valid_variable_replaces_an_invalid_manual_value() {
    let mut store = NodeSettingsStore::new();
    applied(&mut store, "old");

    let request = ApplyRequest::new(json!({"model": {"name": "x", "count": 0, "rows": []}}))
        .with_flow_variable("model.count", FlowVariableSetting::controlled_by("c"));
    let ctx = context(&[("c", FlowValue::Integer(5))]);
    let response = store.apply(&tree(), &request, Some(&ctx));

    assert_eq!(response.error, None);
    assert!(response.warning_messages.is_empty());
    assert_eq!(
        store.persisted().model.as_ref().and_then(|m| m.get("count")),
        Some(&json!(5))
    );
}

#[test]
fn changing_an_exposed_variable_resets_the_node() {
    let mut store = NodeSettingsStore::new();
    applied(&mut store, "same");

    let request = ApplyRequest::new(json!({"model": {"name": "same", "count": 2, "rows": []}}))
        .with_flow_variable("model.count", FlowVariableSetting::exposed_as("countOut"));
    let response = store.apply(&tree(), &request, None);

    assert!(response.is_ok());
    assert!(!store.is_executed());
    assert_eq!(
        store.persisted().variables,
        Some(json!({"count": {"used_variable": null, "exposed_variable": "countOut"}}))
    );
}

#[test]
fn unchanged_settings_keep_the_node_executed() {
    let mut store = NodeSettingsStore::new();
    applied(&mut store, "same");
    applied(&mut store, "same");
    let response = store.apply(
        &tree(),
        &ApplyRequest::new(json!({"model": {"name": "same", "count": 2, "rows": []}})),
        None,
    );
    assert!(response.is_ok());
    assert!(store.is_executed());
}

#[test]
fn array_elements_are_addressed_by_index() {
    let request = ApplyRequest::new(json!({
        "model": {"name": "n", "count": 1, "rows": [{"label": "a"}, {"label": "b"}]}
    }))
    .with_flow_variable("model.rows.1.label", FlowVariableSetting::controlled_by("labelVar"));
    let variables = flow_variables([FlowVariable::new("labelVar", FlowValue::String("z".into()))]);

    let tree = tree();
    let result = Reconciler::new(&tree)
        .reconcile(&PersistedSettings::default(), &request, &variables)
        .unwrap();

    assert_eq!(
        result.settings.model.as_ref().and_then(|m| m.get("rows")),
        Some(&json!([{"label": "a"}, {"label": "z"}]))
    );
    assert_eq!(
        result.settings.variables,
        Some(json!({"rows": {"1": {"label": {"used_variable": "labelVar", "exposed_variable": null}}}}))
    );
    let sources: Vec<(&str, ValueSource)> = result
        .leaves
        .iter()
        .map(|leaf| (leaf.path.as_str(), leaf.source))
        .collect();
    assert_eq!(
        sources,
        vec![
            ("model.name", ValueSource::Submitted),
            ("model.count", ValueSource::Submitted),
            ("model.rows.0.label", ValueSource::Submitted),
            ("model.rows.1.label", ValueSource::FlowVariable),
        ]
    );
}

#[test]
fn incompatible_variable_falls_back_to_default() {
    let request = ApplyRequest::new(json!({"model": {"name": "n", "count": 5, "rows": []}}))
        .with_flow_variable("model.count", FlowVariableSetting::controlled_by("countVar"));
    let variables = flow_variables([FlowVariable::new("countVar", FlowValue::String("many".into()))]);

    let tree = tree();
    let result = Reconciler::new(&tree)
        .reconcile(&PersistedSettings::default(), &request, &variables)
        .unwrap();

    let count = result.leaves.iter().find(|leaf| leaf.path == "model.count").unwrap();
    assert!(count.flawed);
    assert_eq!(count.source, ValueSource::Default);
    assert_eq!(count.value, json!(1));
    assert!(result.reset_required);
    assert!(result.warnings[0].contains("of type String"), "{:?}", result.warnings);
}

#[test]
fn unknown_settings_types_are_rejected() {
    let tree = tree();
    let err = Reconciler::new(&tree)
        .reconcile(
            &PersistedSettings::default(),
            &ApplyRequest::new(json!({"view": {}})),
            &FlowVariables::new(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        ApplyError::UnknownSettingsType {
            key: "view".to_string()
        }
    );
}

#[test]
fn unknown_variable_paths_follow_the_options() {
    let tree = tree();
    let request = ApplyRequest::new(json!({"model": {"name": "n", "count": 1, "rows": []}}))
        .with_flow_variable("model.nothing", FlowVariableSetting::exposed_as("x"));

    let lenient = Reconciler::new(&tree).reconcile(
        &PersistedSettings::default(),
        &request,
        &FlowVariables::new(),
    );
    assert!(lenient.is_ok());

    let strict = Reconciler::new(&tree)
        .with_options(ApplyOptions::new().with_ignore_unknown_variable_paths(false))
        .reconcile(&PersistedSettings::default(), &request, &FlowVariables::new())
        .unwrap_err();
    assert_eq!(
        strict,
        ApplyError::UnknownFlowVariablePath {
            path: "model.nothing".to_string()
        }
    );
}

struct RenamedField;

impl LegacyLoader for RenamedField {
    fn needs_migration(&self, _settings_type: SettingsType, stored: &Value) -> bool {
        stored.get("title").is_some()
    }

    fn load(&self, _settings_type: SettingsType, stored: &Value) -> Result<Value, MigrationFailure> {
        let title = stored
            .get("title")
            .cloned()
            .ok_or_else(|| MigrationFailure::new("no title"))?;
        Ok(json!({"name": title, "count": 1, "rows": []}))
    }
}

#[test]
fn legacy_settings_are_migrated_before_use() {
    let previous = PersistedSettings {
        model: Some(json!({"title": "legacy"})),
        ..PersistedSettings::default()
    };
    let mut store = NodeSettingsStore::from_persisted(previous).with_loader(Arc::new(RenamedField));

    let request = ApplyRequest::new(json!({"model": {"name": "new", "count": 1, "rows": []}}))
        .with_flow_variable("model.name", FlowVariableSetting::controlled_by("gone"));
    let response = store.apply(&tree(), &request, None);

    assert!(response.is_ok());
    assert_eq!(
        store.persisted().model.as_ref().and_then(|m| m.get("name")),
        Some(&json!("legacy"))
    );
}

struct CorruptStore;

impl LegacyLoader for CorruptStore {
    fn needs_migration(&self, _settings_type: SettingsType, _stored: &Value) -> bool {
        true
    }

    fn load(&self, _settings_type: SettingsType, _stored: &Value) -> Result<Value, MigrationFailure> {
        Err(MigrationFailure::new("corrupt"))
    }
}

#[test]
fn failed_migration_keeps_submitted_values_outside_flawed_overrides() {
    let previous = PersistedSettings {
        model: Some(json!({"name": "old", "count": "two"})),
        ..PersistedSettings::default()
    };
    let request = ApplyRequest::new(json!({
        "model": {"name": "new", "count": 3, "rows": [{"label": "l"}]}
    }))
    .with_flow_variable("model.name", FlowVariableSetting::controlled_by("gone"));

    let tree = tree();
    let result = Reconciler::new(&tree)
        .with_loader(Some(Arc::new(CorruptStore)))
        .reconcile(&previous, &request, &FlowVariables::new())
        .unwrap();

    assert_eq!(
        result.settings.model,
        Some(json!({"name": "old", "count": 3, "rows": [{"label": "l"}]}))
    );
    let name = result.leaves.iter().find(|leaf| leaf.path == "model.name").unwrap();
    assert!(name.flawed);
    assert_eq!(name.source, ValueSource::Previous);
    assert!(result.reset_required);

    assert_eq!(result.warnings.len(), 2, "{:?}", result.warnings);
    assert!(result.warnings[0].contains("could not be migrated (corrupt)"), "{}", result.warnings[0]);
    let override_warning = &result.warnings[1];
    assert!(override_warning.contains("\"gone\""), "{override_warning}");
    assert!(!override_warning.contains("previously applied"), "{override_warning}");
    assert!(override_warning.contains("stored settings"), "{override_warning}");
}

#[test]
fn failed_migration_skips_stored_values_of_the_wrong_type() {
    let previous = PersistedSettings {
        model: Some(json!({"name": "old", "count": "two"})),
        ..PersistedSettings::default()
    };
    let request = ApplyRequest::new(json!({"model": {"name": "new", "count": 3, "rows": []}}))
        .with_flow_variable("model.count", FlowVariableSetting::controlled_by("gone"));

    let mut store = NodeSettingsStore::from_persisted(previous).with_loader(Arc::new(CorruptStore));
    let response = store.apply(&tree(), &request, None);

    assert!(response.is_ok(), "{response:?}");
    assert_eq!(
        store.persisted().model,
        Some(json!({"name": "new", "count": 1, "rows": []}))
    );
    assert!(
        response.warning_messages[1].contains("default settings"),
        "{:?}",
        response.warning_messages
    );
}
