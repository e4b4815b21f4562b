use dialog_model::{
    DialogError, FieldIndex, NodeContext, Predicate, PredicateInitializer, PredicateProvider,
    ProviderRegistry, Reference, ReferenceResolver, SettingsGroup, SettingsNode, SettingsTree,
    SettingsType, TreeDescriptor, ValueType, predicate_provider,
};
use serde_json::json;

const FLAG: Reference = Reference::new("flag", ValueType::Boolean);
const OPTIONAL: Reference = Reference::new("optional", ValueType::String);

fn tree() -> SettingsTree {
    SettingsTree::new()
        .with(
            SettingsType::Model,
            SettingsGroup::new("ModelSettings")
                .with_field(SettingsNode::leaf("flag", ValueType::Boolean).with_reference(FLAG)),
        )
        .with(
            SettingsType::View,
            SettingsGroup::new("ViewSettings")
                .with_field(SettingsNode::leaf("title", ValueType::String)),
        )
}

#[test]
fn references_resolve_across_settings_types() {
    let tree = tree();
    let index = FieldIndex::build(&tree);
    let resolver = ReferenceResolver::new(&index);

    let id = resolver.resolve(&FLAG, "view.title").unwrap();
    let entry = index.get(id).unwrap();
    assert_eq!(entry.settings_type, SettingsType::Model);
    assert_eq!(entry.scope.as_str(), "#/properties/model/properties/flag");
}

#[test]
fn missing_reference_guard_avoids_the_lookup() {
    let tree = tree();
    let index = FieldIndex::build(&tree);
    let resolver = ReferenceResolver::new(&index);
    let context = NodeContext::new();

    let guarded = predicate_provider(|init: &PredicateInitializer<'_>| {
        if init.is_missing(&OPTIONAL) {
            Predicate::never()
        } else {
            OPTIONAL.is_equal_to("x")
        }
    });
    let initializer = PredicateInitializer::new(&resolver, Some(&context));
    assert_eq!(guarded.init(&initializer), Predicate::Never);
    assert!(initializer.context().is_some());
}

#[test]
fn descriptor_and_code_trees_index_alike() {
    let descriptor = TreeDescriptor::from_value(json!({
        "settings": [
            {"type": "model", "class": "ModelSettings", "fields": [
                {"name": "flag", "type": "boolean", "ref": "flag"}
            ]},
            {"type": "view", "class": "ViewSettings", "fields": [
                {"name": "title", "type": "string"}
            ]}
        ]
    }))
    .unwrap();
    let loaded = descriptor.build(&ProviderRegistry::new()).unwrap();
    let built = tree();

    let scopes = |tree: &SettingsTree| -> Vec<String> {
        FieldIndex::build(tree)
            .entries()
            .iter()
            .map(|entry| entry.scope.to_string())
            .collect()
    };
    assert_eq!(scopes(&loaded), scopes(&built));
    assert_eq!(loaded.default_data(), json!({"model": {"flag": false}, "view": {"title": null}}));
}

#[test]
fn duplicate_settings_types_are_rejected() {
    let err = TreeDescriptor::from_value(json!({
        "settings": [
            {"type": "model", "class": "A", "fields": []},
            {"type": "model", "class": "B", "fields": []}
        ]
    }))
    .unwrap()
    .build(&ProviderRegistry::new())
    .unwrap_err();
    assert!(matches!(err, DialogError::InvalidDescriptor { .. }));
    assert!(!err.is_configuration_error());
}
