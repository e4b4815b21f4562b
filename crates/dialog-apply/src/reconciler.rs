//! Per-leaf reconciliation of submitted settings.
//!
//! Every leaf is in one of four states:
//!
//! - **no override**: the submitted value is validated and stored
//! - **controlled**: a valid controlling flow variable replaces the submitted value
//! - **flawed**: the controlling variable is missing or invalid; the previously
//!   stored value is kept and the node must be reset
//! - **exposed**: the submitted value is stored and published as a variable
//!
//! Controlled and exposed can both apply to the same leaf.

use std::collections::HashSet;
use std::sync::Arc;

use dialog_common::{DocPath, Segment, get_at, set_at};
use dialog_model::{
    FieldEntry, FieldIndex, FlowVariables, SettingsTree, SettingsType, validate_value,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info_span, warn};

use crate::error::{ApplyError, MigrationFailure, Result};
use crate::legacy::LegacyLoader;
use crate::options::ApplyOptions;
use crate::settings::{ApplyRequest, FlowVariableSetting, PersistedSettings};

/// Where the stored value of a leaf came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueSource {
    Submitted,
    FlowVariable,
    Previous,
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Submitted => "submitted",
            Self::FlowVariable => "flow variable",
            Self::Previous => "previous",
            Self::Default => "default",
        })
    }
}

/// Decision for one leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafResolution {
    pub path: String,
    pub value: Value,
    pub source: ValueSource,
    pub flawed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controlling_variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_variable: Option<String>,
}

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    pub settings: PersistedSettings,
    pub leaves: Vec<LeafResolution>,
    pub warnings: Vec<String>,
    /// The node must be re-executed (settings changed or could not be applied as submitted).
    pub reset_required: bool,
}

/// Reconciles submissions for one settings tree.
pub struct Reconciler<'t> {
    tree: &'t SettingsTree,
    index: FieldIndex<'t>,
    options: ApplyOptions,
    loader: Option<Arc<dyn LegacyLoader>>,
}

impl<'t> Reconciler<'t> {
    pub fn new(tree: &'t SettingsTree) -> Self {
        Self {
            tree,
            index: FieldIndex::build(tree),
            options: ApplyOptions::default(),
            loader: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ApplyOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Option<Arc<dyn LegacyLoader>>) -> Self {
        self.loader = loader;
        self
    }

    /// Decide the value of every leaf and build the settings to persist.
    pub fn reconcile(
        &self,
        previous: &PersistedSettings,
        request: &ApplyRequest,
        variables: &FlowVariables,
    ) -> Result<ApplyResult> {
        let _span = info_span!("reconcile", leaves = self.index.leaves().count()).entered();
        self.check_settings_types(&request.data)?;

        let mut submitted = Map::new();
        let mut previous_data = Map::new();
        let mut unmigrated = HashSet::new();
        let mut warnings = Vec::new();
        for (settings_type, group) in self.tree.roots() {
            let key = settings_type.config_key();
            let submitted_doc = request
                .data
                .get(key)
                .cloned()
                .unwrap_or_else(|| group.default_value());
            match self.previous_settings(*settings_type, previous) {
                Some(Stored::Current(stored)) => {
                    previous_data.insert(key.to_string(), stored);
                }
                Some(Stored::Unmigrated { raw, failure }) => {
                    warnings.push(format!(
                        "The stored {settings_type} settings could not be migrated ({failure}). \
                         Overridden settings fall back to the stored values where they still exist."
                    ));
                    unmigrated.insert(*settings_type);
                    previous_data.insert(key.to_string(), raw);
                }
                None => {}
            }
            submitted.insert(key.to_string(), submitted_doc);
        }
        let submitted = Value::Object(submitted);
        let previous_data = Value::Object(previous_data);

        let mut result = submitted.clone();
        let mut variable_trees: Vec<(SettingsType, Value)> = Vec::new();
        let mut leaves = Vec::new();
        let mut seen = HashSet::new();
        let no_setting = FlowVariableSetting::default();

        for entry in self.index.leaves() {
            for tuple in self.index.index_tuples(entry.id, &[], &submitted) {
                let Some(path) = self.index.data_path(entry.id, &tuple) else {
                    continue;
                };
                let dotted = path.to_dotted();
                let setting = request
                    .flow_variable_settings
                    .get(&dotted)
                    .unwrap_or(&no_setting);
                let submitted_value = get_at(&submitted, &path)
                    .cloned()
                    .unwrap_or_else(|| entry.node.default_value());

                let (resolution, warning) = resolve_leaf(
                    entry,
                    &dotted,
                    submitted_value,
                    Previous {
                        value: get_at(&previous_data, &path),
                        unmigrated: unmigrated.contains(&entry.settings_type),
                    },
                    setting,
                    variables,
                )?;
                set_at(&mut result, &path, resolution.value.clone())?;
                if !setting.is_empty() {
                    record_variable(&mut variable_trees, entry.settings_type, &path, setting)?;
                }
                if let Some(warning) = warning {
                    warn!(path = %dotted, "{warning}");
                    warnings.push(warning);
                }
                seen.insert(dotted);
                leaves.push(resolution);
            }
        }

        for (path, setting) in &request.flow_variable_settings {
            if seen.contains(path) || setting.is_empty() {
                continue;
            }
            if self.options.ignore_unknown_variable_paths {
                debug!(%path, "ignoring flow variable setting for unknown path");
            } else {
                return Err(ApplyError::UnknownFlowVariablePath { path: path.clone() });
            }
        }

        let mut settings = PersistedSettings::default();
        for settings_type in self.tree.settings_types() {
            settings.set_settings(
                settings_type,
                result.get(settings_type.config_key()).cloned(),
            );
            let tree = variable_trees
                .iter()
                .find(|(kind, _)| *kind == settings_type)
                .map(|(_, tree)| tree.clone());
            settings.set_variables(settings_type, tree);
        }

        let flawed = leaves.iter().any(|leaf| leaf.flawed);
        let reset_required = flawed || settings != *previous;
        debug!(flawed, reset_required, warnings = warnings.len(), "reconciled settings");
        Ok(ApplyResult {
            settings,
            leaves,
            warnings,
            reset_required,
        })
    }

    fn check_settings_types(&self, data: &Value) -> Result<()> {
        let object = match data {
            Value::Object(object) => object,
            Value::Null => return Ok(()),
            other => {
                return Err(ApplyError::InvalidValue {
                    path: String::new(),
                    reason: format!("settings data must be an object, got {other}"),
                });
            }
        };
        for key in object.keys() {
            let known = SettingsType::from_config_key(key).is_some_and(|t| self.tree.get(t).is_some());
            if !known {
                return Err(ApplyError::UnknownSettingsType { key: key.clone() });
            }
        }
        Ok(())
    }

    /// Previously stored settings, converted from a legacy layout when needed.
    fn previous_settings(
        &self,
        settings_type: SettingsType,
        previous: &PersistedSettings,
    ) -> Option<Stored> {
        let stored = previous.settings(settings_type)?;
        let Some(loader) = &self.loader else {
            return Some(Stored::Current(stored.clone()));
        };
        if !loader.needs_migration(settings_type, stored) {
            return Some(Stored::Current(stored.clone()));
        }
        match loader.load(settings_type, stored) {
            Ok(migrated) => {
                debug!(%settings_type, "loaded legacy settings");
                Some(Stored::Current(migrated))
            }
            Err(failure) => {
                warn!(%settings_type, %failure, "could not load legacy settings; falling back to raw stored values");
                Some(Stored::Unmigrated {
                    raw: stored.clone(),
                    failure,
                })
            }
        }
    }
}

/// Previous state of one settings type.
enum Stored {
    Current(Value),
    /// The legacy loader failed; only paths that still match the current layout are usable.
    Unmigrated { raw: Value, failure: MigrationFailure },
}

/// Previous value of one leaf.
#[derive(Clone, Copy)]
struct Previous<'a> {
    value: Option<&'a Value>,
    unmigrated: bool,
}

fn resolve_leaf(
    entry: &FieldEntry<'_>,
    dotted: &str,
    submitted: Value,
    previous: Previous<'_>,
    setting: &FlowVariableSetting,
    variables: &FlowVariables,
) -> Result<(LeafResolution, Option<String>)> {
    let value_type = entry.value_type();
    let validations = &entry.node.validations;
    let mut resolution = LeafResolution {
        path: dotted.to_string(),
        value: Value::Null,
        source: ValueSource::Submitted,
        flawed: false,
        controlling_variable: setting.controlling_flow_variable_name.clone(),
        exposed_variable: setting.exposed_flow_variable_name.clone(),
    };

    let Some(name) = &setting.controlling_flow_variable_name else {
        validate_value(&value_type, validations, &submitted).map_err(|reason| {
            ApplyError::InvalidValue {
                path: dotted.to_string(),
                reason,
            }
        })?;
        resolution.value = submitted;
        return Ok((resolution, None));
    };

    let from_variable = match variables.get(name) {
        None => Err("not available".to_string()),
        Some(variable) => match value_type.coerce(&variable.value.to_json()) {
            None => Err(format!(
                "of type {} and cannot set a {value_type} setting",
                variable.value.type_name()
            )),
            Some(value) => validate_value(&value_type, validations, &value)
                .map(|()| value)
                .map_err(|reason| format!("invalid ({reason})")),
        },
    };

    match from_variable {
        Ok(value) => {
            resolution.value = value;
            resolution.source = ValueSource::FlowVariable;
            Ok((resolution, None))
        }
        Err(reason) => {
            let stored_fallback = if previous.unmigrated {
                "The value found in the stored settings, which could not be migrated, is used instead."
            } else {
                "The previously applied value is used instead."
            };
            let previous_value = previous.value.filter(|value| {
                !previous.unmigrated || validate_value(&value_type, validations, value).is_ok()
            });
            let (value, source, fallback) = match (previous_value, &entry.node.default) {
                (Some(previous), _) => (previous.clone(), ValueSource::Previous, stored_fallback),
                (None, Some(default)) => (
                    default.clone(),
                    ValueSource::Default,
                    "The value from the default settings is used instead.",
                ),
                (None, None) => (
                    submitted,
                    ValueSource::Submitted,
                    "The submitted value is kept instead.",
                ),
            };
            resolution.value = value;
            resolution.source = source;
            resolution.flawed = true;
            let warning = format!(
                "The setting \"{dotted}\" is overridden by flow variable \"{name}\", which is {reason}. {fallback}"
            );
            Ok((resolution, Some(warning)))
        }
    }
}

/// Write the variable entry of `path` into the variables tree of its settings type.
fn record_variable(
    trees: &mut Vec<(SettingsType, Value)>,
    settings_type: SettingsType,
    path: &DocPath,
    setting: &FlowVariableSetting,
) -> Result<()> {
    let position = match trees.iter().position(|(kind, _)| *kind == settings_type) {
        Some(position) => position,
        None => {
            trees.push((settings_type, Value::Object(Map::new())));
            trees.len() - 1
        }
    };
    let keys = DocPath::from_segments(
        path.tail()
            .segments()
            .iter()
            .map(|segment| Segment::Key(segment.to_string()))
            .collect(),
    );
    let entry = json!({
        "used_variable": setting.controlling_flow_variable_name,
        "exposed_variable": setting.exposed_flow_variable_name,
    });
    set_at(&mut trees[position].1, &keys, entry)?;
    Ok(())
}
