// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `stackit config set | unset | list`

use crate::cli::args::{PositionalArgs, Validator};
use crate::cli::display::TableRenderer;
use crate::cli::flags::{FlagSet, FlagValue, ValueSource};
use crate::cli::globals::{
    global_flags, FLAG_ASYNC, FLAG_OUTPUT_FORMAT, FLAG_PROJECT_ID, FLAG_REGION, FLAG_VERBOSITY,
};
use crate::cli::input::log_input;
use crate::cli::runtime::Invocation;
use crate::cli::tree::{Action, CommandNode};
use crate::infrastructure::api::Service;
use crate::infrastructure::config_store::{value_to_string, ConfigStore};
use crate::infrastructure::constants::{
    AUTH_KEY_PREFIX, KEY_PROJECT_ID, KEY_PROJECT_NAME, REDACTED,
};
use crate::shared::error::{CliError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// Global flags that `config set` persists when given on the command line.
const PERSISTED_GLOBALS: [&str; 5] = [
    FLAG_PROJECT_ID,
    FLAG_REGION,
    FLAG_OUTPUT_FORMAT,
    FLAG_ASYNC,
    FLAG_VERBOSITY,
];

const ENDPOINT_FLAGS: [(&str, Service); 3] = [
    ("resource-manager-custom-endpoint", Service::ResourceManager),
    ("postgres-flex-custom-endpoint", Service::PostgresFlex),
    ("iaas-custom-endpoint", Service::Iaas),
];

pub fn node() -> Result<CommandNode> {
    CommandNode::group("config", "Provides functionality for CLI configuration options")
        .category("Configuration")
        .with_children(vec![set_node(), unset_node(), list_node()])
}

// ============================================================================
// config set
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SetModel {
    /// Config key to new value, in key order.
    pub settings: BTreeMap<String, FlagValue>,
}

fn set_node() -> CommandNode {
    let mut flags = FlagSet::new();
    for (name, service) in ENDPOINT_FLAGS {
        flags = flags.string(name, None, custom_endpoint_help(service));
    }

    CommandNode::leaf("set", "Sets CLI configuration options", SetAction)
        .long(
            "Sets CLI configuration options.\n\
             Global flags given together with this command are stored as defaults for later commands.",
        )
        .example(
            "Set a project ID for all later commands",
            "stackit config set --project-id xxx",
        )
        .example(
            "Use a different PostgreSQL Flex endpoint",
            "stackit config set --postgres-flex-custom-endpoint https://example.com",
        )
        .flags(flags)
}

fn custom_endpoint_help(service: Service) -> &'static str {
    match service {
        Service::ResourceManager => "Resource Manager API base URL, used in calls to this API",
        Service::PostgresFlex => "PostgreSQL Flex API base URL, used in calls to this API",
        Service::Iaas => "IaaS API base URL, used in calls to this API",
    }
}

fn parse_set_input(inv: &Invocation<'_>) -> Result<SetModel> {
    let globals = global_flags();
    let mut model = SetModel::default();

    for name in PERSISTED_GLOBALS {
        if inv.flags.source(name) != Some(ValueSource::CommandLine) {
            continue;
        }
        let key = globals.get(name).and_then(|def| def.config_key);
        if let (Some(key), Some(value)) = (key, inv.flags.get(name)) {
            model.settings.insert(key.to_string(), value.clone());
        }
    }
    for (name, service) in ENDPOINT_FLAGS {
        if let Some(url) = inv.flags.string(name).filter(|_| inv.flags.is_set(name)) {
            model
                .settings
                .insert(service.custom_endpoint_key(), FlagValue::String(url));
        }
    }

    if model.settings.is_empty() {
        return Err(inv.invariant("at least one configuration flag must be set"));
    }
    Ok(model)
}

/// Writes every setting. A new project id invalidates the cached project name.
pub fn apply_settings(config: &mut ConfigStore, model: &SetModel) -> Result<()> {
    for (key, value) in &model.settings {
        if key == KEY_PROJECT_ID {
            let previous = config.stored_string(KEY_PROJECT_ID)?;
            if previous.as_deref() != value_text(value).as_deref() {
                config.delete(KEY_PROJECT_NAME)?;
            }
        }
        config.set(key, value.to_toml())?;
    }
    config.save()
}

fn value_text(value: &FlagValue) -> Option<String> {
    match value {
        FlagValue::String(s) => Some(s.clone()),
        _ => None,
    }
}

struct SetAction;

#[async_trait]
impl Action for SetAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let model = parse_set_input(inv)?;
        log_input(inv.printer(), &inv.command_path, &model);

        apply_settings(inv.config(), &model)?;
        let path = inv.runtime.config.path().display().to_string();
        inv.printer().info(format!("Saved configuration to {}", path));
        Ok(())
    }
}

// ============================================================================
// config unset
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsetModel {
    pub key: String,
}

fn unset_node() -> CommandNode {
    CommandNode::leaf("unset", "Removes a CLI configuration option", UnsetAction)
        .args(PositionalArgs::Single("KEY", Validator::Any))
        .example(
            "Remove the default project ID",
            "stackit config unset project.id",
        )
}

/// Removes `key`; removing the project id also drops the cached name.
/// Returns whether the key was present.
pub fn unset_key(config: &mut ConfigStore, key: &str) -> Result<bool> {
    let removed = config.delete(key)?;
    if key == KEY_PROJECT_ID {
        config.delete(KEY_PROJECT_NAME)?;
    }
    config.save_if_dirty()?;
    Ok(removed)
}

struct UnsetAction;

#[async_trait]
impl Action for UnsetAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let key = inv
            .args
            .first()
            .cloned()
            .ok_or_else(|| CliError::internal("missing KEY argument"))?;
        let model = UnsetModel { key };
        log_input(inv.printer(), &inv.command_path, &model);

        if unset_key(inv.config(), &model.key)? {
            inv.printer().info(format!("Removed \"{}\"", model.key));
        } else {
            inv.printer()
                .warn(format!("\"{}\" is not set in the configuration", model.key));
        }
        Ok(())
    }
}

// ============================================================================
// config list
// ============================================================================

fn list_node() -> CommandNode {
    CommandNode::leaf("list", "Lists the current CLI configuration values", ListAction)
        .example("List the configuration", "stackit config list")
        .example(
            "List the configuration in JSON format",
            "stackit config list --output-format json",
        )
}

/// Stored values with everything under `auth.` masked.
pub fn listed_entries(config: &ConfigStore) -> Result<BTreeMap<String, toml::Value>> {
    Ok(config
        .entries()?
        .into_iter()
        .map(|(key, value)| {
            if key.starts_with(AUTH_KEY_PREFIX) {
                (key, toml::Value::String(REDACTED.to_string()))
            } else {
                (key, value)
            }
        })
        .collect())
}

struct ListAction;

#[async_trait]
impl Action for ListAction {
    async fn run(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let entries = listed_entries(&inv.runtime.config)?;
        let path = inv.runtime.config.path().display().to_string();

        inv.output_result(&entries, |printer| {
            if entries.is_empty() {
                printer.info(format!("No configuration values set in {}", path));
                return Ok(());
            }
            let mut table = TableRenderer::new(&["NAME", "VALUE"]);
            for (key, value) in &entries {
                table.add_row(vec![key.clone(), value_to_string(value)]);
            }
            printer.output(table.render())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::environment::Env;
    use tempfile::TempDir;

    const ID_A: &str = "3b4c1e5a-1c4f-4db5-9b57-2a6d2b9e9b11";
    const ID_B: &str = "00000000-0000-4000-8000-000000000000";

    fn model(pairs: &[(&str, FlagValue)]) -> SetModel {
        SetModel {
            settings: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_changing_project_clears_cached_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = ConfigStore::open(&path, Env::default());
        config.set(KEY_PROJECT_ID, ID_A).unwrap();
        config.set(KEY_PROJECT_NAME, "demo").unwrap();
        config.save().unwrap();

        apply_settings(&mut config, &model(&[(KEY_PROJECT_ID, FlagValue::from(ID_A))])).unwrap();
        assert_eq!(config.stored_string(KEY_PROJECT_NAME).unwrap().as_deref(), Some("demo"));

        apply_settings(&mut config, &model(&[(KEY_PROJECT_ID, FlagValue::from(ID_B))])).unwrap();
        let reopened = ConfigStore::open(&path, Env::default());
        assert_eq!(reopened.stored_string(KEY_PROJECT_ID).unwrap().as_deref(), Some(ID_B));
        assert_eq!(reopened.stored_string(KEY_PROJECT_NAME).unwrap(), None);
    }

    #[test]
    fn test_settings_keep_their_types() {
        let dir = TempDir::new().unwrap();
        let mut config = ConfigStore::open(dir.path().join("config.toml"), Env::default());
        apply_settings(
            &mut config,
            &model(&[
                ("async", FlagValue::Bool(true)),
                ("iaas.custom-endpoint", FlagValue::from("http://localhost:8080")),
            ]),
        )
        .unwrap();
        assert_eq!(config.get::<bool>("async").unwrap(), Some(true));
        assert_eq!(
            config.get_string("iaas.custom-endpoint").unwrap().as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn test_unset_project_drops_name() {
        let dir = TempDir::new().unwrap();
        let mut config = ConfigStore::open(dir.path().join("config.toml"), Env::default());
        config.set(KEY_PROJECT_ID, ID_A).unwrap();
        config.set(KEY_PROJECT_NAME, "demo").unwrap();

        assert!(unset_key(&mut config, KEY_PROJECT_ID).unwrap());
        assert_eq!(config.stored_string(KEY_PROJECT_NAME).unwrap(), None);
        assert!(!unset_key(&mut config, "region").unwrap());
    }

    #[test]
    fn test_list_masks_credentials() {
        let dir = TempDir::new().unwrap();
        let mut config = ConfigStore::open(dir.path().join("config.toml"), Env::default());
        config.set("auth.access-token", "secret-token").unwrap();
        config.set("region", "eu01").unwrap();

        let entries = listed_entries(&config).unwrap();
        assert_eq!(entries["auth.access-token"], toml::Value::String(REDACTED.into()));
        assert_eq!(entries["region"], toml::Value::String("eu01".into()));
    }
}
