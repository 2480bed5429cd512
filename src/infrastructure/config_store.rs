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

//! Persistent user configuration
//!
//! Lookup order for [`ConfigStore::get`] (highest first):
//! 1. In-memory overrides set during flag resolution
//! 2. The TOML file (`$XDG_CONFIG_HOME/stackit/config.toml`)
//! 3. `STACKIT_*` environment variables
//! 4. Registered defaults
//!
//! Dotted keys map to nested tables (`project.id` is `[project] id = ...`).
//! Keys the CLI does not know about are kept as-is across load and save.

use crate::infrastructure::constants::{
    CONFIG_APPLICATION, CONFIG_FILE_NAME, CONFIG_ORGANIZATION, CONFIG_QUALIFIER, ENV_CONFIG_FILE,
};
use crate::infrastructure::environment::Env;
use crate::shared::error::{CliError, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::NamedTempFile;
use toml::{Table, Value};

pub struct ConfigStore {
    path: PathBuf,
    data: OnceLock<Table>,
    overrides: BTreeMap<String, Value>,
    defaults: BTreeMap<String, Value>,
    env: Env,
    dirty: bool,
}

impl ConfigStore {
    /// Does not touch the file system; the file is read on first access.
    pub fn open(path: impl Into<PathBuf>, env: Env) -> Self {
        Self {
            path: path.into(),
            data: OnceLock::new(),
            overrides: BTreeMap::new(),
            defaults: BTreeMap::new(),
            env,
            dirty: false,
        }
    }

    /// `STACKIT_CONFIG_FILE` wins over the per-user config directory.
    pub fn default_path(env: &Env) -> Result<PathBuf> {
        if let Some(path) = env.get(ENV_CONFIG_FILE) {
            return Ok(PathBuf::from(path));
        }
        let dirs = ProjectDirs::from(CONFIG_QUALIFIER, CONFIG_ORGANIZATION, CONFIG_APPLICATION)
            .ok_or_else(|| {
                CliError::config_error("cannot determine the user configuration directory")
            })?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn register_default(&mut self, key: &str, value: impl Into<Value>) {
        self.defaults.insert(key.to_string(), value.into());
    }

    /// Overrides live only for this process and are never saved.
    pub fn set_override(&mut self, key: &str, value: impl Into<Value>) {
        self.overrides.insert(key.to_string(), value.into());
    }

    pub fn get_value(&self, key: &str) -> Result<Option<Value>> {
        if let Some(v) = self.overrides.get(key) {
            return Ok(Some(v.clone()));
        }
        if let Some(v) = lookup(self.loaded()?, key) {
            return Ok(Some(v.clone()));
        }
        if let Some(raw) = self.env.get(&Env::var_for_key(key)) {
            return Ok(Some(Value::String(raw.to_string())));
        }
        Ok(self.defaults.get(key).cloned())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.get_value(key)? else {
            return Ok(None);
        };
        match value.clone().try_into::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(first) => match value {
                // Environment values arrive as strings; give them a second chance
                // as TOML scalars ("true", "42").
                Value::String(raw) => parse_scalar(&raw)
                    .and_then(|v| v.try_into::<T>().ok())
                    .map(Some)
                    .ok_or_else(|| {
                        CliError::config_error(format!(
                            "config key \"{}\" in {}: {}",
                            key,
                            self.path.display(),
                            first
                        ))
                    }),
                _ => Err(CliError::config_error(format!(
                    "config key \"{}\" in {}: {}",
                    key,
                    self.path.display(),
                    first
                ))),
            },
        }
    }

    /// Scalars are rendered as plain text, anything else as TOML.
    pub fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_value(key)?.map(|v| value_to_string(&v)))
    }

    /// Reads only what the file holds, ignoring overrides, environment and defaults.
    pub fn stored_string(&self, key: &str) -> Result<Option<String>> {
        Ok(lookup(self.loaded()?, key).map(value_to_string))
    }

    /// Updates the in-memory file contents; call [`save`](Self::save) to persist.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let table = self.loaded_mut()?;
        insert(table, key, value)?;
        self.dirty = true;
        Ok(())
    }

    pub fn delete(&mut self, key: &str) -> Result<bool> {
        let table = self.loaded_mut()?;
        let removed = remove(table, key);
        if removed {
            self.dirty = true;
        }
        Ok(removed)
    }

    /// Flattened `(dotted-key, value)` pairs of the file contents.
    pub fn entries(&self) -> Result<Vec<(String, Value)>> {
        let mut out = Vec::new();
        flatten("", self.loaded()?, &mut out);
        Ok(out)
    }

    /// Writes to a temporary file next to the target and renames it into place,
    /// so a failed write leaves the previous file untouched.
    pub fn save(&mut self) -> Result<()> {
        self.save_with(|file, bytes| {
            file.write_all(bytes)?;
            file.as_file().sync_all()
        })
    }

    pub fn save_if_dirty(&mut self) -> Result<()> {
        if self.dirty {
            self.save()?;
        }
        Ok(())
    }

    fn save_with<F>(&mut self, write: F) -> Result<()>
    where
        F: FnOnce(&mut NamedTempFile, &[u8]) -> std::io::Result<()>,
    {
        let content = toml::to_string_pretty(self.loaded()?)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |e: std::io::Error| {
            CliError::config_error(format!(
                "write config file {}: {}",
                self.path.display(),
                e
            ))
        };

        std::fs::create_dir_all(&dir).map_err(io_err)?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        write(&mut tmp, content.as_bytes()).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        tracing::debug!("saved configuration to {}", self.path.display());
        self.dirty = false;
        Ok(())
    }

    fn loaded(&self) -> Result<&Table> {
        if let Some(table) = self.data.get() {
            return Ok(table);
        }
        let table = read_table(&self.path)?;
        Ok(self.data.get_or_init(|| table))
    }

    fn loaded_mut(&mut self) -> Result<&mut Table> {
        self.loaded()?;
        self.data
            .get_mut()
            .ok_or_else(|| CliError::internal("configuration not loaded"))
    }
}

fn read_table(path: &Path) -> Result<Table> {
    match std::fs::read_to_string(path) {
        Ok(content) => content.parse::<Table>().map_err(|e| {
            CliError::config_error(format!("parse config file {}: {}", path.display(), e))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Table::new()),
        Err(e) => Err(CliError::config_error(format!(
            "read config file {}: {}",
            path.display(),
            e
        ))),
    }
}

fn lookup<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.').peekable();
    let mut current = table;
    while let Some(part) = parts.next() {
        let value = current.get(part)?;
        if parts.peek().is_none() {
            return Some(value);
        }
        current = value.as_table()?;
    }
    None
}

fn insert(table: &mut Table, key: &str, value: Value) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(CliError::config_error(format!("invalid config key \"{}\"", key)));
    }
    let (last, parents) = parts
        .split_last()
        .ok_or_else(|| CliError::config_error("empty config key"))?;

    let mut current = table;
    for part in parents {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        current = entry.as_table_mut().ok_or_else(|| {
            CliError::config_error(format!(
                "config key \"{}\": \"{}\" is not a table",
                key, part
            ))
        })?;
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn remove(table: &mut Table, key: &str) -> bool {
    match key.split_once('.') {
        None => table.remove(key).is_some(),
        Some((head, rest)) => {
            let Some(child) = table.get_mut(head).and_then(Value::as_table_mut) else {
                return false;
            };
            let removed = remove(child, rest);
            if removed && child.is_empty() {
                table.remove(head);
            }
            removed
        }
    }
}

fn flatten(prefix: &str, table: &Table, out: &mut Vec<(String, Value)>) {
    for (k, v) in table {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{}.{}", prefix, k)
        };
        match v {
            Value::Table(t) => flatten(&key, t, out),
            other => out.push((key, other.clone())),
        }
    }
}

fn parse_scalar(raw: &str) -> Option<Value> {
    format!("v = {}", raw)
        .parse::<Table>()
        .ok()
        .and_then(|mut t| t.remove("v"))
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}
