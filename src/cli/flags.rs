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

//! Typed flag declarations and resolved flag values

use super::parsers;
use crate::shared::error::{CliError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    String(String),
    Bool(bool),
    Int(i64),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::String(value.to_string())
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Int(value)
    }
}

impl FlagValue {
    /// The value as it is stored in the config file.
    pub fn to_toml(&self) -> toml::Value {
        match self {
            FlagValue::String(s) => toml::Value::String(s.clone()),
            FlagValue::Bool(b) => toml::Value::Boolean(*b),
            FlagValue::Int(i) => toml::Value::Integer(*i),
            FlagValue::List(items) => {
                toml::Value::Array(items.iter().cloned().map(toml::Value::String).collect())
            }
            FlagValue::Map(map) => toml::Value::Table(
                map.iter()
                    .map(|(k, v)| (k.clone(), toml::Value::String(v.clone())))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    String,
    Bool,
    Int64,
    StringSlice,
    StringMap,
    Uuid,
    Cidr,
    CidrList,
    Enum(&'static [&'static str]),
    /// String whose `@path` form is replaced by the file's contents.
    ReadFromFile,
}

impl FlagKind {
    /// Values are accumulated across repeats and split on commas.
    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            FlagKind::StringSlice | FlagKind::StringMap | FlagKind::CidrList
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FlagKind::String | FlagKind::ReadFromFile | FlagKind::Enum(_) => "string",
            FlagKind::Bool => "",
            FlagKind::Int64 => "int",
            FlagKind::StringSlice => "strings",
            FlagKind::StringMap => "stringToString",
            FlagKind::Uuid => "uuid",
            FlagKind::Cidr => "cidr",
            FlagKind::CidrList => "cidrs",
        }
    }

    /// Parses a single raw token. Multi kinds get one comma-free element.
    pub fn parse_one(&self, raw: &str) -> std::result::Result<FlagValue, String> {
        match self {
            FlagKind::String => Ok(FlagValue::String(raw.to_string())),
            FlagKind::Bool => parsers::parse_bool(raw).map(FlagValue::Bool),
            FlagKind::Int64 => parsers::parse_int64(raw).map(FlagValue::Int),
            FlagKind::StringSlice => Ok(FlagValue::List(vec![raw.trim().to_string()])),
            FlagKind::StringMap => {
                let (k, v) = parsers::parse_key_value(raw)?;
                Ok(FlagValue::Map(BTreeMap::from([(k, v)])))
            }
            FlagKind::Uuid => parsers::parse_uuid(raw).map(FlagValue::String),
            FlagKind::Cidr => parsers::parse_cidr(raw).map(FlagValue::String),
            FlagKind::CidrList => parsers::parse_cidr(raw).map(|c| FlagValue::List(vec![c])),
            FlagKind::Enum(allowed) => parsers::parse_enum(raw, allowed).map(FlagValue::String),
            FlagKind::ReadFromFile => parsers::read_from_file(raw).map(FlagValue::String),
        }
    }

    /// Parses a whole value as it arrives from the environment or the config file,
    /// where multi kinds are comma-separated in one string.
    pub fn parse_joined(&self, raw: &str) -> std::result::Result<FlagValue, String> {
        if !self.is_multi() {
            return self.parse_one(raw);
        }
        let parts = raw
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .map(|p| self.parse_one(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(self.combine(parts))
    }

    /// Folds repeated occurrences: lists concatenate, maps merge, scalars keep the last.
    pub fn combine(&self, parts: Vec<FlagValue>) -> FlagValue {
        match self {
            FlagKind::StringSlice | FlagKind::CidrList => FlagValue::List(
                parts
                    .into_iter()
                    .flat_map(|p| match p {
                        FlagValue::List(items) => items,
                        FlagValue::String(s) => vec![s],
                        _ => Vec::new(),
                    })
                    .collect(),
            ),
            FlagKind::StringMap => FlagValue::Map(
                parts
                    .into_iter()
                    .flat_map(|p| match p {
                        FlagValue::Map(m) => m.into_iter().collect::<Vec<_>>(),
                        _ => Vec::new(),
                    })
                    .collect(),
            ),
            _ => parts
                .into_iter()
                .last()
                .unwrap_or(FlagValue::String(String::new())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlagDef {
    pub name: &'static str,
    pub short: Option<char>,
    pub kind: FlagKind,
    pub help: &'static str,
    pub default: Option<FlagValue>,
    /// Config key consulted after argv and the environment. Only flags with
    /// a key read `STACKIT_<FLAG>`; leaf flags come from argv or defaults.
    pub config_key: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Required(&'static str),
    MutuallyExclusive(Vec<&'static str>),
    OneRequired(Vec<&'static str>),
}

/// Flags declared by one command node, with their cross-flag constraints.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    flags: Vec<FlagDef>,
    constraints: Vec<Constraint>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(mut self, name: &'static str, kind: FlagKind, help: &'static str) -> Self {
        self.flags.push(FlagDef {
            name,
            short: None,
            kind,
            help,
            default: None,
            config_key: None,
        });
        self
    }

    pub fn string(self, name: &'static str, default: Option<&str>, help: &'static str) -> Self {
        let set = self.flag(name, FlagKind::String, help);
        match default {
            Some(d) => set.default_value(d),
            None => set,
        }
    }

    pub fn bool(self, name: &'static str, default: bool, help: &'static str) -> Self {
        self.flag(name, FlagKind::Bool, help).default_value(default)
    }

    pub fn int64(self, name: &'static str, default: Option<i64>, help: &'static str) -> Self {
        let set = self.flag(name, FlagKind::Int64, help);
        match default {
            Some(d) => set.default_value(d),
            None => set,
        }
    }

    pub fn string_slice(self, name: &'static str, help: &'static str) -> Self {
        self.flag(name, FlagKind::StringSlice, help)
    }

    pub fn string_map(self, name: &'static str, help: &'static str) -> Self {
        self.flag(name, FlagKind::StringMap, help)
    }

    /// Sets the default of the most recently declared flag.
    pub fn default_value(mut self, value: impl Into<FlagValue>) -> Self {
        if let Some(def) = self.flags.last_mut() {
            def.default = Some(value.into());
        }
        self
    }

    pub fn short(mut self, short: char) -> Self {
        if let Some(def) = self.flags.last_mut() {
            def.short = Some(short);
        }
        self
    }

    pub fn config_key(mut self, key: &'static str) -> Self {
        if let Some(def) = self.flags.last_mut() {
            def.config_key = Some(key);
        }
        self
    }

    pub fn required(mut self, name: &'static str) -> Self {
        self.constraints.push(Constraint::Required(name));
        self
    }

    pub fn mutually_exclusive(mut self, names: &[&'static str]) -> Self {
        self.constraints
            .push(Constraint::MutuallyExclusive(names.to_vec()));
        self
    }

    pub fn one_required(mut self, names: &[&'static str]) -> Self {
        self.constraints.push(Constraint::OneRequired(names.to_vec()));
        self
    }

    pub fn flags(&self) -> &[FlagDef] {
        &self.flags
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn get(&self, name: &str) -> Option<&FlagDef> {
        self.flags.iter().find(|f| f.name == name)
    }

    pub fn find_short(&self, short: char) -> Option<&FlagDef> {
        self.flags.iter().find(|f| f.short == Some(short))
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Names are unique, constraints reference declared flags, and a flag sits
    /// in at most one exclusive group and one one-required group.
    pub fn validate(&self, command: &str) -> Result<()> {
        let mut seen = BTreeSet::new();
        let mut shorts = BTreeSet::new();
        for def in &self.flags {
            if !seen.insert(def.name) {
                return Err(CliError::internal(format!(
                    "flag \"--{}\" declared twice on \"{}\"",
                    def.name, command
                )));
            }
            if let Some(s) = def.short {
                if !shorts.insert(s) {
                    return Err(CliError::internal(format!(
                        "shorthand \"-{}\" declared twice on \"{}\"",
                        s, command
                    )));
                }
            }
        }

        let mut exclusive = BTreeSet::new();
        let mut one_required = BTreeSet::new();
        for constraint in &self.constraints {
            let (names, group): (Vec<&'static str>, Option<&mut BTreeSet<&'static str>>) =
                match constraint {
                    Constraint::Required(n) => (vec![*n], None),
                    Constraint::MutuallyExclusive(ns) => (ns.clone(), Some(&mut exclusive)),
                    Constraint::OneRequired(ns) => (ns.clone(), Some(&mut one_required)),
                };
            for name in &names {
                if self.get(name).is_none() {
                    return Err(CliError::internal(format!(
                        "constraint on \"{}\" references unknown flag \"--{}\"",
                        command, name
                    )));
                }
            }
            if let Some(group) = group {
                for name in names {
                    if !group.insert(name) {
                        return Err(CliError::internal(format!(
                            "flag \"--{}\" on \"{}\" belongs to two groups of the same kind",
                            name, command
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueSource {
    CommandLine,
    Env,
    Config,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Resolved {
    value: FlagValue,
    source: ValueSource,
}

/// Effective flag values after applying argv, environment, config and defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFlags {
    values: BTreeMap<String, Resolved>,
}

impl ParsedFlags {
    pub fn insert(&mut self, name: &str, value: FlagValue, source: ValueSource) {
        self.values
            .insert(name.to_string(), Resolved { value, source });
    }

    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.values.get(name).map(|r| &r.value)
    }

    pub fn source(&self, name: &str) -> Option<ValueSource> {
        self.values.get(name).map(|r| r.source)
    }

    /// Present from any source other than a registered default.
    pub fn is_set(&self, name: &str) -> bool {
        matches!(self.source(name), Some(s) if s != ValueSource::Default)
    }

    pub fn string(&self, name: &str) -> Option<String> {
        match self.get(name) {
            Some(FlagValue::String(s)) => Some(s.clone()),
            Some(FlagValue::Int(i)) => Some(i.to_string()),
            Some(FlagValue::Bool(b)) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> bool {
        matches!(self.get(name), Some(FlagValue::Bool(true)))
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(FlagValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<Vec<String>> {
        match self.get(name) {
            Some(FlagValue::List(items)) => Some(items.clone()),
            _ => None,
        }
    }

    pub fn map(&self, name: &str) -> Option<BTreeMap<String, String>> {
        match self.get(name) {
            Some(FlagValue::Map(m)) => Some(m.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_validate() {
        let set = FlagSet::new()
            .string("name", None, "Instance name")
            .short('n')
            .flag("plan-id", FlagKind::Uuid, "Plan ID")
            .string("plan-name", None, "Plan name")
            .required("name")
            .mutually_exclusive(&["plan-id", "plan-name"])
            .one_required(&["plan-id", "plan-name"]);

        assert!(set.validate("create").is_ok());
        assert_eq!(set.find_short('n').map(|f| f.name), Some("name"));
        assert_eq!(set.constraints().len(), 3);
    }

    #[test]
    fn test_validate_rejects_duplicates_and_unknown_references() {
        let dup = FlagSet::new()
            .string("name", None, "a")
            .string("name", None, "b");
        assert!(dup.validate("x").is_err());

        let unknown = FlagSet::new().string("name", None, "a").required("nmae");
        assert!(unknown.validate("x").is_err());

        let twice = FlagSet::new()
            .string("a", None, "")
            .string("b", None, "")
            .string("c", None, "")
            .mutually_exclusive(&["a", "b"])
            .mutually_exclusive(&["a", "c"]);
        assert!(twice.validate("x").is_err());
    }

    #[test]
    fn test_parse_joined_and_combine() {
        let map = FlagKind::StringMap.parse_joined("a=1,b=2").unwrap();
        assert_eq!(
            map,
            FlagValue::Map(BTreeMap::from([
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ]))
        );

        let cidrs = FlagKind::CidrList
            .parse_joined("10.0.0.0/8,192.168.0.0/16")
            .unwrap();
        assert_eq!(
            cidrs,
            FlagValue::List(vec!["10.0.0.0/8".into(), "192.168.0.0/16".into()])
        );
        assert!(FlagKind::CidrList.parse_joined("10.0.0.0/8,nope").is_err());

        let last = FlagKind::String.combine(vec!["a".into(), "b".into()]);
        assert_eq!(last, FlagValue::String("b".into()));
    }

    #[test]
    fn test_to_toml() {
        assert_eq!(FlagValue::Bool(true).to_toml(), toml::Value::Boolean(true));
        assert_eq!(
            FlagValue::List(vec!["a".into()]).to_toml(),
            toml::Value::Array(vec![toml::Value::String("a".into())])
        );
    }

    #[test]
    fn test_parsed_flags_presence() {
        let mut parsed = ParsedFlags::default();
        parsed.insert("async", FlagValue::Bool(false), ValueSource::Default);
        parsed.insert("name", "db".into(), ValueSource::CommandLine);

        assert!(!parsed.is_set("async"));
        assert!(parsed.is_set("name"));
        assert!(!parsed.bool("async"));
        assert_eq!(parsed.string("name").as_deref(), Some("db"));
        assert_eq!(parsed.list("name"), None);
    }
}
