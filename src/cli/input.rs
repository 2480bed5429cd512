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

//! Turning argv, environment and config into typed flag values
//!
//! Precedence per flag: command line, then `STACKIT_<FLAG_NAME>`, then the
//! flag's config key, then its default. The same value parser runs for every
//! source.

use super::flags::{Constraint, FlagDef, FlagKind, FlagSet, FlagValue, ParsedFlags, ValueSource};
use super::globals::Verbosity;
use super::printer::Printer;
use crate::infrastructure::config_store::{value_to_string, ConfigStore};
use crate::infrastructure::constants::PROGRAM_NAME;
use crate::infrastructure::environment::Env;
use crate::shared::error::{CliError, Result, UsageError};
use clap::error::{ContextKind, ContextValue, ErrorKind as ClapErrorKind};
use clap::{Arg, ArgAction, Command};
use serde::Serialize;
use std::collections::BTreeMap;

const POSITIONAL_ID: &str = "__positional";

/// Values given on the command line, before any fallback is applied.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommandLine {
    pub values: BTreeMap<String, FlagValue>,
    pub positional: Vec<String>,
}

fn to_arg(def: &FlagDef) -> Arg {
    let kind = def.kind;
    let mut arg = Arg::new(def.name)
        .long(def.name)
        .value_parser(move |raw: &str| kind.parse_one(raw));
    if let Some(short) = def.short {
        arg = arg.short(short);
    }

    match kind {
        FlagKind::Bool => arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .action(ArgAction::Set),
        FlagKind::Int64 => arg
            .num_args(1)
            .allow_negative_numbers(true)
            .action(ArgAction::Set),
        k if k.is_multi() => arg
            .num_args(1)
            .value_delimiter(',')
            .action(ArgAction::Append),
        _ => arg.num_args(1).action(ArgAction::Set),
    }
}

fn parser_for(sets: &[&FlagSet]) -> Command {
    let mut cmd = Command::new(PROGRAM_NAME)
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .args_override_self(true)
        .arg(
            Arg::new(POSITIONAL_ID)
                .num_args(1..)
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(String)),
        );
    for def in sets.iter().flat_map(|s| s.flags()) {
        cmd = cmd.arg(to_arg(def));
    }
    cmd
}

/// Parses the leaf's argv tail against the flags of every node on the path.
pub fn parse_command_line(command: &str, sets: &[&FlagSet], rest: &[String]) -> Result<CommandLine> {
    let matches = parser_for(sets)
        .try_get_matches_from(rest)
        .map_err(|e| CliError::usage(command, usage_from_clap(&e)))?;

    let mut line = CommandLine::default();
    for def in sets.iter().flat_map(|s| s.flags()) {
        if matches.value_source(def.name) != Some(clap::parser::ValueSource::CommandLine) {
            continue;
        }
        let parts: Vec<FlagValue> = matches
            .try_get_many::<FlagValue>(def.name)
            .map_err(|e| CliError::internal(format!("read flag \"--{}\": {}", def.name, e)))?
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        line.values
            .insert(def.name.to_string(), def.kind.combine(parts));
    }
    line.positional = matches
        .try_get_many::<String>(POSITIONAL_ID)
        .map_err(|e| CliError::internal(format!("read arguments: {}", e)))?
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    Ok(line)
}

fn usage_from_clap(err: &clap::Error) -> UsageError {
    let context = |kind: ContextKind| match err.get(kind) {
        Some(ContextValue::String(s)) => Some(s.clone()),
        _ => None,
    };

    match err.kind() {
        ClapErrorKind::UnknownArgument => {
            UsageError::UnknownFlag(context(ContextKind::InvalidArg).unwrap_or_default())
        }
        ClapErrorKind::ValueValidation | ClapErrorKind::InvalidValue => {
            let arg = context(ContextKind::InvalidArg).unwrap_or_default();
            let flag = arg
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .trim_start_matches('-')
                .to_string();
            let reason = std::error::Error::source(err)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "a value is required".to_string());
            UsageError::BadValue {
                flag,
                raw: context(ContextKind::InvalidValue).unwrap_or_default(),
                reason,
            }
        }
        _ => {
            let rendered = err.render().to_string();
            let first = rendered.lines().next().unwrap_or_default();
            UsageError::InvalidArgs(first.trim_start_matches("error: ").to_string())
        }
    }
}

/// Applies environment, config and default fallbacks to the command line values.
pub fn resolve(
    command: &str,
    sets: &[&FlagSet],
    mut line: BTreeMap<String, FlagValue>,
    env: &Env,
    config: &ConfigStore,
) -> Result<ParsedFlags> {
    let mut parsed = ParsedFlags::default();

    for def in sets.iter().flat_map(|s| s.flags()) {
        if let Some(value) = line.remove(def.name) {
            parsed.insert(def.name, value, ValueSource::CommandLine);
            continue;
        }

        let Some(key) = def.config_key else {
            if let Some(default) = &def.default {
                parsed.insert(def.name, default.clone(), ValueSource::Default);
            }
            continue;
        };

        let var = Env::var_for_flag(def.name);
        if let Some(raw) = env.get(&var) {
            let value = def.kind.parse_joined(raw).map_err(|reason| {
                CliError::usage(
                    command,
                    UsageError::BadValue {
                        flag: def.name.to_string(),
                        raw: raw.to_string(),
                        reason: format!("{} (from {})", reason, var),
                    },
                )
            })?;
            parsed.insert(def.name, value, ValueSource::Env);
            continue;
        }

        if let Some(stored) = config.get_value(key)? {
            let raw = match &stored {
                toml::Value::Array(items) => items
                    .iter()
                    .map(value_to_string)
                    .collect::<Vec<_>>()
                    .join(","),
                other => value_to_string(other),
            };
            let value = def.kind.parse_joined(&raw).map_err(|reason| {
                CliError::config_error(format!("config key \"{}\": {}", key, reason))
            })?;
            parsed.insert(def.name, value, ValueSource::Config);
            continue;
        }

        if let Some(default) = &def.default {
            parsed.insert(def.name, default.clone(), ValueSource::Default);
        }
    }
    Ok(parsed)
}

/// Checks required, mutually exclusive and one-required groups in declaration
/// order and reports the first violation.
pub fn check_constraints(command: &str, sets: &[&FlagSet], parsed: &ParsedFlags) -> Result<()> {
    let owned = |names: &[&'static str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();

    for constraint in sets.iter().flat_map(|s| s.constraints()) {
        let violation = match constraint {
            Constraint::Required(name) if !parsed.is_set(name) => {
                Some(UsageError::MissingRequired(name.to_string()))
            }
            Constraint::MutuallyExclusive(names)
                if names.iter().filter(|n| parsed.is_set(n)).count() > 1 =>
            {
                Some(UsageError::MutuallyExclusive(owned(names)))
            }
            Constraint::OneRequired(names) if !names.iter().any(|n| parsed.is_set(n)) => {
                Some(UsageError::OneRequired(owned(names)))
            }
            _ => None,
        };
        if let Some(error) = violation {
            return Err(CliError::usage(command, error));
        }
    }
    Ok(())
}

/// Logs a command's input model at debug verbosity. Secrets serialize redacted.
pub fn log_input<T: Serialize>(printer: &Printer, command: &str, model: &T) {
    if printer.verbosity() < Verbosity::Debug {
        return;
    }
    match serde_json::to_string(model) {
        Ok(json) => printer.debug(format!("parsed input values for \"{}\": {}", command, json)),
        Err(e) => printer.debug(format!("serialize input values: {}", e)),
    }
}
