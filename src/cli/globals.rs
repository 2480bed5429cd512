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

//! Flags inherited by every command

use super::flags::{FlagKind, FlagSet, ParsedFlags, ValueSource};
use crate::infrastructure::constants::{
    KEY_ASSUME_YES, KEY_ASYNC, KEY_OUTPUT_FORMAT, KEY_PROJECT_ID, KEY_REGION, KEY_VERBOSITY,
};
use crate::shared::error::{CliError, Result};
use serde::Serialize;
use std::str::FromStr;

pub const DEFAULT_REGION: &str = "eu01";

pub const FLAG_PROJECT_ID: &str = "project-id";
pub const FLAG_REGION: &str = "region";
pub const FLAG_OUTPUT_FORMAT: &str = "output-format";
pub const FLAG_ASYNC: &str = "async";
pub const FLAG_ASSUME_YES: &str = "assume-yes";
pub const FLAG_VERBOSITY: &str = "verbosity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Default,
    Json,
    Yaml,
}

impl OutputFormat {
    pub const NAMES: &'static [&'static str] = &["default", "json", "yaml"];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Default => "default",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(OutputFormat::Default),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            other => Err(format!("unknown output format \"{}\"", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl Verbosity {
    pub const NAMES: &'static [&'static str] = &["error", "warning", "info", "debug"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Error => "error",
            Verbosity::Warning => "warning",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        }
    }

    pub fn tracing_level(&self) -> tracing::Level {
        match self {
            Verbosity::Error => tracing::Level::ERROR,
            Verbosity::Warning => tracing::Level::WARN,
            Verbosity::Info => tracing::Level::INFO,
            Verbosity::Debug => tracing::Level::DEBUG,
        }
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Verbosity::Error),
            "warning" => Ok(Verbosity::Warning),
            "info" => Ok(Verbosity::Info),
            "debug" => Ok(Verbosity::Debug),
            other => Err(format!("unknown verbosity \"{}\"", other)),
        }
    }
}

pub fn global_flags() -> FlagSet {
    FlagSet::new()
        .flag(FLAG_PROJECT_ID, FlagKind::Uuid, "Project ID")
        .config_key(KEY_PROJECT_ID)
        .string(
            FLAG_REGION,
            Some(DEFAULT_REGION),
            "Target region for region-specific requests",
        )
        .config_key(KEY_REGION)
        .flag(
            FLAG_OUTPUT_FORMAT,
            FlagKind::Enum(OutputFormat::NAMES),
            "Output format, one of [\"default\" \"json\" \"yaml\"]",
        )
        .short('o')
        .default_value("default")
        .config_key(KEY_OUTPUT_FORMAT)
        .bool(FLAG_ASYNC, false, "If set, runs the command asynchronously")
        .config_key(KEY_ASYNC)
        .bool(
            FLAG_ASSUME_YES,
            false,
            "If set, skips all confirmation prompts",
        )
        .short('y')
        .config_key(KEY_ASSUME_YES)
        .flag(
            FLAG_VERBOSITY,
            FlagKind::Enum(Verbosity::NAMES),
            "Verbosity of the CLI, one of [\"debug\" \"info\" \"warning\" \"error\"]",
        )
        .default_value("info")
        .config_key(KEY_VERBOSITY)
}

/// Effective global settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalFlagModel {
    pub project_id: Option<String>,
    /// Whether `project_id` was given on the command line.
    pub project_id_overridden: bool,
    pub region: Option<String>,
    pub output_format: OutputFormat,
    pub async_mode: bool,
    pub assume_yes: bool,
    pub verbosity: Verbosity,
}

impl Default for GlobalFlagModel {
    fn default() -> Self {
        Self {
            project_id: None,
            project_id_overridden: false,
            region: Some(DEFAULT_REGION.to_string()),
            output_format: OutputFormat::Default,
            async_mode: false,
            assume_yes: false,
            verbosity: Verbosity::Info,
        }
    }
}

impl GlobalFlagModel {
    pub fn from_flags(flags: &ParsedFlags) -> Self {
        Self {
            project_id: flags.string(FLAG_PROJECT_ID).filter(|s| !s.is_empty()),
            project_id_overridden: flags.source(FLAG_PROJECT_ID) == Some(ValueSource::CommandLine),
            region: flags.string(FLAG_REGION).filter(|s| !s.is_empty()),
            output_format: flags
                .string(FLAG_OUTPUT_FORMAT)
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            async_mode: flags.bool(FLAG_ASYNC),
            assume_yes: flags.bool(FLAG_ASSUME_YES),
            verbosity: flags
                .string(FLAG_VERBOSITY)
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }

    /// The project scope, failing with `MissingProjectId` when unset.
    pub fn require_project_id(&self) -> Result<&str> {
        self.project_id
            .as_deref()
            .ok_or(CliError::MissingProjectId)
    }

    pub fn require_region(&self) -> Result<&str> {
        self.region
            .as_deref()
            .ok_or_else(|| CliError::config_error("region is not set"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::flags::FlagValue;

    #[test]
    fn test_global_flags_are_valid() {
        let set = global_flags();
        assert!(set.validate("stackit").is_ok());
        assert_eq!(set.find_short('y').map(|f| f.name), Some(FLAG_ASSUME_YES));
        assert_eq!(
            set.get(FLAG_PROJECT_ID).and_then(|f| f.config_key),
            Some(KEY_PROJECT_ID)
        );
    }

    #[test]
    fn test_model_from_flags() {
        let mut flags = ParsedFlags::default();
        flags.insert(
            FLAG_PROJECT_ID,
            "3b4c1e5a-1c4f-4db5-9b57-2a6d2b9e9b11".into(),
            ValueSource::Config,
        );
        flags.insert(FLAG_OUTPUT_FORMAT, "json".into(), ValueSource::Env);
        flags.insert(FLAG_ASYNC, FlagValue::Bool(true), ValueSource::CommandLine);
        flags.insert(FLAG_VERBOSITY, "debug".into(), ValueSource::CommandLine);

        let model = GlobalFlagModel::from_flags(&flags);
        assert_eq!(model.output_format, OutputFormat::Json);
        assert!(model.async_mode);
        assert!(!model.assume_yes);
        assert!(!model.project_id_overridden);
        assert_eq!(model.verbosity, Verbosity::Debug);
        assert!(model.require_project_id().is_ok());
    }

    #[test]
    fn test_missing_project_id() {
        let model = GlobalFlagModel::default();
        let err = model.require_project_id().unwrap_err();
        assert_eq!(err.kind(), crate::shared::error::ErrorKind::MissingProjectId);
    }

    #[test]
    fn test_verbosity_order() {
        assert!(Verbosity::Debug > Verbosity::Info);
        assert!(Verbosity::Warning > Verbosity::Error);
        assert_eq!("WARNING".parse::<Verbosity>(), Ok(Verbosity::Warning));
    }
}
